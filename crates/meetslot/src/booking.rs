//! The event body sent to the calendar service when booking.

use serde::Serialize;
use uuid::Uuid;

use crate::config::{BookingDefaults, ReminderOverride};
use crate::request::SchedulingRequest;

/// Google Calendar `events.insert` request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    pub summary: String,
    pub location: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recurrence: Vec<String>,
    pub attendees: Vec<EventAttendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conference_data: Option<ConferenceData>,
    pub reminders: Reminders,
}

/// Local wall time plus the zone it is expressed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventAttendee {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceData {
    pub create_request: CreateConferenceRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConferenceRequest {
    /// Fresh per booking; the service deduplicates conference creation on it.
    pub request_id: String,
    pub conference_solution_key: ConferenceSolutionKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConferenceSolutionKey {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub use_default: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<ReminderOverride>,
}

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

impl EventBody {
    /// Build the body for `request`, taking unset details from `defaults`.
    pub fn from_request(request: &SchedulingRequest, defaults: &BookingDefaults) -> Self {
        let details = &request.details;
        let zone = request.timezone.name().to_string();

        let recurrence = details
            .recurrence
            .clone()
            .or_else(|| defaults.recurrence.clone())
            .into_iter()
            .collect();

        let conference_data = details
            .conference
            .unwrap_or(defaults.conference)
            .then(|| ConferenceData {
                create_request: CreateConferenceRequest {
                    request_id: Uuid::new_v4().to_string(),
                    conference_solution_key: ConferenceSolutionKey {
                        kind: "hangoutsMeet".to_string(),
                    },
                },
            });

        Self {
            summary: details.summary.clone().unwrap_or_else(|| defaults.summary.clone()),
            location: details.location.clone().unwrap_or_else(|| defaults.location.clone()),
            description: details
                .description
                .clone()
                .unwrap_or_else(|| defaults.description.clone()),
            color_id: defaults.color_id.clone(),
            start: EventDateTime {
                date_time: request.start.format(DATE_TIME_FORMAT).to_string(),
                time_zone: zone.clone(),
            },
            end: EventDateTime {
                date_time: request.end.format(DATE_TIME_FORMAT).to_string(),
                time_zone: zone,
            },
            recurrence,
            attendees: request
                .attendees
                .iter()
                .map(|email| EventAttendee {
                    email: email.clone(),
                })
                .collect(),
            conference_data,
            reminders: Reminders {
                use_default: defaults.reminders.is_empty(),
                overrides: defaults.reminders.clone(),
            },
        }
    }

    /// Whether the insert call must ask the service to create a conference.
    pub fn wants_conference(&self) -> bool {
        self.conference_data.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono_tz::Tz;

    use crate::request::MeetingDetails;

    fn request() -> SchedulingRequest {
        let date = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
        SchedulingRequest::new(
            vec!["host@example.com".to_string(), "b@example.com".to_string()],
            date.and_hms_opt(14, 30, 0).unwrap(),
            date.and_hms_opt(15, 0, 0).unwrap(),
            Tz::Asia__Kolkata,
        )
    }

    #[test]
    fn defaults_fill_unset_details() {
        let body = EventBody::from_request(&request(), &BookingDefaults::default());
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["summary"], "Meeting Summary");
        assert_eq!(json["location"], "Any Location");
        assert_eq!(json["colorId"], "6");
        assert_eq!(json["start"]["dateTime"], "2026-03-16T14:30:00");
        assert_eq!(json["start"]["timeZone"], "Asia/Kolkata");
        assert_eq!(json["end"]["dateTime"], "2026-03-16T15:00:00");
        assert_eq!(json["recurrence"][0], "RRULE:FREQ=DAILY;COUNT=1");
        assert_eq!(json["attendees"][1]["email"], "b@example.com");
        assert_eq!(
            json["conferenceData"]["createRequest"]["conferenceSolutionKey"]["type"],
            "hangoutsMeet"
        );
        assert_eq!(json["reminders"]["useDefault"], false);
        assert_eq!(json["reminders"]["overrides"][0]["minutes"], 1440);
        assert_eq!(json["reminders"]["overrides"][1]["method"], "popup");
    }

    #[test]
    fn request_details_override_defaults() {
        let req = request().with_details(MeetingDetails {
            summary: Some("Design review".to_string()),
            recurrence: Some("RRULE:FREQ=WEEKLY;COUNT=4".to_string()),
            conference: Some(false),
            ..MeetingDetails::default()
        });
        let body = EventBody::from_request(&req, &BookingDefaults::default());

        assert_eq!(body.summary, "Design review");
        assert_eq!(body.description, "Meeting Description");
        assert_eq!(body.recurrence, vec!["RRULE:FREQ=WEEKLY;COUNT=4"]);
        assert!(!body.wants_conference());
        assert!(serde_json::to_value(&body).unwrap().get("conferenceData").is_none());
    }

    #[test]
    fn each_body_gets_a_fresh_conference_request_id() {
        let a = EventBody::from_request(&request(), &BookingDefaults::default());
        let b = EventBody::from_request(&request(), &BookingDefaults::default());
        let id = |body: &EventBody| body.conference_data.as_ref().unwrap().create_request.request_id.clone();
        assert_ne!(id(&a), id(&b));
        assert!(Uuid::parse_str(&id(&a)).is_ok());
    }
}
