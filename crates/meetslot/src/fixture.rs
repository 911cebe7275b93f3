//! Offline collaborators: calendars read from JSON files and a booker that
//! only records what it was asked to create.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use slot_engine::RawEvent;

use crate::booking::EventBody;
use crate::calendar::{BookingConfirmation, CalendarBooker, CalendarSource, Credential};
use crate::error::CalendarError;

/// Reads `<calendar_id>.json` from a directory.
///
/// The file holds either a Google `events.list` response (`{"items": [..]}`)
/// or a bare array of events. A missing file is an empty calendar. Events are
/// returned as stored; the engine clips them to the work window.
#[derive(Debug, Clone)]
pub struct JsonCalendarSource {
    dir: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventsFile {
    List {
        #[serde(default)]
        items: Vec<RawEvent>,
    },
    Bare(Vec<RawEvent>),
}

impl JsonCalendarSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn calendar_path(&self, calendar_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", calendar_id))
    }
}

#[async_trait]
impl CalendarSource for JsonCalendarSource {
    async fn list_events(
        &self,
        _credential: &Credential,
        calendar_id: &str,
        _time_min: DateTime<Utc>,
        _time_max: DateTime<Utc>,
    ) -> Result<Vec<RawEvent>, CalendarError> {
        let path = self.calendar_path(calendar_id);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No calendar file at {:?}; treating as empty", path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(CalendarError::Source(format!("{}: {}", path.display(), e))),
        };

        let events = match serde_json::from_str::<EventsFile>(&json)
            .map_err(|e| CalendarError::Decode(format!("{}: {}", path.display(), e)))?
        {
            EventsFile::List { items } => items,
            EventsFile::Bare(items) => items,
        };
        tracing::debug!("Loaded {} events from {:?}", events.len(), path);
        Ok(events)
    }
}

/// Dry-run booker: keeps every body it receives and confirms with a
/// synthetic id.
#[derive(Debug, Default)]
pub struct RecordingBooker {
    bodies: Mutex<Vec<(String, EventBody)>>,
}

impl RecordingBooker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(calendar_id, body)` pairs in insertion order.
    pub fn recorded(&self) -> Vec<(String, EventBody)> {
        self.bodies.lock().clone()
    }
}

#[async_trait]
impl CalendarBooker for RecordingBooker {
    async fn insert_event(
        &self,
        _credential: &Credential,
        calendar_id: &str,
        body: &EventBody,
    ) -> Result<BookingConfirmation, CalendarError> {
        let mut bodies = self.bodies.lock();
        bodies.push((calendar_id.to_string(), body.clone()));
        Ok(BookingConfirmation {
            id: format!("dry-run-{}", bodies.len()),
            html_link: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn range() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2026, 3, 16, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 17, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn reads_list_response_and_bare_array() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a@example.com.json"),
            r#"{"kind": "calendar#events", "items": [
                {"summary": "Standup", "start": {"dateTime": "2026-03-16T13:00:00+05:30"}, "end": {"dateTime": "2026-03-16T14:00:00+05:30"}}
            ]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b@example.com.json"),
            r#"[{"summary": "Holiday", "start": {"date": "2026-03-16"}, "end": {"date": "2026-03-17"}}]"#,
        )
        .unwrap();

        let source = JsonCalendarSource::new(dir.path());
        let cred = Credential::bearer("unused");
        let (min, max) = range();

        let a = source.list_events(&cred, "a@example.com", min, max).await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].summary.as_deref(), Some("Standup"));

        let b = source.list_events(&cred, "b@example.com", min, max).await.unwrap();
        assert_eq!(b[0].start.as_ref().unwrap().date.as_deref(), Some("2026-03-16"));
    }

    #[tokio::test]
    async fn missing_file_is_empty_and_bad_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad@example.com.json"), "{not json").unwrap();

        let source = JsonCalendarSource::new(dir.path());
        let cred = Credential::bearer("unused");
        let (min, max) = range();

        assert!(source
            .list_events(&cred, "nobody@example.com", min, max)
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            source.list_events(&cred, "bad@example.com", min, max).await,
            Err(CalendarError::Decode(_))
        ));
    }
}
