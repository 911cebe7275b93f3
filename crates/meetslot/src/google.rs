//! Google Calendar REST client.
//!
//! Implements both [`CalendarSource`] and [`CalendarBooker`]. The bearer token
//! is supplied per call so one client serves every attendee.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use slot_engine::RawEvent;
use tracing::instrument;

use crate::booking::EventBody;
use crate::calendar::{BookingConfirmation, CalendarBooker, CalendarSource, Credential};
use crate::error::CalendarError;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const PAGE_SIZE: u32 = 250;
const MAX_PAGES: usize = 100;
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<RawEvent>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl Default for GoogleCalendarClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleCalendarClient {
    pub fn new() -> Self {
        Self::with_base_url(CALENDAR_API_BASE)
    }

    /// Point the client at another server (a mock in tests).
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    /// Fetch one page of single-occurrence events ordered by start.
    #[instrument(skip(self, credential), level = "debug")]
    async fn list_page(
        &self,
        credential: &Credential,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> Result<EventsPage, CalendarError> {
        let mut url = format!(
            "{}?timeMin={}&timeMax={}&singleEvents=true&orderBy=startTime&maxResults={}",
            self.events_url(calendar_id),
            urlencoding::encode(&time_min.to_rfc3339()),
            urlencoding::encode(&time_max.to_rfc3339()),
            PAGE_SIZE,
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        let response = self
            .client
            .get(&url)
            .bearer_auth(credential.token())
            .send()
            .await?;

        handle_response(response, calendar_id).await
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarClient {
    #[instrument(skip(self, credential), level = "info")]
    async fn list_events(
        &self,
        credential: &Credential,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<RawEvent>, CalendarError> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        for _ in 0..MAX_PAGES {
            let page = self
                .list_page(credential, calendar_id, time_min, time_max, page_token.as_deref())
                .await?;
            events.extend(page.items);
            match page.next_page_token {
                Some(next) if !seen_tokens.insert(next.clone()) => {
                    tracing::warn!("Page token repeated for {}; stopping", calendar_id);
                    break;
                }
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        tracing::debug!("Fetched {} events from {}", events.len(), calendar_id);
        Ok(events)
    }
}

#[async_trait]
impl CalendarBooker for GoogleCalendarClient {
    #[instrument(skip(self, credential, body), level = "info")]
    async fn insert_event(
        &self,
        credential: &Credential,
        calendar_id: &str,
        body: &EventBody,
    ) -> Result<BookingConfirmation, CalendarError> {
        let url = format!("{}?conferenceDataVersion=1", self.events_url(calendar_id));

        let response = self
            .client
            .post(&url)
            .bearer_auth(credential.token())
            .json(body)
            .send()
            .await?;

        let confirmation: BookingConfirmation = handle_response(response, calendar_id).await?;
        tracing::info!("Created event {} in {}", confirmation.id, calendar_id);
        Ok(confirmation)
    }
}

/// Map status codes onto [`CalendarError`] and decode successful bodies.
async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    calendar_id: &str,
) -> Result<T, CalendarError> {
    let status = response.status();

    if status.is_success() {
        let text = response.text().await?;
        return serde_json::from_str(&text).map_err(|e| CalendarError::Decode(e.to_string()));
    }

    match status.as_u16() {
        401 | 403 => Err(CalendarError::AuthRequired),
        404 => Err(CalendarError::CalendarNotFound(calendar_id.to_string())),
        429 => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            Err(CalendarError::RateLimited(retry_after))
        }
        code => {
            let body = response.text().await.unwrap_or_default();
            Err(CalendarError::Api { status: code, body })
        }
    }
}
