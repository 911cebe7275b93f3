//! External collaborator seams: calendar reads, calendar writes, credentials.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slot_engine::RawEvent;

use crate::booking::EventBody;
use crate::error::{CalendarError, SchedulerError};

/// A bearer token for one attendee's calendar.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Supplies a credential per attendee email.
pub trait CredentialProvider: Send + Sync {
    /// # Errors
    /// Returns `SchedulerError::Credentials` when no usable credential exists.
    fn credential_for(&self, attendee: &str) -> Result<Credential, SchedulerError>;
}

/// Reads one attendee's events in a time range.
///
/// Implementations return single occurrences (recurring events already
/// expanded) ordered by start.
#[async_trait]
pub trait CalendarSource: Send + Sync {
    async fn list_events(
        &self,
        credential: &Credential,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<RawEvent>, CalendarError>;
}

/// Creates an event.
#[async_trait]
pub trait CalendarBooker: Send + Sync {
    async fn insert_event(
        &self,
        credential: &Credential,
        calendar_id: &str,
        body: &EventBody,
    ) -> Result<BookingConfirmation, CalendarError>;
}

/// What the calendar service returns for a created event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub id: String,
    #[serde(default)]
    pub html_link: Option<String>,
}

/// In-memory tokens, optionally with one token shared by every attendee.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    tokens: HashMap<String, Credential>,
    shared: Option<Credential>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every attendee uses `token`.
    pub fn shared(token: impl Into<String>) -> Self {
        Self {
            tokens: HashMap::new(),
            shared: Some(Credential::bearer(token)),
        }
    }

    pub fn with_token(mut self, attendee: &str, token: impl Into<String>) -> Self {
        self.tokens
            .insert(attendee.to_lowercase(), Credential::bearer(token));
        self
    }
}

impl CredentialProvider for StaticCredentials {
    fn credential_for(&self, attendee: &str) -> Result<Credential, SchedulerError> {
        self.tokens
            .get(&attendee.to_lowercase())
            .or(self.shared.as_ref())
            .cloned()
            .ok_or_else(|| SchedulerError::Credentials {
                attendee: attendee.to_string(),
                reason: "no token configured".to_string(),
            })
    }
}

/// Reads `token_<email>.json` files from a directory.
///
/// Accepts both `{"access_token": ..}` and the `{"token": .., "expiry": ..}`
/// shape written by Google's authorized-user flow. Obtaining and refreshing
/// tokens happens elsewhere.
#[derive(Debug, Clone)]
pub struct TokenFileStore {
    dir: PathBuf,
}

#[derive(Deserialize)]
struct StoredToken {
    #[serde(alias = "token")]
    access_token: String,
    #[serde(default)]
    expiry: Option<String>,
}

impl TokenFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn token_path(&self, attendee: &str) -> PathBuf {
        self.dir.join(format!("token_{}.json", attendee))
    }
}

impl CredentialProvider for TokenFileStore {
    fn credential_for(&self, attendee: &str) -> Result<Credential, SchedulerError> {
        let failed = |reason: String| SchedulerError::Credentials {
            attendee: attendee.to_string(),
            reason,
        };

        let path = self.token_path(attendee);
        let json = std::fs::read_to_string(&path)
            .map_err(|e| failed(format!("{}: {}", path.display(), e)))?;
        let stored: StoredToken = serde_json::from_str(&json)
            .map_err(|e| failed(format!("{}: {}", path.display(), e)))?;

        if let Some(expiry) = stored.expiry.as_deref() {
            let expires_at = DateTime::parse_from_rfc3339(expiry)
                .map_err(|e| failed(format!("invalid expiry '{}': {}", expiry, e)))?;
            if expires_at <= Utc::now() {
                return Err(failed(format!("token expired at {}", expiry)));
            }
        }

        tracing::debug!("Loaded token for {} from {:?}", attendee, path);
        Ok(Credential::bearer(stored.access_token))
    }
}
