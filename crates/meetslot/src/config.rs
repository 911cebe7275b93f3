//! Scheduler configuration.
//!
//! One explicit value handed to the coordinator at construction. Loaded from
//! TOML; every section falls back to its defaults, so a partial file is valid.

use std::path::Path;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use slot_engine::window::{default_work_end, default_work_start};
use slot_engine::{parse_zone, WorkWindow, DEFAULT_TIMEZONE};

use crate::error::{Result, SchedulerError};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Canonical IANA zone for working hours and display.
    pub timezone: String,

    /// Start of working hours, local `HH:MM`.
    #[serde(with = "hhmm")]
    pub work_start: NaiveTime,

    /// End of working hours, local `HH:MM`.
    #[serde(with = "hhmm")]
    pub work_end: NaiveTime,

    /// Per-attendee calendar fetch timeout.
    pub fetch_timeout_secs: u64,

    /// Upper bound on concurrent calendar fetches.
    pub max_concurrent_fetches: usize,

    /// Calendar that receives bookings.
    pub calendar_id: String,

    /// Email always added as the organizer, when set.
    pub default_host: Option<String>,

    /// Meeting length used when a request has no end time.
    pub default_duration_minutes: i64,

    pub booking: BookingDefaults,

    pub extraction: ExtractionConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            work_start: default_work_start(),
            work_end: default_work_end(),
            fetch_timeout_secs: 10,
            max_concurrent_fetches: 4,
            calendar_id: "primary".to_string(),
            default_host: None,
            default_duration_minutes: 60,
            booking: BookingDefaults::default(),
            extraction: ExtractionConfig::default(),
        }
    }
}

/// Values used for booking fields the request leaves unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingDefaults {
    pub summary: String,
    pub location: String,
    pub description: String,
    pub recurrence: Option<String>,
    pub conference: bool,
    pub color_id: Option<String>,
    pub reminders: Vec<ReminderOverride>,
}

impl Default for BookingDefaults {
    fn default() -> Self {
        Self {
            summary: "Meeting Summary".to_string(),
            location: "Any Location".to_string(),
            description: "Meeting Description".to_string(),
            recurrence: Some("RRULE:FREQ=DAILY;COUNT=1".to_string()),
            conference: true,
            color_id: Some("6".to_string()),
            reminders: vec![
                ReminderOverride {
                    method: "email".to_string(),
                    minutes: 24 * 60,
                },
                ReminderOverride {
                    method: "popup".to_string(),
                    minutes: 10,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: u32,
}

/// Language-model extraction endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// OpenAI-compatible chat-completions URL.
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub request_timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.1-70b-versatile".to_string(),
            temperature: 0.2,
            api_key_env: "GROQ_API_KEY".to_string(),
            request_timeout_secs: 30,
            retry: RetryPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    /// Read and validate a TOML configuration file.
    ///
    /// # Errors
    /// Returns `SchedulerError::Config` if the file cannot be read, does not
    /// parse, or fails [`SchedulerConfig::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SchedulerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: SchedulerConfig =
            toml::from_str(contents).map_err(|e| SchedulerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SchedulerError::Config(e.to_string()))
    }

    /// Reject settings the coordinator cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.zone()?;
        if self.work_start >= self.work_end {
            return Err(SchedulerError::Config(format!(
                "work_start {} must be before work_end {}",
                self.work_start.format("%H:%M"),
                self.work_end.format("%H:%M")
            )));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(SchedulerError::Config(
                "max_concurrent_fetches must be at least 1".to_string(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(SchedulerError::Config(
                "fetch_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.default_duration_minutes <= 0 {
            return Err(SchedulerError::Config(
                "default_duration_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn zone(&self) -> Result<Tz> {
        parse_zone(&self.timezone).map_err(|e| SchedulerError::Config(e.to_string()))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn default_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.default_duration_minutes)
    }

    /// Working-hours window for `date` in the canonical zone.
    pub fn work_window(&self, date: NaiveDate) -> Result<WorkWindow> {
        Ok(WorkWindow::new(date, self.work_start, self.work_end, self.zone()?)?)
    }
}

/// `HH:MM` (or `HH:MM:SS`) wall-clock times.
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid time '{}', expected HH:MM", raw)))
    }

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SchedulerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.zone().unwrap(), Tz::Asia__Kolkata);
        assert_eq!(config.work_start.format("%H:%M").to_string(), "11:00");
        assert_eq!(config.work_end.format("%H:%M").to_string(), "20:00");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = SchedulerConfig::from_toml_str(
            r#"
            timezone = "Europe/London"
            work_start = "09:00"
            work_end = "17:30"

            [booking]
            summary = "Sync"
            "#,
        )
        .unwrap();

        assert_eq!(config.timezone, "Europe/London");
        assert_eq!(config.work_end, NaiveTime::from_hms_opt(17, 30, 0).unwrap());
        assert_eq!(config.booking.summary, "Sync");
        assert_eq!(config.booking.location, "Any Location");
        assert_eq!(config.max_concurrent_fetches, 4);
        assert_eq!(config.extraction.retry.max_attempts, 3);
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(
            SchedulerConfig::from_toml_str("").unwrap(),
            SchedulerConfig::default()
        );
    }

    #[test]
    fn toml_round_trip_preserves_times() {
        let config = SchedulerConfig::default();
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("work_start = \"11:00\""));
        assert_eq!(SchedulerConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn rejects_bad_settings() {
        assert!(SchedulerConfig::from_toml_str(r#"timezone = "Nowhere/Land""#).is_err());
        assert!(SchedulerConfig::from_toml_str("work_start = \"20:00\"\nwork_end = \"11:00\"").is_err());
        assert!(SchedulerConfig::from_toml_str("max_concurrent_fetches = 0").is_err());
        assert!(SchedulerConfig::from_toml_str("fetch_timeout_secs = 0").is_err());
        assert!(SchedulerConfig::from_toml_str(r#"work_start = "25:00""#).is_err());
    }

    #[test]
    fn work_window_uses_canonical_zone() {
        let config = SchedulerConfig::default();
        let window = config
            .work_window(NaiveDate::from_ymd_opt(2026, 3, 16).unwrap())
            .unwrap();
        assert_eq!(
            window.interval().start().to_rfc3339(),
            "2026-03-16T05:30:00+00:00"
        );
    }
}
