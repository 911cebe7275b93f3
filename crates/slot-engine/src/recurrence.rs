//! Recurrence rule validation.
//!
//! Rules are passed through to the calendar service untouched; they are never
//! expanded here. Parsing with the `rrule` crate only catches typos before a
//! booking request goes out.

use chrono::NaiveDateTime;
use chrono_tz::Tz;
use rrule::RRuleSet;

use crate::error::{EngineError, Result};

/// Check that `rule` is a valid RFC 5545 RRULE anchored at `dtstart` in `zone`.
///
/// Accepts the rule with or without the `RRULE:` prefix and returns it in the
/// prefixed form the calendar service expects.
///
/// # Errors
/// Returns `EngineError::InvalidRule` if the rule is empty or unparseable.
pub fn validate_rule(rule: &str, dtstart: NaiveDateTime, zone: Tz) -> Result<String> {
    let trimmed = rule.trim();
    let body = trimmed
        .strip_prefix("RRULE:")
        .or_else(|| trimmed.strip_prefix("rrule:"))
        .unwrap_or(trimmed)
        .trim();

    if body.is_empty() {
        return Err(EngineError::InvalidRule("empty RRULE string".to_string()));
    }

    let rrule_text = format!(
        "DTSTART;TZID={}:{}\nRRULE:{}",
        zone.name(),
        dtstart.format("%Y%m%dT%H%M%S"),
        body
    );

    rrule_text
        .parse::<RRuleSet>()
        .map_err(|e| EngineError::InvalidRule(format!("{}", e)))?;

    Ok(format!("RRULE:{}", body))
}
