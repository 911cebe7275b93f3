//! Integration tests for the `meetslot` CLI binary.
//!
//! Calendars come from the JSON fixtures in `tests/fixtures/calendars`:
//! a@example.com is busy 13:00–14:00, b@example.com 11:00–12:00 and
//! 17:00–18:00 (Asia/Kolkata, 2026-03-16), c@example.com is unreadable.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper: path to the fixture calendars.
fn calendars_dir() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/calendars")
}

/// Helper: `meetslot` with the fixture calendars and no inherited log filter.
fn meetslot(args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("meetslot").unwrap();
    cmd.env_remove("RUST_LOG")
        .args(args)
        .args(["--events-dir", calendars_dir()]);
    cmd
}

/// Helper: write a config file into a temp dir.
fn config_file(dir: &tempfile::TempDir, contents: &str) -> String {
    let path = dir.path().join("meetslot.toml");
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// free
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn free_prints_common_slots() {
    meetslot(&[
        "free",
        "--attendee",
        "a@example.com",
        "--attendee",
        "b@example.com",
        "--date",
        "2026-03-16",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Common free slots:"))
    .stdout(predicate::str::contains("From 12:00 to 13:00"))
    .stdout(predicate::str::contains("From 14:00 to 17:00"))
    .stdout(predicate::str::contains("From 18:00 to 20:00"));
}

#[test]
fn free_json_output_is_machine_readable() {
    let output = meetslot(&[
        "free",
        "--attendee",
        "a@example.com",
        "--attendee",
        "b@example.com",
        "--date",
        "2026-03-16",
        "--json",
    ])
    .output()
    .unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["timezone"], "Asia/Kolkata");
    assert_eq!(value["common_free"].as_array().unwrap().len(), 3);
    assert_eq!(value["common_free"][0]["start"], "2026-03-16T12:00:00+05:30");
    assert_eq!(value["attendees"][1]["busy"].as_array().unwrap().len(), 2);
}

#[test]
fn free_for_empty_calendar_is_whole_window() {
    meetslot(&[
        "free",
        "--attendee",
        "nobody@example.com",
        "--date",
        "2026-03-16",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("From 11:00 to 20:00"));
}

#[test]
fn unreadable_calendar_is_excluded_with_warning() {
    meetslot(&[
        "free",
        "--attendee",
        "a@example.com",
        "--attendee",
        "c@example.com",
        "--date",
        "2026-03-16",
    ])
    .assert()
    .success()
    .stderr(predicate::str::contains("warning: c@example.com excluded"))
    .stdout(predicate::str::contains("From 11:00 to 13:00"));
}

#[test]
fn all_calendars_unreadable_fails() {
    meetslot(&[
        "free",
        "--attendee",
        "c@example.com",
        "--date",
        "2026-03-16",
    ])
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("No availability data"));
}

#[test]
fn config_file_changes_working_hours() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_file(&dir, "work_start = \"09:00\"\nwork_end = \"18:00\"\n");

    meetslot(&[
        "--config",
        &config,
        "free",
        "--attendee",
        "a@example.com",
        "--date",
        "2026-03-16",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Working hours 09:00 to 18:00"))
    .stdout(predicate::str::contains("From 09:00 to 13:00"))
    .stdout(predicate::str::contains("From 14:00 to 18:00"));
}

#[test]
fn invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_file(&dir, "timezone = \"Nowhere/Land\"\n");

    meetslot(&[
        "--config",
        &config,
        "free",
        "--attendee",
        "a@example.com",
        "--date",
        "2026-03-16",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn invalid_date_fails() {
    meetslot(&["free", "--attendee", "a@example.com", "--date", "16/03/2026"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date"));
}

// ─────────────────────────────────────────────────────────────────────────────
// book
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn book_free_slot_prints_dry_run_event() {
    meetslot(&[
        "book",
        "--attendee",
        "a@example.com",
        "--attendee",
        "b@example.com",
        "--date",
        "2026-03-16",
        "--start",
        "14:30",
        "--end",
        "15:00",
        "--summary",
        "Planning",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Requested time slot is available."))
    .stdout(predicate::str::contains("Dry run"))
    .stdout(predicate::str::contains("\"summary\": \"Planning\""))
    .stdout(predicate::str::contains("\"dateTime\": \"2026-03-16T14:30:00\""))
    .stdout(predicate::str::contains("hangoutsMeet"));
}

#[test]
fn book_busy_slot_lists_alternatives_and_exits_2() {
    meetslot(&[
        "book",
        "--attendee",
        "a@example.com",
        "--attendee",
        "b@example.com",
        "--date",
        "2026-03-16",
        "--start",
        "11:30",
        "--end",
        "12:30",
    ])
    .assert()
    .code(2)
    .stdout(predicate::str::contains("Requested time slot is not available."))
    .stdout(predicate::str::contains("From 12:00 to 13:00"))
    .stdout(predicate::str::contains("From 14:00 to 17:00"))
    .stdout(predicate::str::contains("From 18:00 to 20:00"))
    .stdout(predicate::str::contains(
        "Earliest slot that fits: From 12:00 to 13:00",
    ));
}

#[test]
fn rejection_suggests_first_slot_long_enough() {
    // Two hours: 12:00–13:00 is too short, 14:00–17:00 fits.
    meetslot(&[
        "book",
        "--attendee",
        "a@example.com",
        "--attendee",
        "b@example.com",
        "--date",
        "2026-03-16",
        "--start",
        "12:00",
        "--end",
        "14:00",
    ])
    .assert()
    .code(2)
    .stdout(predicate::str::contains(
        "Earliest slot that fits: From 14:00 to 17:00",
    ));
}

#[test]
fn book_without_end_uses_default_duration() {
    // 13:00 + 60 minutes overlaps a@example.com's 13:00–14:00 meeting.
    meetslot(&[
        "book",
        "--attendee",
        "b@example.com",
        "--attendee",
        "a@example.com",
        "--date",
        "2026-03-16",
        "--start",
        "12:30",
    ])
    .assert()
    .code(2);
}

#[test]
fn book_rejection_json_reports_status() {
    let output = meetslot(&[
        "book",
        "--attendee",
        "a@example.com",
        "--date",
        "2026-03-16",
        "--start",
        "13:15",
        "--end",
        "13:45",
        "--json",
    ])
    .output()
    .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["status"], "rejected");
    assert_eq!(value["satisfied"], false);
    assert_eq!(value["requested"]["start"], "2026-03-16T13:15:00+05:30");
    assert_eq!(value["earliest_fit"]["start"], "2026-03-16T11:00:00+05:30");
    assert_eq!(value["earliest_fit"]["end"], "2026-03-16T13:00:00+05:30");
}

#[test]
fn book_inverted_range_fails() {
    meetslot(&[
        "book",
        "--attendee",
        "a@example.com",
        "--date",
        "2026-03-16",
        "--start",
        "15:00",
        "--end",
        "14:00",
    ])
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("Invalid request range"));
}

#[test]
fn book_invalid_recurrence_fails() {
    meetslot(&[
        "book",
        "--attendee",
        "a@example.com",
        "--date",
        "2026-03-16",
        "--start",
        "15:00",
        "--recurrence",
        "RRULE:FREQ=FORTNIGHTLY",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Invalid --recurrence"));
}

// ─────────────────────────────────────────────────────────────────────────────
// events
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn events_lists_calendar_in_order() {
    meetslot(&[
        "events",
        "--attendee",
        "b@example.com",
        "--from",
        "2026-03-16",
        "--days",
        "1",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Upcoming events for b@example.com:"))
    .stdout(predicate::str::contains("2026-03-16 11:00 to 12:00  Standup"))
    .stdout(predicate::str::contains("2026-03-16 17:00 to 18:00  Customer call"))
    .stdout(predicate::str::contains("Next day").not());
}

#[test]
fn events_json_respects_max() {
    let output = meetslot(&[
        "events",
        "--attendee",
        "b@example.com",
        "--from",
        "2026-03-16",
        "--days",
        "2",
        "--max",
        "1",
        "--json",
    ])
    .output()
    .unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let events = value.as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["summary"], "Standup");
    assert_eq!(events[0]["start"], "2026-03-16T11:00:00+05:30");
    assert_eq!(events[0]["all_day"], false);
}

#[test]
fn events_for_unreadable_calendar_fails() {
    meetslot(&["events", "--attendee", "c@example.com", "--from", "2026-03-16"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to list events"));
}

// ─────────────────────────────────────────────────────────────────────────────
// ask
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn ask_without_api_key_fails() {
    meetslot(&["ask", "sync with b@example.com at 3pm"])
        .env_remove("GROQ_API_KEY")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GROQ_API_KEY"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ask_extracts_and_books() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content":
                "summary: Roadmap\nstart_date: 2026-03-16\nstart_time: 14:30\nend_time: 15:00\ntime_zone: IST\nattendees: a@example.com, b@example.com\nconference_data: yes"
            }}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = config_file(
        &dir,
        &format!(
            "[extraction]\nendpoint = \"{}/v1/chat/completions\"\n\n[extraction.retry]\nmax_attempts = 1\n",
            server.uri()
        ),
    );

    let output = tokio::task::spawn_blocking(move || {
        meetslot(&["--config", &config, "ask", "roadmap with a and b today 2:30pm"])
            .env("GROQ_API_KEY", "test-key")
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Requested time slot is available."));
    assert!(stdout.contains("\"summary\": \"Roadmap\""));
}

#[test]
fn missing_subcommand_shows_usage() {
    Command::cargo_bin("meetslot")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
