//! `meetslot` CLI: find common free time and book meetings.
//!
//! ## Usage
//!
//! ```sh
//! # Free slots of two attendees on a date, from JSON calendar files
//! meetslot free --attendee a@example.com --attendee b@example.com \
//!     --date 2026-03-16 --events-dir calendars/
//!
//! # Book 14:30–15:00 if everyone is free (Google Calendar, token files in ./tokens)
//! meetslot book --attendee host@example.com --attendee b@example.com \
//!     --date 2026-03-16 --start 14:30 --end 15:00 --tokens-dir tokens/
//!
//! # Upcoming events on one calendar
//! meetslot events --attendee b@example.com --max 5 --tokens-dir tokens/
//!
//! # Let the language model read the request (needs GROQ_API_KEY)
//! meetslot ask "30 min sync with b@example.com tomorrow at 3pm" --dry-run
//! ```
//!
//! Exit status is 0 on success, 2 when the requested slot is not available,
//! and 1 on any error.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use meetslot::{
    Availability, CalendarBooker, CalendarEntry, ChatCompletionExtractor, DayAvailability,
    GoogleCalendarClient, JsonCalendarSource, MeetingDetails, MeetingExtractor, Outcome,
    RecordingBooker, SchedulerConfig, SchedulingCoordinator, SchedulingRequest, StaticCredentials,
    TokenFileStore,
};
use slot_engine::{find_first_fit, resolve_local, validate_rule, Interval, SlotDecision};
use tracing_subscriber::EnvFilter;

/// Exit status when the requested slot is taken.
const EXIT_UNAVAILABLE: i32 = 2;

#[derive(Parser)]
#[command(
    name = "meetslot",
    version,
    about = "Find common free time across calendars and book meetings"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show each attendee's free slots and the common free slots
    Free {
        /// Attendee email (repeatable)
        #[arg(long = "attendee", required = true)]
        attendees: Vec<String>,
        /// Date in YYYY-MM-DD
        #[arg(long)]
        date: String,
        #[command(flatten)]
        source: SourceArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Book a meeting if every attendee is free
    Book {
        /// Attendee email (repeatable); the first one organizes
        #[arg(long = "attendee", required = true)]
        attendees: Vec<String>,
        /// Date in YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Start time, HH:MM
        #[arg(long)]
        start: String,
        /// End time, HH:MM (defaults to start plus the configured duration)
        #[arg(long)]
        end: Option<String>,
        #[command(flatten)]
        details: DetailArgs,
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        output: BookOutputArgs,
    },
    /// List upcoming events on one attendee's calendar
    Events {
        /// Calendar owner's email
        #[arg(long)]
        attendee: String,
        /// First day to list, YYYY-MM-DD (defaults to now)
        #[arg(long)]
        from: Option<String>,
        /// Number of days to look ahead
        #[arg(long, default_value_t = 7)]
        days: u32,
        /// Maximum number of events to print
        #[arg(long = "max", default_value_t = 10)]
        max: usize,
        #[command(flatten)]
        source: SourceArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Describe the meeting in plain language and book it
    Ask {
        /// The request, e.g. "sync with b@example.com tomorrow at 3pm"
        text: String,
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        output: BookOutputArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Read calendars from `<email>.json` files in this directory (implies --dry-run)
    #[arg(long, conflicts_with = "tokens_dir")]
    events_dir: Option<PathBuf>,
    /// Directory holding `token_<email>.json` files for Google Calendar
    #[arg(long, default_value = ".")]
    tokens_dir: PathBuf,
}

#[derive(Args)]
struct DetailArgs {
    #[arg(long)]
    summary: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    description: Option<String>,
    /// RRULE, e.g. "RRULE:FREQ=WEEKLY;COUNT=4"
    #[arg(long)]
    recurrence: Option<String>,
    /// Do not request a video conference
    #[arg(long)]
    no_conference: bool,
}

#[derive(Args)]
struct BookOutputArgs {
    /// Check and print the event instead of creating it
    #[arg(long)]
    dry_run: bool,
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => SchedulerConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => SchedulerConfig::default(),
    };
    let zone = config.zone()?;

    match cli.command {
        Commands::Free {
            attendees,
            date,
            source,
            json,
        } => {
            let date = parse_date(&date)?;
            let coordinator = build_coordinator(config, &source, true)?;
            let day = coordinator
                .free_slots(&attendees, date)
                .await
                .context("Failed to resolve availability")?;
            print_warnings(&day);
            if json {
                println!("{}", serde_json::to_string_pretty(&day_json(&day))?);
            } else {
                print_day(&day);
            }
        }
        Commands::Book {
            attendees,
            date,
            start,
            end,
            details,
            source,
            output,
        } => {
            let date = parse_date(&date)?;
            let start = date.and_time(parse_time(&start)?);
            let end = match end {
                Some(end) => date.and_time(parse_time(&end)?),
                None => start + config.default_duration(),
            };
            let recurrence = details
                .recurrence
                .as_deref()
                .map(|rule| validate_rule(rule, start, zone))
                .transpose()
                .context("Invalid --recurrence")?;

            let request = SchedulingRequest::new(attendees, start, end, zone).with_details(MeetingDetails {
                summary: details.summary,
                location: details.location,
                description: details.description,
                recurrence,
                conference: details.no_conference.then_some(false),
            });
            run_booking(config, &source, &output, &request).await?;
        }
        Commands::Events {
            attendee,
            from,
            days,
            max,
            source,
            json,
        } => {
            let from: DateTime<Utc> = match from {
                Some(raw) => {
                    let date = parse_date(&raw)?;
                    resolve_local(date.and_time(NaiveTime::MIN), zone)
                        .with_context(|| format!("Invalid --from date '{}'", raw))?
                }
                None => Utc::now(),
            };
            let until = from + Duration::days(i64::from(days));
            let coordinator = build_coordinator(config, &source, true)?;
            let entries = coordinator
                .upcoming_events(&attendee, from, until, max)
                .await
                .context("Failed to list events")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&events_json(&entries, zone))?);
            } else {
                print_events(&attendee, &entries, zone);
            }
        }
        Commands::Ask {
            text,
            source,
            output,
        } => {
            let extractor = ChatCompletionExtractor::from_config(&config.extraction)?;
            let today = Utc::now().with_timezone(&zone).date_naive();
            let draft = extractor
                .extract(&text, today)
                .await
                .context("Failed to extract meeting details")?;
            tracing::info!("Extracted draft:\n{}", draft);
            let request = draft
                .finalize(&config, today)
                .context("Invalid meeting request")?;
            run_booking(config, &source, &output, &request).await?;
        }
    }

    Ok(())
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Pick collaborators: JSON files and a dry-run booker with `--events-dir`,
/// Google Calendar with token files otherwise.
fn build_coordinator(
    config: SchedulerConfig,
    source: &SourceArgs,
    dry_run: bool,
) -> Result<SchedulingCoordinator> {
    let coordinator = match &source.events_dir {
        Some(dir) => SchedulingCoordinator::new(
            config,
            Arc::new(JsonCalendarSource::new(dir)),
            Arc::new(RecordingBooker::new()),
            Arc::new(StaticCredentials::shared("offline")),
        ),
        None => {
            let google = Arc::new(GoogleCalendarClient::new());
            let booker: Arc<dyn CalendarBooker> = if dry_run {
                Arc::new(RecordingBooker::new())
            } else {
                google.clone()
            };
            SchedulingCoordinator::new(
                config,
                google,
                booker,
                Arc::new(TokenFileStore::new(&source.tokens_dir)),
            )
        }
    };
    coordinator.context("Failed to start scheduler")
}

async fn run_booking(
    config: SchedulerConfig,
    source: &SourceArgs,
    output: &BookOutputArgs,
    request: &SchedulingRequest,
) -> Result<()> {
    let dry_run = output.dry_run || source.events_dir.is_some();
    let coordinator = build_coordinator(config, source, dry_run)?;
    let outcome = coordinator
        .schedule(request)
        .await
        .context("Scheduling failed")?;
    let availability = outcome.availability();
    print_warnings(&availability.day);

    match &outcome {
        Outcome::Booked {
            confirmation, body, ..
        } => {
            if output.json {
                let mut value = availability_json(availability);
                value["status"] = "booked".into();
                value["event"] = serde_json::json!({
                    "id": confirmation.id,
                    "htmlLink": confirmation.html_link,
                    "dryRun": dry_run,
                    "body": body,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else if dry_run {
                println!("Requested time slot is available.");
                println!("Dry run, event not created:");
                println!("{}", serde_json::to_string_pretty(body)?);
            } else {
                let link = confirmation.html_link.as_deref().unwrap_or(&confirmation.id);
                println!("Event created: {}", link);
            }
        }
        Outcome::Rejected { .. } => {
            let requested = availability.result.requested;
            let earliest = find_first_fit(&availability.result.common_free, requested.duration());
            if output.json {
                let mut value = availability_json(availability);
                value["status"] = "rejected".into();
                value["earliest_fit"] = earliest
                    .map(|slot| slot_json(&slot, availability.zone()))
                    .unwrap_or(serde_json::Value::Null);
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Requested time slot is not available.");
                let zone = availability.zone();
                if let SlotDecision::Unavailable(alternatives) = availability.decision() {
                    if alternatives.is_empty() {
                        println!("No common free time on this day.");
                    } else {
                        println!("Available time slots:");
                        for slot in &alternatives {
                            println!("  {}", format_slot(slot, zone));
                        }
                    }
                }
                if let Some(slot) = earliest {
                    println!("Earliest slot that fits: {}", format_slot(&slot, zone));
                }
            }
            process::exit(EXIT_UNAVAILABLE);
        }
    }

    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", raw))
}

fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .with_context(|| format!("Invalid time '{}', expected HH:MM", raw))
}

fn format_slot(slot: &Interval, zone: Tz) -> String {
    let (start, end) = slot.in_zone(zone);
    format!("From {} to {}", start.format("%H:%M"), end.format("%H:%M"))
}

fn print_warnings(day: &DayAvailability) {
    for warning in &day.warnings {
        eprintln!("warning: {}", warning);
    }
}

fn print_day(day: &DayAvailability) {
    let zone = day.window.zone();
    println!(
        "Working hours {} to {} ({}) on {}",
        day.window.start_time().format("%H:%M"),
        day.window.end_time().format("%H:%M"),
        zone.name(),
        day.window.date()
    );
    for schedule in &day.schedules {
        println!("{}:", schedule.attendee);
        print_slots(&schedule.free, zone);
    }
    println!("Common free slots:");
    print_slots(&day.common_free, zone);
}

fn print_slots(slots: &[Interval], zone: Tz) {
    if slots.is_empty() {
        println!("  (none)");
    }
    for slot in slots {
        println!("  {}", format_slot(slot, zone));
    }
}

fn print_events(attendee: &str, entries: &[CalendarEntry], zone: Tz) {
    println!("Upcoming events for {}:", attendee);
    if entries.is_empty() {
        println!("  (none)");
    }
    for entry in entries {
        let start = entry.start.with_timezone(&zone);
        let end = entry.end.with_timezone(&zone);
        let when = if entry.all_day {
            format!("{} (all day)", start.format("%Y-%m-%d"))
        } else if start.date_naive() == end.date_naive() {
            format!("{} to {}", start.format("%Y-%m-%d %H:%M"), end.format("%H:%M"))
        } else {
            format!("{} to {}", start.format("%Y-%m-%d %H:%M"), end.format("%Y-%m-%d %H:%M"))
        };
        println!("  {}  {}", when, entry.summary);
    }
}

fn events_json(entries: &[CalendarEntry], zone: Tz) -> serde_json::Value {
    entries
        .iter()
        .map(|entry| {
            serde_json::json!({
                "summary": entry.summary,
                "start": entry.start.with_timezone(&zone).to_rfc3339(),
                "end": entry.end.with_timezone(&zone).to_rfc3339(),
                "all_day": entry.all_day,
            })
        })
        .collect()
}

fn slot_json(slot: &Interval, zone: Tz) -> serde_json::Value {
    let (start, end) = slot.in_zone(zone);
    serde_json::json!({ "start": start.to_rfc3339(), "end": end.to_rfc3339() })
}

fn slots_json(slots: &[Interval], zone: Tz) -> serde_json::Value {
    slots.iter().map(|slot| slot_json(slot, zone)).collect()
}

fn day_json(day: &DayAvailability) -> serde_json::Value {
    let zone = day.window.zone();
    serde_json::json!({
        "date": day.window.date().to_string(),
        "timezone": zone.name(),
        "window": slot_json(&day.window.interval(), zone),
        "attendees": day.schedules.iter().map(|s| serde_json::json!({
            "attendee": s.attendee,
            "busy": slots_json(&s.busy, zone),
            "free": slots_json(&s.free, zone),
        })).collect::<Vec<_>>(),
        "common_free": slots_json(&day.common_free, zone),
        "excluded": day.excluded,
        "warnings": day.warnings,
    })
}

fn availability_json(availability: &Availability) -> serde_json::Value {
    let zone = availability.zone();
    let mut value = day_json(&availability.day);
    value["requested"] = slot_json(&availability.result.requested, zone);
    value["satisfied"] = availability.result.satisfied.into();
    value
}
