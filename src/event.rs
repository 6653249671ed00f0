use chrono::{Duration, NaiveDate, NaiveDateTime};
use sha2::Digest as _;

use crate::normalize::{CancelPolicy, parse_date_span, parse_time_range};
use crate::roles::RawRowFields;

pub const UID_SUFFIX: &str = "@skedcal.gen";
pub const DEFAULT_NOTE: &str = "Scheduled Event";
pub const DEFAULT_LOCATION: &str = "TBC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl EventTime {
    pub fn date(&self) -> NaiveDate {
        match self {
            EventTime::Date(date) => *date,
            EventTime::DateTime(dt) => dt.date(),
        }
    }
}

impl std::fmt::Display for EventTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventTime::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            EventTime::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M")),
        }
    }
}

/// A fully synthesized calendar event. All-day events carry an exclusive
/// end date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub uid: String,
    pub summary: String,
    pub location: String,
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
}

/// Why a table row produced no event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("section heading: {0}")]
    SectionHeading(String),
    #[error("column header row")]
    HeaderRow,
    #[error("no date field")]
    NoDate,
    #[error("unparseable date: {0}")]
    UnparseableDate(String),
    #[error("cancelled ({0})")]
    Cancelled(String),
    #[error("time out of range")]
    TimeOutOfRange,
}

pub type RowOutcome = Result<EventRecord, SkipReason>;

/// Per-document inputs shared by every row.
#[derive(Debug, Clone)]
pub struct SynthesisContext {
    pub calendar_name: String,
    pub year: i32,
    pub default_duration: Duration,
    pub cancel: CancelPolicy,
}

/// Derives the stable identifier for a `(calendar, date, note)` tuple.
pub fn event_uid(calendar_name: &str, date_key: &str, note: &str) -> String {
    let seed = format!("{calendar_name}-{date_key}-{note}")
        .trim()
        .to_lowercase();
    let mut hasher = sha2::Sha256::new();
    hasher.update(seed.as_bytes());
    format!("{}{UID_SUFFIX}", hex::encode(hasher.finalize()))
}

/// Turns one row's raw fields into an event, or says why it cannot.
pub fn synthesize(ctx: &SynthesisContext, fields: &RawRowFields, section: Option<&str>) -> RowOutcome {
    if let Some(token) = ctx.cancel.cancelled_by(&fields.row_text) {
        return Err(SkipReason::Cancelled(token.to_owned()));
    }

    let span = parse_date_span(&fields.date, ctx.year)
        .ok_or_else(|| SkipReason::UnparseableDate(fields.date.clone()))?;
    let times = parse_time_range(fields.time.as_deref().unwrap_or_default());
    let all_day = times.start.is_none()
        && (times.all_day || fields.row_text.to_uppercase().contains("ALL DAY"));

    let (start, end) = match times.start {
        Some(start_time) => {
            let start = span.start.and_time(start_time);
            let end = match times.end {
                Some(end_time) => {
                    let end = span.start.and_time(end_time);
                    // An end before the start runs past midnight.
                    if end < start {
                        end.checked_add_signed(Duration::days(1))
                            .ok_or(SkipReason::TimeOutOfRange)?
                    } else {
                        end
                    }
                }
                None => start
                    .checked_add_signed(ctx.default_duration)
                    .ok_or(SkipReason::TimeOutOfRange)?,
            };
            (EventTime::DateTime(start), EventTime::DateTime(end))
        }
        None => {
            let end = span
                .end
                .succ_opt()
                .ok_or(SkipReason::TimeOutOfRange)?;
            (EventTime::Date(span.start), EventTime::Date(end))
        }
    };

    let note = fields.note.as_deref().unwrap_or(DEFAULT_NOTE);
    let mut summary = format!("{}: {note}", ctx.calendar_name);
    if all_day {
        summary.push_str(" (All Day)");
    }

    let mut description = Vec::new();
    if let Some(section) = section {
        description.push(format!("Section: {section}"));
    }
    if let Some(reference) = fields.reference.as_deref() {
        description.push(format!("Ref: {reference}"));
    }

    let date_key = span.start.format("%Y-%m-%d").to_string();

    Ok(EventRecord {
        uid: event_uid(&ctx.calendar_name, &date_key, note),
        summary,
        location: fields
            .location
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCATION.to_owned()),
        description: (!description.is_empty()).then(|| description.join("\n")),
        start,
        end,
    })
}
