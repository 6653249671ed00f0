use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, TimeZone as _};
use chrono_tz::Tz;
use icalendar::{Calendar, CalendarComponent, Component as _, Event, Property};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::event::{EventRecord, EventTime};

/// Calendar-level properties, applied only when a document is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarMeta {
    pub name: String,
    pub timezone: Tz,
}

impl CalendarMeta {
    pub fn product_id(&self) -> String {
        format!("-//skedcal//{}//EN", self.name)
    }
}

/// What to do when an inserted event's UID is already present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Always append; repeated runs duplicate entries.
    #[default]
    Append,
    ReplaceByUid,
}

/// Whether an existing calendar file is extended or replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    #[default]
    Merge,
    Overwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Appended,
    Replaced,
}

/// An iCalendar document being built up or extended.
#[derive(Debug, Clone)]
pub struct CalendarDocument {
    calendar: Calendar,
    timezone: Tz,
}

impl CalendarDocument {
    pub fn new(meta: &CalendarMeta) -> Self {
        let mut calendar = Calendar::empty();
        calendar
            .append_property(("PRODID", meta.product_id().as_str()))
            .append_property(("VERSION", "2.0"))
            .append_property(("CALSCALE", "GREGORIAN"))
            .name(&meta.name)
            .timezone(meta.timezone.name());

        Self {
            calendar,
            timezone: meta.timezone,
        }
    }

    /// Loads a persisted calendar. Its own X-WR-TIMEZONE, when it names a
    /// known zone, wins over `fallback_timezone` for newly inserted events.
    pub fn parse(ics: &str, fallback_timezone: Tz) -> Result<Self, String> {
        let calendar = ics.parse::<Calendar>().map_err(|err| format!("{err}"))?;
        let timezone = calendar
            .get_timezone()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(fallback_timezone);
        Ok(Self { calendar, timezone })
    }

    pub fn name(&self) -> Option<&str> {
        self.calendar.get_name()
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn event_count(&self) -> usize {
        self.events().count()
    }

    pub fn uids(&self) -> Vec<&str> {
        self.events().filter_map(|event| event.get_uid()).collect()
    }

    fn events(&self) -> impl Iterator<Item = &Event> {
        self.calendar.components.iter().filter_map(|component| match component {
            CalendarComponent::Event(event) => Some(event),
            _ => None,
        })
    }

    pub fn insert(&mut self, record: &EventRecord, policy: MergePolicy) -> InsertOutcome {
        let event = to_ical_event(record, self.timezone);

        if policy == MergePolicy::ReplaceByUid {
            let existing = self.calendar.components.iter().position(|component| {
                matches!(component, CalendarComponent::Event(e) if e.get_uid() == Some(record.uid.as_str()))
            });
            if let Some(idx) = existing {
                self.calendar.components[idx] = CalendarComponent::Event(event);
                return InsertOutcome::Replaced;
            }
        }

        self.calendar.push(event);
        InsertOutcome::Appended
    }

    pub fn to_ics(&self) -> String {
        self.calendar.to_string()
    }
}

fn to_ical_event(record: &EventRecord, timezone: Tz) -> Event {
    let mut event = Event::new();
    event
        .uid(&record.uid)
        .summary(&record.summary)
        .add_property("LOCATION", &record.location)
        .append_property(time_property("DTSTART", record.start, timezone))
        .append_property(time_property("DTEND", record.end, timezone));
    if let Some(description) = &record.description {
        event.description(description);
    }
    event.done()
}

/// Dates carry `VALUE=DATE`; date-times are local to `timezone` and written
/// in UTC, so no VTIMEZONE is needed.
fn time_property(key: &str, time: EventTime, timezone: Tz) -> Property {
    match time {
        EventTime::Date(date) => {
            let mut prop = Property::new(key, date.format("%Y%m%d").to_string());
            prop.add_parameter("VALUE", "DATE");
            prop
        }
        EventTime::DateTime(date_time) => {
            let utc = local_to_utc(date_time, timezone);
            Property::new(key, utc.format("%Y%m%dT%H%M%SZ").to_string())
        }
    }
}

/// Ambiguous local times take the earlier instant; times skipped by a
/// forward clock change are read as an hour later.
fn local_to_utc(local: NaiveDateTime, timezone: Tz) -> NaiveDateTime {
    timezone
        .from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            timezone
                .from_local_datetime(&(local + chrono::Duration::hours(1)))
                .earliest()
        })
        .map_or(local, |instant| instant.naive_utc())
}

/// `Choir Rehearsals: Spring 2026!` becomes `Choir_Rehearsals_Spring_2026`.
pub fn file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            stem.push(ch);
        } else if !stem.is_empty() && !stem.ends_with('_') {
            stem.push('_');
        }
    }
    while stem.ends_with('_') {
        stem.pop();
    }
    if stem.is_empty() {
        "schedule".to_owned()
    } else {
        stem
    }
}

pub fn calendar_path(out_dir: &Path, name: &str) -> PathBuf {
    out_dir.join(format!("{}.ics", file_stem(name)))
}

/// Opens the document at `path` for a run.
pub fn load_or_new(
    path: &Path,
    meta: &CalendarMeta,
    mode: WriteMode,
) -> Result<CalendarDocument, ScheduleError> {
    if mode == WriteMode::Overwrite || !path.exists() {
        return Ok(CalendarDocument::new(meta));
    }

    let ics = std::fs::read_to_string(path).map_err(|source| ScheduleError::LoadCalendar {
        path: path.to_owned(),
        source,
    })?;
    let document = CalendarDocument::parse(&ics, meta.timezone).map_err(|message| {
        ScheduleError::ParseCalendar {
            path: path.to_owned(),
            message,
        }
    })?;
    tracing::debug!(
        path = %path.display(),
        events = document.event_count(),
        "loaded existing calendar"
    );
    Ok(document)
}

/// Writes the whole document, replacing `path` in one step.
pub fn save(document: &CalendarDocument, path: &Path) -> Result<(), ScheduleError> {
    let write_err = |source| ScheduleError::WriteCalendar {
        path: path.to_owned(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(document.to_ics().as_bytes())
        .map_err(write_err)?;
    temp.flush().map_err(write_err)?;
    temp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}
