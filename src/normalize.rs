//! Free-text date and time normalization.
//!
//! Everything here is total: unrecognised input yields `None` (or an empty
//! [`NormalizedTimeRange`]) rather than an error, so the caller decides
//! whether a row is skipped.

use std::sync::LazyLock;

use chrono::{Datelike as _, NaiveDate, NaiveTime};
use regex::Regex;

static RE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+(?:of\s+)?([a-z]+)\b").expect("valid date regex")
});
static RE_DAY_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s*(?:-|–|—|\bto\b|&|\band\b)\s*(?:[a-z]+\.?\s+)?\d{1,2}(?:st|nd|rd|th)?\s+(?:of\s+)?([a-z]+)\b",
    )
    .expect("valid day range regex")
});
static RE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("valid year regex"));
static RE_TIME_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*(?:-|–|—|\bto\b)\s*").expect("valid time split regex"));
static RE_CLOCK_12H: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:[:.](\d{2}))?\s*([ap])\.?m\b").expect("valid 12h clock regex")
});
static RE_CLOCK_24H: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([01]?\d|2[0-3])[:.]([0-5]\d)\b").expect("valid 24h clock regex")
});
static RE_BARE_HOUR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})$").expect("valid bare hour regex"));
static RE_TIME_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b\d{1,2}(?:[:.]\d{2})?\s*(?:[ap]\.?m)?\s*(?:-|–|—|\bto\b)\s*\d{1,2}(?:[:.]\d{2})?\s*[ap]\.?m\b|\b\d{1,2}(?:[:.]\d{2})?\s*[ap]\.?m\b",
    )
    .expect("valid time span regex")
});

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Tokens that occupy a time cell without naming a time of day.
pub const NON_TIME_TOKENS: &[&str] = &[
    "ALL DAY",
    "TBC",
    "TBA",
    "TBD",
    "EVENING",
    "NO REHEARSAL",
    "EXAMS",
];

/// Number of early text fragments searched for a schedule year.
pub const YEAR_SCAN_FRAGMENTS: usize = 20;

/// First and last day named in a date field. `end >= start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSpan {
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn is_multi_day(&self) -> bool {
        self.end > self.start
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizedTimeRange {
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    /// An explicit "ALL DAY" token was present.
    pub all_day: bool,
}

/// Maps a month word ("Jan", "sept", "December") to its number.
pub fn month_number(word: &str) -> Option<u32> {
    let word = word.to_ascii_lowercase();
    if word.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|month| month.starts_with(&word))
        .map(|idx| idx as u32 + 1)
}

/// Parses the first and last `(day, month)` pairs in `text` against `year`.
///
/// "15th–16th May" yields 15 May .. 16 May. When the last date falls before
/// the first, the span is taken to cross into the next year.
pub fn parse_date_span(text: &str, year: i32) -> Option<DateSpan> {
    let mut found: Vec<(usize, NaiveDate)> = Vec::new();

    for caps in RE_DAY_RANGE.captures_iter(text) {
        let (Some(whole), Some(day), Some(month)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if let Some(date) = date_from_parts(day.as_str(), month.as_str(), year) {
            found.push((whole.start(), date));
        }
    }

    for caps in RE_DATE.captures_iter(text) {
        let (Some(whole), Some(day), Some(month)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if let Some(date) = date_from_parts(day.as_str(), month.as_str(), year) {
            found.push((whole.start(), date));
        }
    }

    found.sort_by_key(|(pos, _)| *pos);
    let start = found.first()?.1;
    let mut end = found.last()?.1;
    if end < start {
        end = end.with_year(end.year() + 1).unwrap_or(start);
    }

    Some(DateSpan { start, end })
}

/// Whether `text` contains something [`parse_date_span`] would accept.
pub fn contains_date(text: &str) -> bool {
    RE_DATE.captures_iter(text).any(|caps| {
        caps.get(2)
            .is_some_and(|month| month_number(month.as_str()).is_some())
    })
}

/// Byte range of the first date-like substring, including a day-range prefix.
pub fn find_date(text: &str) -> Option<std::ops::Range<usize>> {
    let range = RE_DAY_RANGE
        .captures_iter(text)
        .find(|caps| caps.get(2).is_some_and(|m| month_number(m.as_str()).is_some()))
        .and_then(|caps| caps.get(0))
        .map(|m| m.range());
    let single = RE_DATE
        .captures_iter(text)
        .find(|caps| caps.get(2).is_some_and(|m| month_number(m.as_str()).is_some()))
        .and_then(|caps| caps.get(0))
        .map(|m| m.range());

    match (range, single) {
        (Some(r), Some(s)) if s.start < r.start => Some(s),
        (Some(r), _) => Some(r),
        (None, s) => s,
    }
}

/// First 12-hour time or time range embedded in free text.
pub fn find_time_span(text: &str) -> Option<&str> {
    RE_TIME_SPAN.find(text).map(|m| m.as_str())
}

fn date_from_parts(day: &str, month: &str, year: i32) -> Option<NaiveDate> {
    let month = month_number(month)?;
    let day: u32 = day.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Picks the schedule year: explicit value, else the first plausible year in
/// the leading text fragments, else `today`'s year.
pub fn resolve_year<S: AsRef<str>>(explicit: Option<i32>, fragments: &[S], today: NaiveDate) -> i32 {
    if let Some(year) = explicit {
        return year;
    }

    fragments
        .iter()
        .map(AsRef::as_ref)
        .filter(|text| !text.trim().is_empty())
        .take(YEAR_SCAN_FRAGMENTS)
        .find_map(|text| {
            RE_YEAR
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
        .unwrap_or_else(|| today.year())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clock {
    Twelve {
        hour: u32,
        minute: u32,
        meridiem: Meridiem,
    },
    TwentyFour(NaiveTime),
    BareHour(u32),
}

impl Clock {
    fn meridiem(self) -> Option<Meridiem> {
        match self {
            Clock::Twelve { meridiem, .. } => Some(meridiem),
            _ => None,
        }
    }

    fn resolve(self) -> Option<NaiveTime> {
        match self {
            Clock::Twelve {
                hour,
                minute,
                meridiem,
            } => twelve_hour(hour, minute, meridiem),
            Clock::TwentyFour(time) => Some(time),
            Clock::BareHour(_) => None,
        }
    }

    /// Resolves a bare hour using the marker of the other end of a range,
    /// falling back to the opposite marker when the result would not
    /// precede (or follow) `anchor`.
    fn resolve_against(self, anchor: NaiveTime, meridiem: Meridiem, is_start: bool) -> Option<NaiveTime> {
        let Clock::BareHour(hour) = self else {
            return self.resolve();
        };
        let same = twelve_hour(hour, 0, meridiem)?;
        let ordered = if is_start { same <= anchor } else { same >= anchor };
        if ordered {
            return Some(same);
        }
        let other = match meridiem {
            Meridiem::Am => Meridiem::Pm,
            Meridiem::Pm => Meridiem::Am,
        };
        twelve_hour(hour, 0, other).or(Some(same))
    }
}

fn twelve_hour(hour: u32, minute: u32, meridiem: Meridiem) -> Option<NaiveTime> {
    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour = match (meridiem, hour) {
        (Meridiem::Am, 12) => 0,
        (Meridiem::Am, h) => h,
        (Meridiem::Pm, 12) => 12,
        (Meridiem::Pm, h) => h + 12,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn parse_clock(part: &str) -> Option<Clock> {
    let part = part.trim();

    if let Some(caps) = RE_CLOCK_12H.captures(part) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        let meridiem = if caps.get(3)?.as_str().eq_ignore_ascii_case("a") {
            Meridiem::Am
        } else {
            Meridiem::Pm
        };
        twelve_hour(hour, minute, meridiem)?;
        return Some(Clock::Twelve {
            hour,
            minute,
            meridiem,
        });
    }

    if let Some(caps) = RE_CLOCK_24H.captures(part) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
        return NaiveTime::from_hms_opt(hour, minute, 0).map(Clock::TwentyFour);
    }

    let caps = RE_BARE_HOUR.captures(part)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    (1..=12).contains(&hour).then_some(Clock::BareHour(hour))
}

/// Parses a time cell such as "6pm", "12:25pm", "2 - 4:30pm", "7pm to 9pm".
///
/// The first clock token is the start, the token after a dash or "to" is the
/// end. Anything that is not a time (TBC, EVENING, ...) gives no start.
pub fn parse_time_range(text: &str) -> NormalizedTimeRange {
    let upper = text.trim().to_uppercase();
    let all_day = upper.contains("ALL DAY");
    if upper.is_empty() {
        return NormalizedTimeRange::default();
    }

    let mut parts = RE_TIME_SPLIT.splitn(&upper, 2);
    let start_clock = parts.next().and_then(parse_clock);
    let end_clock = parts.next().and_then(parse_clock);

    let (start, end) = match (start_clock, end_clock) {
        (Some(start), Some(end)) => {
            match (start.resolve(), end.resolve()) {
                (Some(s), Some(e)) => (Some(s), Some(e)),
                (None, Some(e)) => match end.meridiem() {
                    Some(m) => (start.resolve_against(e, m, true), Some(e)),
                    None => (None, Some(e)),
                },
                (Some(s), None) => match start.meridiem() {
                    Some(m) => (Some(s), end.resolve_against(s, m, false)),
                    None => (Some(s), None),
                },
                (None, None) => (None, None),
            }
        }
        (Some(start), None) => (start.resolve(), None),
        (None, _) => (None, None),
    };

    // An end without a start is meaningless for synthesis.
    let end = if start.is_some() { end } else { None };

    NormalizedTimeRange {
        start,
        end,
        all_day,
    }
}

/// Rows matching a cancel token are dropped unless an override token also
/// appears in the same row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelPolicy {
    pub tokens: Vec<String>,
    pub overrides: Vec<String>,
}

impl Default for CancelPolicy {
    fn default() -> Self {
        Self {
            tokens: vec!["NO REHEARSAL".to_owned(), "EXAMS".to_owned()],
            overrides: Vec::new(),
        }
    }
}

impl CancelPolicy {
    /// Returns the matched cancel token, or `None` when the row stands.
    pub fn cancelled_by(&self, row_text: &str) -> Option<&str> {
        let upper = row_text.to_uppercase();
        let token = self
            .tokens
            .iter()
            .find(|token| upper.contains(&token.to_uppercase()))?;
        let overridden = self
            .overrides
            .iter()
            .any(|code| upper.contains(&code.to_uppercase()));
        (!overridden).then_some(token.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
    }

    #[test]
    fn ordinal_dates_resolve_against_year() {
        assert_eq!(parse_date_span("28th Jan", 2026), Some(DateSpan::single(ymd(2026, 1, 28))));
        assert_eq!(parse_date_span("4th Feb", 2026), Some(DateSpan::single(ymd(2026, 2, 4))));
        assert_eq!(
            parse_date_span("Wednesday 1st of October", 2026),
            Some(DateSpan::single(ymd(2026, 10, 1)))
        );
        assert_eq!(parse_date_span("Sat 22nd Sept", 2026), Some(DateSpan::single(ymd(2026, 9, 22))));
    }

    #[test]
    fn unknown_or_invalid_dates_are_none() {
        assert_eq!(parse_date_span("DATE", 2026), None);
        assert_eq!(parse_date_span("31st Feb", 2026), None);
        assert_eq!(parse_date_span("Room 12 Janitor", 2026), None);
        assert_eq!(parse_date_span("", 2026), None);
    }

    #[test]
    fn day_ranges_share_the_month() {
        let span = parse_date_span("15th–16th May", 2026).expect("span");
        assert_eq!(span.start, ymd(2026, 5, 15));
        assert_eq!(span.end, ymd(2026, 5, 16));
        assert!(span.is_multi_day());

        let span = parse_date_span("Sat 15 - Sun 16 May", 2026).expect("span");
        assert_eq!(span.start, ymd(2026, 5, 15));
        assert_eq!(span.end, ymd(2026, 5, 16));
    }

    #[test]
    fn explicit_start_and_end_dates() {
        let span = parse_date_span("15th May to 16th May", 2026).expect("span");
        assert_eq!(span.start, ymd(2026, 5, 15));
        assert_eq!(span.end, ymd(2026, 5, 16));
    }

    #[test]
    fn span_crossing_new_year_rolls_end_forward() {
        let span = parse_date_span("30th Dec - 2nd Jan", 2026).expect("span");
        assert_eq!(span.start, ymd(2026, 12, 30));
        assert_eq!(span.end, ymd(2027, 1, 2));
    }

    #[test]
    fn find_date_locates_substring() {
        let text = "Week 3 Wed 28th Jan 6pm Hall";
        let range = find_date(text).expect("date");
        assert_eq!(&text[range], "28th Jan");
        assert!(contains_date(text));
        assert!(!contains_date("Week 3 6pm Hall"));
    }

    #[test]
    fn find_time_span_prefers_ranges() {
        assert_eq!(find_time_span("Sat 4th Feb 2 - 4:30pm Hall"), Some("2 - 4:30pm"));
        assert_eq!(find_time_span("Sat 4th Feb 10am Hall"), Some("10am"));
        assert_eq!(find_time_span("Sat 4th Feb TBC Hall"), None);
    }

    #[test]
    fn year_prefers_explicit_then_fragments_then_today() {
        let today = ymd(2025, 3, 1);
        let fragments = ["Choir Schedule", "", "Spring Term 2026", "2027"];
        assert_eq!(resolve_year(Some(2030), &fragments, today), 2030);
        assert_eq!(resolve_year(None, &fragments, today), 2026);
        assert_eq!(resolve_year(None, &["no year here"], today), 2025);
    }

    #[test]
    fn year_scan_stops_after_leading_fragments() {
        let mut fragments = vec!["filler".to_owned(); YEAR_SCAN_FRAGMENTS];
        fragments.push("2031".to_owned());
        assert_eq!(resolve_year(None, &fragments, ymd(2025, 1, 1)), 2025);
    }

    #[test]
    fn twelve_hour_clock_tokens() {
        assert_eq!(parse_time_range("12:25pm").start, Some(hm(12, 25)));
        assert_eq!(parse_time_range("1pm").start, Some(hm(13, 0)));
        assert_eq!(parse_time_range("6:00pm").start, Some(hm(18, 0)));
        assert_eq!(parse_time_range("12am").start, Some(hm(0, 0)));
        assert_eq!(parse_time_range("9.30 AM").start, Some(hm(9, 30)));
        assert_eq!(parse_time_range("6pm").end, None);
    }

    #[test]
    fn ranges_split_on_dash_or_to() {
        let range = parse_time_range("2pm - 4:30pm");
        assert_eq!(range.start, Some(hm(14, 0)));
        assert_eq!(range.end, Some(hm(16, 30)));

        let range = parse_time_range("7pm to 9pm");
        assert_eq!(range.start, Some(hm(19, 0)));
        assert_eq!(range.end, Some(hm(21, 0)));
    }

    #[test]
    fn bare_start_hour_inherits_marker() {
        let range = parse_time_range("6-8pm");
        assert_eq!(range.start, Some(hm(18, 0)));
        assert_eq!(range.end, Some(hm(20, 0)));

        let range = parse_time_range("11 - 1pm");
        assert_eq!(range.start, Some(hm(11, 0)));
        assert_eq!(range.end, Some(hm(13, 0)));
    }

    #[test]
    fn twenty_four_hour_tokens_are_accepted() {
        let range = parse_time_range("18:30 - 20:00");
        assert_eq!(range.start, Some(hm(18, 30)));
        assert_eq!(range.end, Some(hm(20, 0)));
    }

    #[test]
    fn non_time_tokens_give_no_time() {
        for token in NON_TIME_TOKENS {
            let range = parse_time_range(token);
            assert_eq!(range.start, None, "{token}");
            assert_eq!(range.end, None, "{token}");
        }
        assert!(parse_time_range("All Day").all_day);
        assert!(!parse_time_range("TBC").all_day);
        assert_eq!(parse_time_range("13pm").start, None);
        assert_eq!(parse_time_range("").start, None);
    }

    #[test]
    fn cancel_tokens_respect_overrides() {
        let policy = CancelPolicy::default();
        assert_eq!(policy.cancelled_by("Wed 4th Feb NO REHEARSAL"), Some("NO REHEARSAL"));
        assert_eq!(policy.cancelled_by("Mon 9th Jun Exams"), Some("EXAMS"));
        assert_eq!(policy.cancelled_by("Wed 4th Feb 6pm Hall"), None);

        let policy = CancelPolicy {
            overrides: vec!["LT1".to_owned()],
            ..CancelPolicy::default()
        };
        assert_eq!(policy.cancelled_by("No rehearsal except brass in LT1"), None);
    }
}
