use serde::{Deserialize, Serialize};

use crate::grid::LogicalGrid;
use crate::normalize::{contains_date, find_date, find_time_span};

/// Column indices for each field role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub reference: Option<usize>,
    pub date: usize,
    pub time: Option<usize>,
    pub location: Option<usize>,
    pub note: Option<usize>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            reference: Some(0),
            date: 1,
            time: Some(2),
            location: Some(3),
            note: Some(4),
        }
    }
}

/// How a table's columns are mapped onto roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnStrategy {
    Fixed {
        #[serde(default)]
        columns: ColumnMap,
    },
    Header,
    Scan,
}

impl Default for ColumnStrategy {
    fn default() -> Self {
        ColumnStrategy::Fixed {
            columns: ColumnMap::default(),
        }
    }
}

/// The raw strings a row contributes to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRowFields {
    pub date: String,
    pub time: Option<String>,
    pub location: Option<String>,
    pub note: Option<String>,
    pub reference: Option<String>,
    pub row_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Fields(RawRowFields),
    /// A column-heading row; consumed without producing fields.
    Header,
    NoDate,
}

/// A [`ColumnStrategy`] bound to one table. Header detection carries the
/// columns it has discovered from row to row, and stops looking for new
/// headings once a data row has been read.
#[derive(Debug, Clone)]
pub enum ColumnResolver {
    Fixed(ColumnMap),
    Header { columns: ColumnMap, seen_data: bool },
    Scan,
}

impl ColumnResolver {
    pub fn new(strategy: &ColumnStrategy) -> Self {
        match strategy {
            ColumnStrategy::Fixed { columns } => ColumnResolver::Fixed(*columns),
            ColumnStrategy::Header => ColumnResolver::Header {
                columns: ColumnMap::default(),
                seen_data: false,
            },
            ColumnStrategy::Scan => ColumnResolver::Scan,
        }
    }

    pub fn resolve(&mut self, grid: &LogicalGrid, row: usize) -> Resolution {
        match self {
            ColumnResolver::Fixed(columns) => resolve_fixed(columns, grid, row),
            ColumnResolver::Header { columns, seen_data } => {
                if !*seen_data {
                    if let Some(discovered) = detect_header(grid, row) {
                        tracing::debug!(row, ?discovered, "header row detected");
                        *columns = discovered;
                        return Resolution::Header;
                    }
                }
                let resolution = resolve_fixed(columns, grid, row);
                if matches!(resolution, Resolution::Fields(_)) {
                    *seen_data = true;
                }
                resolution
            }
            ColumnResolver::Scan => resolve_scan(grid, row),
        }
    }
}

/// Whether a word of `text` starts with `keyword` ("Dates" and "Start time"
/// match, "Update" does not).
fn has_keyword(text: &str, keyword: &str) -> bool {
    text.to_uppercase()
        .split(|ch: char| !ch.is_alphanumeric())
        .any(|word| word.starts_with(keyword))
}

fn cell(grid: &LogicalGrid, row: usize, col: Option<usize>) -> Option<String> {
    let text = grid.get(row, col?)?.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

fn resolve_fixed(columns: &ColumnMap, grid: &LogicalGrid, row: usize) -> Resolution {
    let Some(date) = cell(grid, row, Some(columns.date)) else {
        return Resolution::NoDate;
    };
    if has_keyword(&date, "DATE") && !contains_date(&date) {
        return Resolution::Header;
    }

    Resolution::Fields(RawRowFields {
        date,
        time: cell(grid, row, columns.time),
        location: cell(grid, row, columns.location),
        note: cell(grid, row, columns.note),
        reference: cell(grid, row, columns.reference),
        row_text: grid.row_text(row),
    })
}

fn detect_header(grid: &LogicalGrid, row: usize) -> Option<ColumnMap> {
    let cells = grid.row_cells(row);
    if cells.iter().flatten().any(|text| contains_date(text)) {
        return None;
    }
    if !cells.iter().flatten().any(|text| has_keyword(text, "DATE")) {
        return None;
    }

    let defaults = ColumnMap::default();
    let mut date = None;
    let mut time = None;
    let mut location = None;
    let mut note = None;

    for (col, text) in cells.iter().enumerate() {
        let Some(text) = text else { continue };
        if has_keyword(text, "DATE") {
            date.get_or_insert(col);
        } else if has_keyword(text, "TIME") {
            time.get_or_insert(col);
        } else if has_keyword(text, "LOCATION") || has_keyword(text, "VENUE") {
            location.get_or_insert(col);
        } else if has_keyword(text, "NOTE") {
            note.get_or_insert(col);
        }
    }

    let date = date.unwrap_or(defaults.date);
    let time = time.or(defaults.time);
    let location = location.or(defaults.location);
    let note = note.or(defaults.note);
    let reference = defaults
        .reference
        .filter(|col| ![Some(date), time, location, note].contains(&Some(*col)));

    Some(ColumnMap {
        reference,
        date,
        time,
        location,
        note,
    })
}

fn resolve_scan(grid: &LogicalGrid, row: usize) -> Resolution {
    let cells = grid.row_cells(row);
    let row_text = grid.row_text(row);

    let date_col = cells
        .iter()
        .position(|text| text.is_some_and(contains_date));
    if let Some(col) = date_col {
        let date = cells[col].unwrap_or_default().to_owned();
        return Resolution::Fields(RawRowFields {
            date,
            time: cell(grid, row, Some(col + 1)),
            location: cell(grid, row, Some(col + 2)),
            note: cell(grid, row, Some(col + 3)),
            reference: None,
            row_text,
        });
    }

    let Some(date_range) = find_date(&row_text) else {
        return Resolution::NoDate;
    };

    let mut parts: Vec<&str> = Vec::new();
    for text in cells.into_iter().flatten() {
        if !text.is_empty() && parts.last() != Some(&text) {
            parts.push(text);
        }
    }
    // `parts` joined by single spaces is `row_text`; find the part where the
    // date ends. Neither it nor anything before it is a location or note.
    let mut date_part = 0;
    let mut offset = 0;
    for (idx, part) in parts.iter().enumerate() {
        let end = offset + part.len();
        if date_range.end <= end {
            date_part = idx;
            break;
        }
        offset = end + 1;
    }
    let tail = |from_end: usize| -> Option<String> {
        let idx = parts.len().checked_sub(from_end + 1)?;
        (idx > date_part).then(|| parts[idx].to_owned())
    };

    Resolution::Fields(RawRowFields {
        date: row_text[date_range].to_owned(),
        time: find_time_span(&row_text).map(str::to_owned),
        location: tail(1),
        note: tail(0),
        reference: None,
        row_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TableCell;

    fn grid(rows: &[&[&str]]) -> LogicalGrid {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|text| TableCell::new(text, 1, 1)).collect())
            .collect::<Vec<Vec<_>>>();
        LogicalGrid::build(&rows)
    }

    fn fields(resolution: Resolution) -> RawRowFields {
        match resolution {
            Resolution::Fields(fields) => fields,
            other => panic!("expected fields, got {other:?}"),
        }
    }

    #[test]
    fn fixed_reads_default_columns() {
        let grid = grid(&[&["W1", "Wed 28th Jan", "6pm - 8pm", "Hall", "Tutti"]]);
        let mut resolver = ColumnResolver::new(&ColumnStrategy::default());

        let fields = fields(resolver.resolve(&grid, 0));
        assert_eq!(fields.date, "Wed 28th Jan");
        assert_eq!(fields.time.as_deref(), Some("6pm - 8pm"));
        assert_eq!(fields.location.as_deref(), Some("Hall"));
        assert_eq!(fields.note.as_deref(), Some("Tutti"));
        assert_eq!(fields.reference.as_deref(), Some("W1"));
    }

    #[test]
    fn fixed_treats_date_heading_as_header_and_blank_as_no_date() {
        let grid = grid(&[&["", "Date", "Time"], &["", "", "6pm"]]);
        let mut resolver = ColumnResolver::new(&ColumnStrategy::default());

        assert_eq!(resolver.resolve(&grid, 0), Resolution::Header);
        assert_eq!(resolver.resolve(&grid, 1), Resolution::NoDate);
    }

    #[test]
    fn fixed_honours_custom_columns() {
        let grid = grid(&[&["Sat 4th Feb", "Tutti", "2pm"]]);
        let strategy = ColumnStrategy::Fixed {
            columns: ColumnMap {
                reference: None,
                date: 0,
                time: Some(2),
                location: None,
                note: Some(1),
            },
        };
        let fields = fields(ColumnResolver::new(&strategy).resolve(&grid, 0));
        assert_eq!(fields.date, "Sat 4th Feb");
        assert_eq!(fields.time.as_deref(), Some("2pm"));
        assert_eq!(fields.note.as_deref(), Some("Tutti"));
        assert_eq!(fields.location, None);
    }

    #[test]
    fn header_detection_remembers_columns() {
        let grid = grid(&[
            &["Notes", "Location", "Date", "Time"],
            &["Sectionals", "Room 4", "Mon 2nd Mar", "7pm"],
        ]);
        let mut resolver = ColumnResolver::new(&ColumnStrategy::Header);

        assert_eq!(resolver.resolve(&grid, 0), Resolution::Header);
        let fields = fields(resolver.resolve(&grid, 1));
        assert_eq!(fields.date, "Mon 2nd Mar");
        assert_eq!(fields.time.as_deref(), Some("7pm"));
        assert_eq!(fields.location.as_deref(), Some("Room 4"));
        assert_eq!(fields.note.as_deref(), Some("Sectionals"));
        assert_eq!(fields.reference, None);
    }

    #[test]
    fn header_detection_falls_back_to_defaults() {
        let grid = grid(&[
            &["#", "Date"],
            &["1", "Mon 2nd Mar", "7pm", "Hall", "Tutti"],
        ]);
        let mut resolver = ColumnResolver::new(&ColumnStrategy::Header);

        assert_eq!(resolver.resolve(&grid, 0), Resolution::Header);
        let fields = fields(resolver.resolve(&grid, 1));
        assert_eq!(fields.time.as_deref(), Some("7pm"));
        assert_eq!(fields.location.as_deref(), Some("Hall"));
        assert_eq!(fields.reference.as_deref(), Some("1"));
    }

    #[test]
    fn header_words_inside_data_rows_do_not_replace_columns() {
        let grid = grid(&[
            &["Notes", "Date", "Time", "Venue"],
            &["Update: bring music", "Mon 2nd Mar", "7pm", "Hall"],
            &["Tutti", "Mon 9th Mar", "7pm", "Hall"],
            &["Date to be confirmed", "", "", ""],
            &["Tutti", "Mon 16th Mar", "7pm", "Hall"],
        ]);
        let mut resolver = ColumnResolver::new(&ColumnStrategy::Header);

        assert_eq!(resolver.resolve(&grid, 0), Resolution::Header);
        let first = fields(resolver.resolve(&grid, 1));
        assert_eq!(first.date, "Mon 2nd Mar");
        assert_eq!(first.note.as_deref(), Some("Update: bring music"));
        assert_eq!(fields(resolver.resolve(&grid, 2)).date, "Mon 9th Mar");
        assert_eq!(resolver.resolve(&grid, 3), Resolution::NoDate);
        let last = fields(resolver.resolve(&grid, 4));
        assert_eq!(last.date, "Mon 16th Mar");
        assert_eq!(last.location.as_deref(), Some("Hall"));
    }

    #[test]
    fn fixed_keeps_update_notes_in_date_column_as_data() {
        let grid = grid(&[&["", "Updated 4th Feb", "7pm"]]);
        let mut resolver = ColumnResolver::new(&ColumnStrategy::default());
        assert_eq!(fields(resolver.resolve(&grid, 0)).date, "Updated 4th Feb");
    }

    #[test]
    fn scan_uses_offsets_from_matched_column() {
        let grid = grid(&[&["Week 3", "Wed 28th Jan", "6pm", "Hall", "Tutti"]]);
        let fields = fields(ColumnResolver::new(&ColumnStrategy::Scan).resolve(&grid, 0));
        assert_eq!(fields.date, "Wed 28th Jan");
        assert_eq!(fields.time.as_deref(), Some("6pm"));
        assert_eq!(fields.location.as_deref(), Some("Hall"));
        assert_eq!(fields.note.as_deref(), Some("Tutti"));
    }

    #[test]
    fn scan_without_date_is_no_date() {
        let grid = grid(&[&["Spring Term"], &["Week", "Day", "Time"]]);
        let mut resolver = ColumnResolver::new(&ColumnStrategy::Scan);
        assert_eq!(resolver.resolve(&grid, 0), Resolution::NoDate);
        assert_eq!(resolver.resolve(&grid, 1), Resolution::NoDate);
    }

    #[test]
    fn scan_falls_back_to_row_text_when_date_is_split_across_cells() {
        let grid = grid(&[&["Wed 28th", "Jan 6 - 8pm", "Hall", "Tutti"]]);
        let fields = fields(ColumnResolver::new(&ColumnStrategy::Scan).resolve(&grid, 0));
        assert_eq!(fields.date, "28th Jan");
        assert_eq!(fields.time.as_deref(), Some("6 - 8pm"));
        assert_eq!(fields.location.as_deref(), Some("Hall"));
        assert_eq!(fields.note.as_deref(), Some("Tutti"));
    }

    #[test]
    fn scan_fallback_skips_cells_up_to_the_split_date() {
        let grid = grid(&[&["3", "Wed 28th", "Jan 7pm", "Sectionals"]]);
        let fields = fields(ColumnResolver::new(&ColumnStrategy::Scan).resolve(&grid, 0));
        assert_eq!(fields.date, "28th Jan");
        assert_eq!(fields.location, None);
        assert_eq!(fields.note.as_deref(), Some("Sectionals"));
    }

    #[test]
    fn strategy_deserializes_from_yaml() -> anyhow::Result<()> {
        let strategy: ColumnStrategy = serde_yaml::from_str("kind: scan")?;
        assert_eq!(strategy, ColumnStrategy::Scan);

        let strategy: ColumnStrategy = serde_yaml::from_str("kind: fixed\ncolumns:\n  date: 0\n")?;
        let ColumnStrategy::Fixed { columns } = strategy else {
            anyhow::bail!("expected fixed strategy");
        };
        assert_eq!(columns.date, 0);
        assert_eq!(columns.time, Some(2));
        Ok(())
    }
}
