//! Drives one parsed page through grid building, column resolution,
//! normalization and event synthesis.

use chrono::NaiveDate;

use crate::config::ScheduleConfig;
use crate::event::{EventRecord, RowOutcome, SkipReason, SynthesisContext, synthesize};
use crate::grid::LogicalGrid;
use crate::html::SourceDocument;
use crate::normalize::resolve_year;
use crate::roles::{ColumnResolver, Resolution};

pub const DEFAULT_CALENDAR_NAME: &str = "Schedule";

/// How one table row was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowResult {
    pub table: usize,
    pub row: usize,
    pub outcome: RowOutcome,
}

#[derive(Debug, Clone)]
pub struct ScheduleExtraction {
    pub calendar_name: String,
    pub year: i32,
    pub rows: Vec<RowResult>,
}

impl ScheduleExtraction {
    pub fn events(&self) -> impl Iterator<Item = &EventRecord> {
        self.rows.iter().filter_map(|row| row.outcome.as_ref().ok())
    }

    pub fn skipped(&self) -> usize {
        self.rows.iter().filter(|row| row.outcome.is_err()).count()
    }
}

pub fn calendar_name(doc: &SourceDocument, config: &ScheduleConfig) -> String {
    config
        .calendar_name
        .clone()
        .or_else(|| doc.title().map(str::to_owned))
        .unwrap_or_else(|| DEFAULT_CALENDAR_NAME.to_owned())
}

pub fn extract(doc: &SourceDocument, config: &ScheduleConfig, today: NaiveDate) -> ScheduleExtraction {
    let calendar_name = calendar_name(doc, config);
    let year = resolve_year(config.year, &doc.fragment_texts(), today);
    let ctx = SynthesisContext {
        calendar_name: calendar_name.clone(),
        year,
        default_duration: config.default_duration(),
        cancel: config.cancel_policy(),
    };
    tracing::debug!(calendar = %calendar_name, year, tables = doc.tables.len(), "extracting schedule");

    let mut rows = Vec::new();
    for (table_idx, table) in doc.tables.iter().enumerate() {
        let grid = LogicalGrid::build(&table.rows);
        let mut resolver = ColumnResolver::new(&config.strategy);
        let mut section: Option<String> = None;

        for row in 0..grid.row_count() {
            let outcome = if let Some(heading) = section_heading(&grid, row) {
                section = Some(heading.to_owned());
                Err(SkipReason::SectionHeading(heading.to_owned()))
            } else {
                match resolver.resolve(&grid, row) {
                    Resolution::Fields(fields) => synthesize(&ctx, &fields, section.as_deref()),
                    Resolution::Header => Err(SkipReason::HeaderRow),
                    Resolution::NoDate => Err(SkipReason::NoDate),
                }
            };

            match &outcome {
                Ok(event) => tracing::debug!(table = table_idx, row, uid = %event.uid, "row -> event"),
                Err(reason) => tracing::debug!(table = table_idx, row, %reason, "row skipped"),
            }
            rows.push(RowResult {
                table: table_idx,
                row,
                outcome,
            });
        }
    }

    ScheduleExtraction {
        calendar_name,
        year,
        rows,
    }
}

/// A row made of one non-empty physical cell in a multi-column table, with
/// nothing spanning into it from above, names the section that follows.
fn section_heading(grid: &LogicalGrid, row: usize) -> Option<&str> {
    if grid.width() < 2 || grid.physical_cell_count(row) != 1 || grid.spanned_into(row) {
        return None;
    }
    let text = grid.row_cells(row).into_iter().flatten().next()?;
    (!text.is_empty()).then_some(text)
}
