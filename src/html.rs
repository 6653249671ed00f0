use scraper::{ElementRef, Html, Node, Selector};

use crate::grid::{MAX_COL_SPAN, MAX_ROW_SPAN, TableCell};

/// Tags whose text may name the calendar.
const NAME_TAGS: &[&str] = &["p", "span", "h1", "h2"];

/// Text of one element, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFragment {
    pub tag: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTable {
    pub rows: Vec<Vec<TableCell>>,
}

/// The parts of an HTML page the schedule extractor consumes.
#[derive(Debug, Clone, Default)]
pub struct SourceDocument {
    pub fragments: Vec<TextFragment>,
    pub tables: Vec<SourceTable>,
}

impl SourceDocument {
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);

        let fragments = match Selector::parse("p, span, h1, h2, h3, td, th") {
            Ok(selector) => document
                .select(&selector)
                .filter_map(|element| {
                    let text = element_text(element);
                    (!text.is_empty()).then(|| TextFragment {
                        tag: element.value().name().to_owned(),
                        text,
                    })
                })
                .collect(),
            Err(err) => {
                tracing::warn!(?err, "invalid fragment selector");
                Vec::new()
            }
        };

        let tables = match Selector::parse("table") {
            Ok(selector) => document.select(&selector).map(read_table).collect(),
            Err(err) => {
                tracing::warn!(?err, "invalid table selector");
                Vec::new()
            }
        };

        Self { fragments, tables }
    }

    /// First non-empty paragraph/span/heading text.
    pub fn title(&self) -> Option<&str> {
        self.fragments
            .iter()
            .find(|fragment| NAME_TAGS.contains(&fragment.tag.as_str()))
            .map(|fragment| fragment.text.as_str())
    }

    pub fn fragment_texts(&self) -> Vec<&str> {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }
}

fn read_table(table: ElementRef<'_>) -> SourceTable {
    let Ok(row_selector) = Selector::parse("tr") else {
        return SourceTable::default();
    };

    let rows = table
        .select(&row_selector)
        .filter(|row| belongs_to(*row, table))
        .enumerate()
        .map(|(row_idx, row)| {
            row.children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                .enumerate()
                .map(|(col_idx, cell)| {
                    let mut table_cell = TableCell::new(
                        &element_text(cell),
                        span_attr(cell, "rowspan", MAX_ROW_SPAN),
                        span_attr(cell, "colspan", MAX_COL_SPAN),
                    );
                    table_cell.origin_row = row_idx;
                    table_cell.origin_col = col_idx;
                    table_cell.is_header = cell.value().name() == "th";
                    table_cell
                })
                .collect()
        })
        .collect();

    SourceTable { rows }
}

/// Whether `table` is the nearest enclosing table of `row`.
fn belongs_to(row: ElementRef<'_>, table: ElementRef<'_>) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "table")
        .is_some_and(|element| element.id() == table.id())
}

/// Span attribute value; missing, zero, or non-numeric values count as 1.
/// A leading number is honoured ("2px" is 2) and capped at `max`.
fn span_attr(cell: ElementRef<'_>, name: &str, max: usize) -> usize {
    let Some(value) = cell.value().attr(name) else {
        return 1;
    };
    let digits: String = value.trim().chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return 1;
    }
    // Too many digits for usize still means "as large as allowed".
    digits.parse::<usize>().unwrap_or(usize::MAX).clamp(1, max)
}

/// Concatenated text of an element; line breaks and block children become
/// spaces, then whitespace is collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if matches!(el.name(), "br" | "p" | "div" | "li") => out.push(' '),
            _ => {}
        }
    }
    crate::grid::normalize_cell_text(&out)
}
