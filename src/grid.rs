use std::collections::HashMap;

/// Largest `rowspan` honoured, as in HTML.
pub const MAX_ROW_SPAN: usize = 65534;
/// Largest `colspan` honoured, as in HTML.
pub const MAX_COL_SPAN: usize = 1000;

/// One physical `td`/`th` as read from the source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    pub text: String,
    pub row_span: usize,
    pub col_span: usize,
    pub origin_row: usize,
    pub origin_col: usize,
    pub is_header: bool,
}

impl TableCell {
    pub fn new(text: &str, row_span: usize, col_span: usize) -> Self {
        Self {
            text: normalize_cell_text(text),
            row_span: row_span.clamp(1, MAX_ROW_SPAN),
            col_span: col_span.clamp(1, MAX_COL_SPAN),
            origin_row: 0,
            origin_col: 0,
            is_header: false,
        }
    }
}

/// Collapses whitespace runs (including non-breaking spaces) to single
/// spaces and trims the ends.
pub fn normalize_cell_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Dense (row, column) view of a table with row/column spans resolved.
#[derive(Debug, Clone, Default)]
pub struct LogicalGrid {
    cells: HashMap<(usize, usize), String>,
    rows: usize,
    width: usize,
    physical_counts: Vec<usize>,
    spanned_rows: Vec<bool>,
}

impl LogicalGrid {
    /// Places every physical cell using the skip-forward rule: within a row
    /// the next cell lands on the first column not already covered by a
    /// rowspan from an earlier row. Rowspans stop at the last row.
    pub fn build(rows: &[Vec<TableCell>]) -> Self {
        let mut grid = LogicalGrid {
            rows: rows.len(),
            physical_counts: rows.iter().map(Vec::len).collect(),
            spanned_rows: vec![false; rows.len()],
            ..Default::default()
        };

        for (row_idx, row) in rows.iter().enumerate() {
            let mut col_idx = 0_usize;
            for cell in row {
                while grid.cells.contains_key(&(row_idx, col_idx)) {
                    col_idx += 1;
                }

                let last_row = (row_idx + cell.row_span).min(rows.len());
                for r in row_idx..last_row {
                    for c in col_idx..col_idx + cell.col_span {
                        grid.cells.insert((r, c), cell.text.clone());
                    }
                }
                for spanned in &mut grid.spanned_rows[row_idx + 1..last_row] {
                    *spanned = true;
                }

                col_idx += cell.col_span;
                grid.width = grid.width.max(col_idx);
            }
        }

        grid
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.cells.get(&(row, col)).map(String::as_str)
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn row_cells(&self, row: usize) -> Vec<Option<&str>> {
        (0..self.width).map(|col| self.get(row, col)).collect()
    }

    /// Distinct non-empty texts of the row in column order. Neighbouring
    /// positions filled by the same colspan contribute once.
    pub fn row_text(&self, row: usize) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for text in self.row_cells(row).into_iter().flatten() {
            if text.is_empty() || parts.last() == Some(&text) {
                continue;
            }
            parts.push(text);
        }
        parts.join(" ")
    }

    pub fn physical_cell_count(&self, row: usize) -> usize {
        self.physical_counts.get(row).copied().unwrap_or(0)
    }

    /// Whether a rowspan from an earlier row reaches into `row`.
    pub fn spanned_into(&self, row: usize) -> bool {
        self.spanned_rows.get(row).copied().unwrap_or(false)
    }
}
