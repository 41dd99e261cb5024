//! Table module
//!
//! The column/sort/render contract shared by paged and infinite lists.
//! Rows are serialized once per render so columns can address fields by key.

mod column;
mod sort;

pub use column::{display_value, CellRenderer, Column};
use column::lookup;
pub use sort::SortState;

use crate::error::Result;
use crate::types::{JsonValue, SortDirection};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Header cell as displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub key: String,
    pub label: String,
    pub sortable: bool,
    /// Direction shown next to the label, if this column is sorted
    pub direction: Option<SortDirection>,
}

impl fmt::Display for HeaderCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Some(SortDirection::Asc) => write!(f, "{} ▲", self.label),
            Some(SortDirection::Desc) => write!(f, "{} ▼", self.label),
            None => f.write_str(&self.label),
        }
    }
}

/// Columns plus the current sort
pub struct Table<R> {
    columns: Vec<Column<R>>,
    sort: SortState,
}

impl<R: Serialize + 'static> Table<R> {
    /// Create an unsorted table
    pub fn new(columns: Vec<Column<R>>) -> Self {
        Self {
            columns,
            sort: SortState::None,
        }
    }

    /// Start from an existing sort
    #[must_use]
    pub fn with_sort(mut self, sort: SortState) -> Self {
        self.sort = sort;
        self
    }

    pub fn columns(&self) -> &[Column<R>] {
        &self.columns
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    /// Header cells with sort indicators
    pub fn header_cells(&self) -> Vec<HeaderCell> {
        self.columns
            .iter()
            .map(|column| HeaderCell {
                key: column.key.clone(),
                label: column.header.clone(),
                sortable: column.sortable,
                direction: self.sort.direction_for(&column.key),
            })
            .collect()
    }

    /// Handle a header click.
    ///
    /// Returns the new sort state, or `None` when the column is unknown or
    /// not sortable (state unchanged).
    pub fn click_header(&mut self, key: &str) -> Option<&SortState> {
        let sortable = self
            .columns
            .iter()
            .any(|column| column.key == key && column.sortable);
        if !sortable {
            debug!("Ignoring click on non-sortable column '{key}'");
            return None;
        }

        self.sort = self.sort.toggle(key);
        Some(&self.sort)
    }

    /// Render one row into cell strings, in column order
    pub fn render_row(&self, row: &R) -> Result<Vec<String>> {
        let value = serde_json::to_value(row)?;
        Ok(self
            .columns
            .iter()
            .map(|column| {
                let cell = lookup(&value, &column.key).unwrap_or(&JsonValue::Null);
                column.render_cell(cell, row)
            })
            .collect())
    }

    /// Render every row
    pub fn render_rows(&self, rows: &[R]) -> Result<Vec<Vec<String>>> {
        rows.iter().map(|row| self.render_row(row)).collect()
    }

    /// Render header and rows as aligned plain text
    pub fn render_text(&self, rows: &[R]) -> Result<String> {
        let header: Vec<String> = self.header_cells().iter().map(ToString::to_string).collect();
        let body = self.render_rows(rows)?;

        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
        for row in &body {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let format_line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut lines = vec![format_line(&header)];
        lines.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("  "),
        );
        lines.extend(body.iter().map(|row| format_line(row.as_slice())));
        Ok(lines.join("\n"))
    }
}

impl<R> fmt::Debug for Table<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("columns", &self.columns)
            .field("sort", &self.sort)
            .finish()
    }
}
