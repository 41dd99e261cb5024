//! Tri-state column sort

use crate::error::Result;
use crate::types::{SortDirection, SortSpec};
use serde::{Deserialize, Serialize};

/// Sort state of a table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "column")]
pub enum SortState {
    #[default]
    None,
    Ascending(String),
    Descending(String),
}

impl SortState {
    /// State after clicking the header of `column`.
    ///
    /// Another column (or none) becomes ascending on `column`; ascending
    /// flips to descending and descending back to ascending. Clicking never
    /// returns to `None`.
    pub fn toggle(&self, column: &str) -> Self {
        match self {
            SortState::Ascending(current) if current == column => {
                SortState::Descending(column.to_string())
            }
            _ => SortState::Ascending(column.to_string()),
        }
    }

    /// Sorted column, if any
    pub fn column(&self) -> Option<&str> {
        match self {
            SortState::None => None,
            SortState::Ascending(c) | SortState::Descending(c) => Some(c),
        }
    }

    /// Direction `column` is sorted in, if it is the sorted column
    pub fn direction_for(&self, column: &str) -> Option<SortDirection> {
        match self {
            SortState::Ascending(c) if c == column => Some(SortDirection::Asc),
            SortState::Descending(c) if c == column => Some(SortDirection::Desc),
            _ => None,
        }
    }

    /// Query sort string (`"field"` or `"-field"`)
    pub fn to_sort_string(&self) -> Option<String> {
        self.to_spec().map(|spec| spec.to_sort_string())
    }

    pub fn to_spec(&self) -> Option<SortSpec> {
        match self {
            SortState::None => None,
            SortState::Ascending(c) => Some(SortSpec::asc(c.as_str())),
            SortState::Descending(c) => Some(SortSpec::desc(c.as_str())),
        }
    }

    /// Decode a query sort string
    pub fn from_sort_string(sort: Option<&str>) -> Result<Self> {
        let spec = match sort {
            Some(sort) => SortSpec::parse(sort)?,
            None => None,
        };
        Ok(match spec {
            None => SortState::None,
            Some(SortSpec {
                field,
                direction: SortDirection::Asc,
            }) => SortState::Ascending(field),
            Some(SortSpec {
                field,
                direction: SortDirection::Desc,
            }) => SortState::Descending(field),
        })
    }

    /// Header indicator for `column`: `▲`, `▼`, or nothing
    pub fn indicator(&self, column: &str) -> &'static str {
        match self.direction_for(column) {
            Some(SortDirection::Asc) => "▲",
            Some(SortDirection::Desc) => "▼",
            None => "",
        }
    }
}
