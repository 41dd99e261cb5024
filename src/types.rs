//! Common types used throughout pagewise
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Ordered key-value map with string keys and JSON values
pub type ValueMap = BTreeMap<String, JsonValue>;

// ============================================================================
// Sorting
// ============================================================================

/// Direction of a single-field sort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Wire representation (`asc` / `desc`)
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// The opposite direction
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded sort key.
///
/// Internally sorts travel as a single string where a leading `-` means
/// descending (`"-createdAt"`). Backends always receive the split form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field to sort on
    pub field: String,
    /// Sort direction
    pub direction: SortDirection,
}

impl SortSpec {
    /// Create a sort spec
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Ascending sort on a field
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    /// Descending sort on a field
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    /// Decode a sort string. Empty input means "no sort".
    pub fn parse(sort: &str) -> Result<Option<Self>> {
        let sort = sort.trim();
        if sort.is_empty() {
            return Ok(None);
        }

        let (field, direction) = match sort.strip_prefix('-') {
            Some(rest) => (rest, SortDirection::Desc),
            None => (sort, SortDirection::Asc),
        };

        if field.is_empty() || field.starts_with('-') {
            return Err(Error::query(format!("invalid sort key '{sort}'")));
        }

        Ok(Some(Self::new(field, direction)))
    }

    /// Encode back into the single-string form
    pub fn to_sort_string(&self) -> String {
        match self.direction {
            SortDirection::Asc => self.field.clone(),
            SortDirection::Desc => format!("-{}", self.field),
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction)
    }
}

// ============================================================================
// Pages
// ============================================================================

/// Position to resume fetching from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageCursor {
    /// Next page number of an offset-paginated source
    Page(u32),
    /// Sort-field value of the last row of a cursor-paginated source
    Value(JsonValue),
}

/// One fetched page of rows
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Rows in server order
    pub rows: Vec<T>,
    /// Where the next page starts, `None` when the source is exhausted
    pub cursor: Option<PageCursor>,
    /// Whether another page may exist
    pub has_next: bool,
    /// Total matching rows, when the backend reports it
    pub total: Option<u64>,
    /// Total pages, when the backend reports it
    pub total_pages: Option<u32>,
}

impl<T> Page<T> {
    /// Create a page without totals
    pub fn new(rows: Vec<T>, cursor: Option<PageCursor>, has_next: bool) -> Self {
        Self {
            rows,
            cursor,
            has_next,
            total: None,
            total_pages: None,
        }
    }

    /// A terminal empty page
    pub fn empty() -> Self {
        Self::new(Vec::new(), None, false)
    }

    /// Attach backend-reported totals
    #[must_use]
    pub fn with_totals(mut self, total: u64, total_pages: u32) -> Self {
        self.total = Some(total);
        self.total_pages = Some(total_pages);
        self
    }

    /// Number of rows on this page
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the page has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for caller-side retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.trim().is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.trim().is_empty() {
            None
        } else {
            Some(self)
        }
    }
}
