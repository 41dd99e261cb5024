//! Prefix search emulation
//!
//! The document store has no text index, so "starts with" search over one
//! field is expressed as a lexicographic range on that field.

use crate::query::Filter;
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};

/// Upper-bound sentinel appended to a term to close a prefix range.
///
/// Private-use code point that sorts after every character likely to appear
/// in indexed text.
pub const PREFIX_SENTINEL: char = '\u{f8ff}';

/// How the search range is bounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefixMode {
    /// `term <= field <= term + sentinel`: true prefix matches
    #[default]
    Bounded,
    /// `field >= term`: every value sorting at or after the term
    LowerBoundOnly,
}

/// A normalized prefix search over a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixSearch {
    field: String,
    term: String,
    mode: PrefixMode,
}

impl PrefixSearch {
    /// Create a bounded prefix search. The term is trimmed and lower-cased.
    pub fn new(field: impl Into<String>, term: &str) -> Self {
        Self {
            field: field.into(),
            term: term.trim().to_lowercase(),
            mode: PrefixMode::Bounded,
        }
    }

    /// Set the bounding mode
    #[must_use]
    pub fn with_mode(mut self, mode: PrefixMode) -> Self {
        self.mode = mode;
        self
    }

    /// Field searched
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Normalized term
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Bounding mode
    pub fn mode(&self) -> PrefixMode {
        self.mode
    }

    /// Whether the normalized term is empty (no search)
    pub fn is_empty(&self) -> bool {
        self.term.is_empty()
    }

    /// Inclusive lower bound
    pub fn lower_bound(&self) -> JsonValue {
        JsonValue::String(self.term.clone())
    }

    /// Inclusive upper bound, when the mode has one
    pub fn upper_bound(&self) -> Option<JsonValue> {
        match self.mode {
            PrefixMode::Bounded => Some(JsonValue::String(format!(
                "{}{PREFIX_SENTINEL}",
                self.term
            ))),
            PrefixMode::LowerBoundOnly => None,
        }
    }

    /// The range filter this search stands for
    pub fn as_filter(&self) -> Filter {
        Filter::range(
            self.field.clone(),
            Some(self.lower_bound()),
            self.upper_bound(),
        )
    }

    /// Whether a stored value falls inside the range `as_filter` queries
    pub fn matches(&self, value: &str) -> bool {
        let upper = match self.mode {
            PrefixMode::Bounded => Some(format!("{}{PREFIX_SENTINEL}", self.term)),
            PrefixMode::LowerBoundOnly => None,
        };
        value >= self.term.as_str() && upper.map_or(true, |upper| value <= upper.as_str())
    }
}
