//! Logical query types
//!
//! A `Query` is what list UIs hold in state. It is rebuilt, never mutated in
//! place, whenever filters, sort, or page size change.

use crate::cursor::PrefixSearch;
use crate::error::{Error, Result};
use crate::types::{JsonValue, SortSpec, ValueMap};
use serde::{Deserialize, Deserializer, Serialize};

/// Default page size when none is configured
pub const DEFAULT_LIMIT: u32 = 10;

// ============================================================================
// Filters
// ============================================================================

/// A single filter predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// `field == value`
    Equality { field: String, value: JsonValue },
    /// `min <= field <= max`, either bound optional
    Range {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<JsonValue>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<JsonValue>,
    },
    /// Opaque filter tree, only ever inspected at a backend boundary
    Raw { json: JsonValue },
}

impl Filter {
    /// Create an equality filter
    pub fn eq(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::Equality {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a range filter
    pub fn range(
        field: impl Into<String>,
        min: Option<JsonValue>,
        max: Option<JsonValue>,
    ) -> Self {
        Self::Range {
            field: field.into(),
            min,
            max,
        }
    }

    /// Create a raw filter
    pub fn raw(json: JsonValue) -> Self {
        Self::Raw { json }
    }

    /// Field this filter targets, if it targets exactly one
    pub fn field(&self) -> Option<&str> {
        match self {
            Filter::Equality { field, .. } | Filter::Range { field, .. } => Some(field),
            Filter::Raw { .. } => None,
        }
    }

    /// Whether this is an inequality predicate
    pub fn is_range(&self) -> bool {
        matches!(self, Filter::Range { .. })
    }
}

/// Ordered set of filters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Filters(Vec<Filter>);

impl Filters {
    /// Create an empty filter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an untyped filter map as list UIs produce it.
    ///
    /// Primitive values become equality filters. Objects and arrays stay
    /// opaque as `Raw({key: value})` until a backend encodes them.
    pub fn from_map(map: ValueMap) -> Self {
        let filters = map
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| match value {
                JsonValue::Object(_) | JsonValue::Array(_) => {
                    let mut obj = serde_json::Map::new();
                    obj.insert(key, value);
                    Filter::raw(JsonValue::Object(obj))
                }
                primitive => Filter::eq(key, primitive),
            })
            .collect();
        Self(filters)
    }

    /// Add an equality filter
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.0.push(Filter::eq(field, value));
        self
    }

    /// Add a range filter
    #[must_use]
    pub fn range(
        mut self,
        field: impl Into<String>,
        min: Option<JsonValue>,
        max: Option<JsonValue>,
    ) -> Self {
        self.0.push(Filter::range(field, min, max));
        self
    }

    /// Add a raw filter
    #[must_use]
    pub fn raw(mut self, json: JsonValue) -> Self {
        self.0.push(Filter::raw(json));
        self
    }

    /// Append a filter
    pub fn push(&mut self, filter: Filter) {
        self.0.push(filter);
    }

    /// Iterate over filters
    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.0.iter()
    }

    /// Number of filters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no filters are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the inner list
    pub fn into_vec(self) -> Vec<Filter> {
        self.0
    }
}

impl From<Vec<Filter>> for Filters {
    fn from(filters: Vec<Filter>) -> Self {
        Self(filters)
    }
}

impl FromIterator<Filter> for Filters {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Filters {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for Filters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Configs may carry either the typed list or the untyped map form.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Typed(Vec<Filter>),
            Map(ValueMap),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Typed(filters) => Self(filters),
            Repr::Map(map) => Self::from_map(map),
        })
    }
}

// ============================================================================
// Query
// ============================================================================

/// Logical list query shared by both backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: u32,
    /// Page size
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Sort string, leading `-` for descending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// Filter predicates
    #[serde(default, skip_serializing_if = "Filters::is_empty")]
    pub filters: Filters,
    /// Free-text search term
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Unrecognized keys, forwarded verbatim
    #[serde(flatten)]
    pub extra: ValueMap,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl Default for Query {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

impl Query {
    /// Create a first-page query with the given page size
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            sort: None,
            filters: Filters::new(),
            search: None,
            extra: ValueMap::new(),
        }
    }

    /// Set the page number
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Set the sort string
    #[must_use]
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Set the filters
    #[must_use]
    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    /// Set the search term
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Add a pass-through parameter
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Decoded sort key
    pub fn sort_spec(&self) -> Result<Option<SortSpec>> {
        match &self.sort {
            Some(sort) => SortSpec::parse(sort),
            None => Ok(None),
        }
    }

    /// Trimmed, non-empty search term
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Check structural invariants
    pub fn validate(&self) -> Result<()> {
        if self.page < 1 {
            return Err(Error::query("page must be >= 1"));
        }
        if self.limit == 0 {
            return Err(Error::query("limit must be > 0"));
        }
        self.sort_spec()?;
        Ok(())
    }

    /// Canonical identity of this query, ignoring the page number.
    ///
    /// Two queries with equal identity describe the same result set.
    pub fn identity(&self) -> String {
        let mut value = serde_json::to_value(self).unwrap_or(JsonValue::Null);
        if let JsonValue::Object(map) = &mut value {
            map.remove("page");
        }
        value.to_string()
    }
}

// ============================================================================
// Cursor Query
// ============================================================================

/// A query against the document store, already split for the cursor adapter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CursorQuery {
    /// Collection id, queried as a collection group
    pub collection: String,
    /// Native predicates
    pub filters: Vec<Filter>,
    /// Single sort key
    pub sort: Option<SortSpec>,
    /// Page size
    pub limit: u32,
    /// Sort-field value of the last row of the previous page
    pub cursor: Option<JsonValue>,
    /// Prefix search over one field
    pub search: Option<PrefixSearch>,
}

impl CursorQuery {
    /// Create a cursor query over a collection
    pub fn new(collection: impl Into<String>, limit: u32) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            sort: None,
            limit,
            cursor: None,
            search: None,
        }
    }

    /// Add a filter
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set the sort
    #[must_use]
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Resume after a cursor value
    #[must_use]
    pub fn after(mut self, cursor: Option<JsonValue>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Set the prefix search
    #[must_use]
    pub fn search(mut self, search: PrefixSearch) -> Self {
        self.search = Some(search);
        self
    }

    /// Single-flight key: collection, filters, sort, search, and cursor
    pub fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
