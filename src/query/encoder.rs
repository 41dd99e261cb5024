//! Query encoding
//!
//! Turns a logical `Query` into backend parameters:
//! - REST: flat `page`/`limit`/`sort`/`order`/`whereJson` query parameters
//! - Document store: a `CursorQuery` with native predicates

use super::types::{CursorQuery, Filter, Filters, Query};
use crate::cursor::PrefixSearch;
use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue, SortSpec};
use url::form_urlencoded;

/// Name of the parameter carrying nested filter trees
pub const WHERE_JSON_PARAM: &str = "whereJson";

// ============================================================================
// Request Params
// ============================================================================

/// Ordered, unencoded query parameters for a REST request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams(Vec<(String, String)>);

impl RequestParams {
    /// Create empty params
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// First value for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no parameters
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Percent-encoded query string (without the leading `?`)
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.0 {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}

// ============================================================================
// Encoder
// ============================================================================

/// Stateless encoder from logical queries to backend parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryEncoder;

impl QueryEncoder {
    /// Split a sort string into `(sort, order)` parameters
    pub fn encode_sort(sort: Option<&str>) -> Result<Option<(String, &'static str)>> {
        let spec = match sort {
            Some(s) => SortSpec::parse(s)?,
            None => None,
        };
        Ok(spec.map(|spec| (spec.field, spec.direction.as_str())))
    }

    /// Encode filters into plain parameters plus an optional `whereJson` tree.
    ///
    /// Primitive equality filters stay plain. Everything else is merged into
    /// one JSON object so nested trees survive a flat query string.
    pub fn encode_filters(filters: &Filters) -> Result<(Vec<(String, String)>, Option<String>)> {
        let mut plain = Vec::new();
        let mut tree = JsonObject::new();

        for filter in filters {
            match filter {
                Filter::Equality { field, value } => match scalar_to_param(value) {
                    Some(text) => plain.push((field.clone(), text)),
                    None => {
                        tree.insert(field.clone(), value.clone());
                    }
                },
                Filter::Range { field, min, max } => {
                    let mut bounds = JsonObject::new();
                    if let Some(min) = min {
                        bounds.insert("gte".to_string(), min.clone());
                    }
                    if let Some(max) = max {
                        bounds.insert("lte".to_string(), max.clone());
                    }
                    if !bounds.is_empty() {
                        merge_into(&mut tree, field, JsonValue::Object(bounds));
                    }
                }
                Filter::Raw { json } => match json {
                    JsonValue::Object(obj) => {
                        for (key, value) in obj {
                            merge_into(&mut tree, key, value.clone());
                        }
                    }
                    other => {
                        return Err(Error::query(format!(
                            "raw filter must be a JSON object, got {other}"
                        )));
                    }
                },
            }
        }

        let where_json = if tree.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&JsonValue::Object(tree))?)
        };

        Ok((plain, where_json))
    }

    /// Encode a query for the offset-paginated REST backend
    pub fn encode_rest(query: &Query) -> Result<RequestParams> {
        query.validate()?;

        let mut params = RequestParams::new();
        params.push("page", query.page.to_string());
        params.push("limit", query.limit.to_string());

        if let Some((sort, order)) = Self::encode_sort(query.sort.as_deref())? {
            params.push("sort", sort);
            params.push("order", order);
        }

        let (plain, where_json) = Self::encode_filters(&query.filters)?;
        if let Some(where_json) = where_json {
            params.push(WHERE_JSON_PARAM, where_json);
        }
        for (key, value) in plain {
            params.push(key, value);
        }

        if let Some(term) = query.search_term() {
            params.push("search", term);
        }

        for (key, value) in &query.extra {
            let text = match value {
                JsonValue::String(s) => s.clone(),
                JsonValue::Null => String::new(),
                other => other.to_string(),
            };
            params.push(key.clone(), text);
        }

        Ok(params)
    }

    /// Encode a query for the cursor-paginated document store.
    ///
    /// Raw filters must decompose into `{field: scalar}` equalities, and
    /// pass-through keys with scalar values become equality predicates.
    /// `search_field` names the field prefix search runs over.
    pub fn encode_cursor(
        query: &Query,
        collection: &str,
        search_field: Option<&str>,
        cursor: Option<JsonValue>,
    ) -> Result<CursorQuery> {
        query.validate()?;

        let mut out = CursorQuery::new(collection, query.limit).after(cursor);
        out.sort = query.sort_spec()?;

        for filter in &query.filters {
            match filter {
                Filter::Raw { json } => out.filters.extend(decompose_raw(json)?),
                other => out.filters.push(other.clone()),
            }
        }

        for (key, value) in &query.extra {
            if value.is_null() {
                continue;
            }
            if value.is_object() || value.is_array() {
                return Err(Error::query(format!(
                    "parameter '{key}' has no document-store predicate form"
                )));
            }
            out.filters.push(Filter::eq(key.clone(), value.clone()));
        }

        if let Some(term) = query.search_term() {
            let field = search_field.ok_or_else(|| {
                Error::query(format!("collection '{collection}' has no search field"))
            })?;
            out.search = Some(PrefixSearch::new(field, term));
        }

        Ok(out)
    }
}

/// Text form of a scalar filter value, `None` for structured values
fn scalar_to_param(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Merge a value into the where tree, combining object bounds on the same key
fn merge_into(tree: &mut JsonObject, key: &str, value: JsonValue) {
    match (tree.get_mut(key), value) {
        (Some(JsonValue::Object(existing)), JsonValue::Object(incoming)) => {
            existing.extend(incoming);
        }
        (_, value) => {
            tree.insert(key.to_string(), value);
        }
    }
}

/// Split a raw `{field: value, ...}` object into equality filters
fn decompose_raw(json: &JsonValue) -> Result<Vec<Filter>> {
    let obj = json
        .as_object()
        .ok_or_else(|| Error::query(format!("raw filter must be a JSON object, got {json}")))?;

    obj.iter()
        .map(|(field, value)| {
            if value.is_object() || value.is_array() {
                Err(Error::query(format!(
                    "nested filter on '{field}' cannot run on the document store: {value}"
                )))
            } else {
                Ok(Filter::eq(field.clone(), value.clone()))
            }
        })
        .collect()
}
