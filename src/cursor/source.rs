//! Cursor page source for the document store
//!
//! One fetch issues one collection-group query:
//! 1. equality and range filters as native predicates
//! 2. a single `orderBy` on the sort field
//! 3. `startAfter(cursor)` when resuming
//! 4. `limit(pageSize)`
//!
//! `has_next` is inferred from a full page, so a result set that ends exactly
//! on a page boundary costs one extra, empty fetch. Identical concurrent
//! fetches (same collection, filters, sort, search, and cursor) share one
//! store query.
//!
//! The cursor is the sort value alone. When several rows share the value of
//! the last row on a page, the ones that did not fit are skipped by the next
//! page's `startAfter`. Sort on a field that is unique per row (a timestamp,
//! a name with a suffix) for lossless paging. Rows written between page
//! fetches may likewise appear twice or not at all.

use super::search::PrefixSearch;
use crate::cache::{CacheConfig, RequestCache};
use crate::document::value::{compare_values, same_type};
use crate::document::{Document, DocumentStore, FieldOp, StructuredQuery};
use crate::error::{Error, Result};
use crate::query::{CursorQuery, Filter};
use crate::types::{JsonValue, Page, PageCursor, SortDirection, SortSpec};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

// ============================================================================
// Configuration
// ============================================================================

/// What to do when a range filter and the sort target different fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Fail with a query construction error
    #[default]
    Reject,
    /// Keep the sort native and apply conflicting ranges to each fetched page
    ClientSide,
}

/// Recovers a parent-partition id from each document's path.
///
/// For `sellers/{sellerId}/products/{productId}` the parent id is segment
/// `-3` and is written into the row under `field` (e.g. `sellerId`).
/// Rows that already carry the field keep their stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionMapping {
    /// Row field receiving the parent id
    pub field: String,
    /// Path segment holding the parent id, counted from the end when negative
    #[serde(default = "default_segment")]
    pub segment: isize,
}

fn default_segment() -> isize {
    -3
}

impl PartitionMapping {
    /// Map the parent document id (segment `-3`) into `field`
    pub fn parent(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            segment: default_segment(),
        }
    }
}

// ============================================================================
// Plan
// ============================================================================

/// A cursor query translated for the store
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Query sent to the store
    pub query: StructuredQuery,
    /// Effective sort (requested, or derived from search/range)
    pub sort: SortSpec,
    /// Range filters evaluated after fetching
    pub post_filters: Vec<Filter>,
    /// Requested page size
    pub limit: u32,
}

// ============================================================================
// Source
// ============================================================================

/// Cursor-paginated page source over a document store
pub struct CursorPageSource {
    store: Arc<dyn DocumentStore>,
    conflict_policy: ConflictPolicy,
    partition: Option<PartitionMapping>,
    id_field: Option<String>,
    default_sort: Option<SortSpec>,
    cache: RequestCache<Vec<Document>>,
}

impl CursorPageSource {
    /// Create a source over an injected store handle
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            conflict_policy: ConflictPolicy::default(),
            partition: None,
            id_field: None,
            default_sort: None,
            cache: RequestCache::default(),
        }
    }

    /// Replace the request cache policy (dedup only by default)
    #[must_use]
    pub fn with_cache_config(mut self, config: CacheConfig) -> Self {
        self.cache = RequestCache::new(config);
        self
    }

    /// Number of store queries started by `fetch_documents`, after deduplication
    pub fn fetch_count(&self) -> usize {
        self.cache.fetch_count()
    }

    /// Set the range/sort conflict policy
    #[must_use]
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    /// Attach parent-partition ids to rows
    #[must_use]
    pub fn with_partition(mut self, mapping: PartitionMapping) -> Self {
        self.partition = Some(mapping);
        self
    }

    /// Write each document id into rows under this field
    #[must_use]
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = Some(field.into());
        self
    }

    /// Sort used when the query names none and no range implies one
    #[must_use]
    pub fn with_default_sort(mut self, sort: SortSpec) -> Self {
        self.default_sort = Some(sort);
        self
    }

    /// Translate a cursor query into a store query plus post-filters
    pub fn plan(&self, query: &CursorQuery) -> Result<QueryPlan> {
        if query.limit == 0 {
            return Err(Error::query("limit must be > 0"));
        }

        let search = query.search.as_ref().filter(|s| !s.is_empty());

        let mut equalities = Vec::new();
        let mut ranges = Vec::new();
        for filter in &query.filters {
            match filter {
                Filter::Equality { .. } => equalities.push(filter.clone()),
                Filter::Range { .. } => ranges.push(filter.clone()),
                Filter::Raw { json } => {
                    return Err(Error::query(format!(
                        "raw filter {json} must be decoded before reaching the document store"
                    )));
                }
            }
        }
        if let Some(search) = search {
            ranges.insert(0, search.as_filter());
        }

        let sort = query
            .sort
            .clone()
            .or_else(|| search.map(|s| SortSpec::asc(s.field())))
            .or_else(|| {
                ranges
                    .first()
                    .and_then(Filter::field)
                    .map(SortSpec::asc)
            })
            .or_else(|| self.default_sort.clone())
            .ok_or_else(|| Error::query("cursor pagination needs a sort field"))?;

        let (native, post_filters): (Vec<Filter>, Vec<Filter>) = ranges
            .into_iter()
            .partition(|f| f.field() == Some(sort.field.as_str()));

        if !post_filters.is_empty() {
            let fields: Vec<&str> = post_filters.iter().filter_map(Filter::field).collect();
            match self.conflict_policy {
                ConflictPolicy::Reject => {
                    return Err(Error::query(format!(
                        "sort on '{}' conflicts with range filters on {fields:?}",
                        sort.field
                    )));
                }
                ConflictPolicy::ClientSide => {
                    debug!(
                        "Applying range filters on {:?} client-side; sort stays on '{}'",
                        fields, sort.field
                    );
                }
            }
        }

        let mut structured = StructuredQuery::collection_group(&query.collection);
        for filter in equalities.iter().chain(&native) {
            structured = apply_native(structured, filter);
        }
        structured = structured.order_by(&sort.field, sort.direction);
        if let Some(cursor) = &query.cursor {
            structured = structured.start_after(vec![cursor.clone()]);
        }
        structured = structured.limit(query.limit);

        Ok(QueryPlan {
            query: structured,
            sort,
            post_filters,
            limit: query.limit,
        })
    }

    /// Fetch one page of raw documents
    pub async fn fetch_documents(&self, query: &CursorQuery) -> Result<Page<Document>> {
        let plan = self.plan(query)?;
        let store = self.store.clone();
        let structured = plan.query.clone();
        let docs = self
            .cache
            .get_or_fetch(query.cache_key(), move || {
                let store = store.clone();
                let structured = structured.clone();
                async move { store.run_query(&structured).await }
            })
            .await?;

        // Inferred, not authoritative: a full page might be the last one
        let has_next = docs.len() == plan.limit as usize;
        let cursor = if has_next {
            docs.last()
                .and_then(|d| d.get(&plan.sort.field))
                .cloned()
                .map(PageCursor::Value)
        } else {
            None
        };

        let fetched = docs.len();
        let rows: Vec<Document> = docs
            .into_iter()
            .filter(|doc| plan.post_filters.iter().all(|f| filter_matches(f, doc)))
            .collect();

        if rows.len() < fetched {
            debug!(
                "Client-side filters kept {} of {} documents from '{}'",
                rows.len(),
                fetched,
                query.collection
            );
        }

        Ok(Page::new(rows, cursor, has_next))
    }

    /// Fetch one page and map each document into `T`
    pub async fn fetch<T: DeserializeOwned>(&self, query: &CursorQuery) -> Result<Page<T>> {
        self.fetch_with(query, |doc| {
            serde_json::from_value(doc).map_err(Error::from)
        })
        .await
    }

    /// Fetch one page and map each document through `map`.
    ///
    /// `map` receives the document fields with the id and partition fields
    /// already attached.
    pub async fn fetch_with<T, F>(&self, query: &CursorQuery, map: F) -> Result<Page<T>>
    where
        F: Fn(JsonValue) -> Result<T>,
    {
        let page = self.fetch_documents(query).await?;
        let rows = page
            .rows
            .into_iter()
            .map(|doc| map(self.row_value(doc)))
            .collect::<Result<Vec<T>>>()?;

        Ok(Page {
            rows,
            cursor: page.cursor,
            has_next: page.has_next,
            total: None,
            total_pages: None,
        })
    }

    /// Count every match of the query by re-running it without a limit.
    ///
    /// O(n) in the number of matches. Advisory only: the data can change
    /// between this count and any page fetch.
    pub async fn count_matches(&self, query: &CursorQuery) -> Result<usize> {
        let plan = self.plan(query)?;
        let mut unbounded = plan.query.without_limit();
        unbounded.start_after = None;

        let docs = self.store.run_query(&unbounded).await?;
        let count = docs
            .iter()
            .filter(|doc| plan.post_filters.iter().all(|f| filter_matches(f, doc)))
            .count();

        if count > 1000 {
            warn!(
                "Counted {} matches in '{}' by full scan",
                count, query.collection
            );
        }
        Ok(count)
    }

    /// Document fields with id and parent-partition fields attached
    fn row_value(&self, doc: Document) -> JsonValue {
        let Document { path, mut fields } = doc;

        if let Some(mapping) = &self.partition {
            match path.segment(mapping.segment) {
                Some(parent) => {
                    fields
                        .entry(mapping.field.clone())
                        .or_insert_with(|| JsonValue::String(parent.to_string()));
                }
                None => warn!("Document '{path}' has no partition segment {}", mapping.segment),
            }
        }

        if let Some(id_field) = &self.id_field {
            fields
                .entry(id_field.clone())
                .or_insert_with(|| JsonValue::String(path.id().to_string()));
        }

        JsonValue::Object(fields)
    }
}

impl std::fmt::Debug for CursorPageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorPageSource")
            .field("conflict_policy", &self.conflict_policy)
            .field("partition", &self.partition)
            .field("id_field", &self.id_field)
            .field("default_sort", &self.default_sort)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Add a filter to the store query as native predicates
fn apply_native(query: StructuredQuery, filter: &Filter) -> StructuredQuery {
    match filter {
        Filter::Equality { field, value } => {
            query.where_field(field, FieldOp::Equal, value.clone())
        }
        Filter::Range { field, min, max } => {
            let mut query = query;
            if let Some(min) = min {
                query = query.where_field(field, FieldOp::GreaterThanOrEqual, min.clone());
            }
            if let Some(max) = max {
                query = query.where_field(field, FieldOp::LessThanOrEqual, max.clone());
            }
            query
        }
        Filter::Raw { .. } => query,
    }
}

/// Evaluate a range or equality filter against a fetched document
fn filter_matches(filter: &Filter, doc: &Document) -> bool {
    match filter {
        Filter::Equality { field, value } => doc
            .get(field)
            .is_some_and(|v| compare_values(v, value) == Ordering::Equal),
        Filter::Range { field, min, max } => {
            let Some(value) = doc.get(field) else {
                return false;
            };
            let above = min.as_ref().map_or(true, |m| {
                same_type(value, m) && compare_values(value, m) != Ordering::Less
            });
            let below = max.as_ref().map_or(true, |m| {
                same_type(value, m) && compare_values(value, m) != Ordering::Greater
            });
            above && below
        }
        Filter::Raw { .. } => true,
    }
}

/// Prefix search as a cursor query over `collection`, sorted by the search field
pub fn prefix_query(collection: &str, search: PrefixSearch, limit: u32) -> CursorQuery {
    let sort = SortSpec::new(search.field(), SortDirection::Asc);
    CursorQuery::new(collection, limit).sort(sort).search(search)
}
