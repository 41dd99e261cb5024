//! Backend-agnostic page sources
//!
//! Views consume `PageSource<T>` and never see which backend answers.

use crate::cursor::{CursorPageSource, PrefixMode};
use crate::error::{Error, Result};
use crate::query::{Query, QueryEncoder};
use crate::rest::RestPageSource;
use crate::types::{Page, PageCursor};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;

/// Core trait for anything that can serve one page of a list
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Fetch the page `query` describes, or the one after `cursor` when given
    async fn fetch_page(&self, query: &Query, cursor: Option<&PageCursor>) -> Result<Page<T>>;
}

// ============================================================================
// REST Resource
// ============================================================================

/// One REST list endpoint as a page source
pub struct RestResource<T> {
    source: Arc<RestPageSource>,
    path: String,
    _rows: PhantomData<fn() -> T>,
}

impl<T> RestResource<T> {
    /// Bind a REST source to a list path
    pub fn new(source: Arc<RestPageSource>, path: impl Into<String>) -> Self {
        Self {
            source,
            path: path.into(),
            _rows: PhantomData,
        }
    }

    /// List path
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl<T> PageSource<T> for RestResource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_page(&self, query: &Query, cursor: Option<&PageCursor>) -> Result<Page<T>> {
        match cursor {
            None => self.source.fetch(&self.path, query).await,
            Some(PageCursor::Page(page)) => {
                let query = query.clone().with_page(*page);
                self.source.fetch(&self.path, &query).await
            }
            Some(PageCursor::Value(value)) => Err(Error::query(format!(
                "offset-paginated '{}' cannot resume after value {value}",
                self.path
            ))),
        }
    }
}

impl<T> std::fmt::Debug for RestResource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestResource")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Collection Source
// ============================================================================

/// One document-store collection group as a page source.
///
/// `Query::page` is ignored; position comes only from the cursor.
pub struct CollectionSource<T> {
    source: Arc<CursorPageSource>,
    collection: String,
    search_field: Option<String>,
    prefix_mode: PrefixMode,
    _rows: PhantomData<fn() -> T>,
}

impl<T> CollectionSource<T> {
    /// Bind a cursor source to a collection id
    pub fn new(source: Arc<CursorPageSource>, collection: impl Into<String>) -> Self {
        Self {
            source,
            collection: collection.into(),
            search_field: None,
            prefix_mode: PrefixMode::default(),
            _rows: PhantomData,
        }
    }

    /// Field that `Query::search` runs a prefix search over
    #[must_use]
    pub fn with_search_field(mut self, field: impl Into<String>) -> Self {
        self.search_field = Some(field.into());
        self
    }

    /// Prefix search bounding mode
    #[must_use]
    pub fn with_prefix_mode(mut self, mode: PrefixMode) -> Self {
        self.prefix_mode = mode;
        self
    }

    /// Collection id
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl<T> PageSource<T> for CollectionSource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_page(&self, query: &Query, cursor: Option<&PageCursor>) -> Result<Page<T>> {
        let after = match cursor {
            None => None,
            Some(PageCursor::Value(value)) => Some(value.clone()),
            Some(PageCursor::Page(page)) => {
                return Err(Error::query(format!(
                    "cursor-paginated '{}' cannot jump to page {page}",
                    self.collection
                )));
            }
        };

        let mut cursor_query = QueryEncoder::encode_cursor(
            query,
            &self.collection,
            self.search_field.as_deref(),
            after,
        )?;
        cursor_query.search = cursor_query
            .search
            .take()
            .map(|search| search.with_mode(self.prefix_mode));

        self.source.fetch(&cursor_query).await
    }
}

impl<T> std::fmt::Debug for CollectionSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionSource")
            .field("collection", &self.collection)
            .field("search_field", &self.search_field)
            .field("prefix_mode", &self.prefix_mode)
            .finish_non_exhaustive()
    }
}
