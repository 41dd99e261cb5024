//! Offset-style pagination state machine
//!
//! Owns page, page size, sort, filters, and search for one REST-backed list.
//! Every change produces a fresh `Query`; any change other than the page
//! itself starts over at page 1.

use super::window::PageWindow;
use crate::error::{Error, Result};
use crate::query::{Filters, Query};
use crate::types::{OptionStringExt, Page, SortSpec};
use tracing::{debug, warn};

/// Page sizes offered when a list configures none
pub const DEFAULT_PAGE_SIZE_OPTIONS: [u32; 3] = [10, 20, 50];

/// Page/size/sort/filter state for an offset-paginated list
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationController {
    query: Query,
    total: Option<u64>,
    total_pages: Option<u32>,
    page_size_options: Vec<u32>,
}

impl PaginationController {
    /// Start from `initial`, keeping its page
    pub fn new(initial: Query) -> Self {
        Self {
            query: initial,
            total: None,
            total_pages: None,
            page_size_options: DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
        }
    }

    /// Page sizes offered to the user
    #[must_use]
    pub fn with_page_size_options(mut self, options: Vec<u32>) -> Self {
        self.page_size_options = options;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Query describing the current page
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn page(&self) -> u32 {
        self.query.page
    }

    pub fn page_size(&self) -> u32 {
        self.query.limit
    }

    pub fn sort(&self) -> Option<&str> {
        self.query.sort.as_deref()
    }

    pub fn filters(&self) -> &Filters {
        &self.query.filters
    }

    pub fn search(&self) -> Option<&str> {
        self.query.search.as_deref()
    }

    pub fn page_size_options(&self) -> &[u32] {
        &self.page_size_options
    }

    /// Total pages from the last applied page, if known
    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    /// Total rows from the last applied page, if known
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    // ========================================================================
    // Resetting Changes
    // ========================================================================

    /// Replace the filters and return to page 1
    pub fn set_filters(&mut self, filters: Filters) {
        self.rebuild("filters", |q| q.filters = filters);
    }

    /// Replace the sort string and return to page 1
    pub fn set_sort(&mut self, sort: Option<String>) -> Result<()> {
        let sort = sort.none_if_empty();
        if let Some(sort) = &sort {
            SortSpec::parse(sort)?;
        }
        self.rebuild("sort", |q| q.sort = sort);
        Ok(())
    }

    /// Replace the page size and return to page 1
    pub fn set_page_size(&mut self, page_size: u32) -> Result<()> {
        if page_size == 0 {
            return Err(Error::query("page size must be > 0"));
        }
        self.rebuild("page size", |q| q.limit = page_size);
        Ok(())
    }

    /// Replace the search term and return to page 1
    pub fn set_search(&mut self, search: Option<String>) {
        let search = search.none_if_empty();
        self.rebuild("search", |q| q.search = search);
    }

    fn rebuild(&mut self, what: &str, change: impl FnOnce(&mut Query)) {
        let mut next = Query {
            page: 1,
            ..self.query.clone()
        };
        change(&mut next);
        debug!("Changed {what}; back to page 1");
        self.query = next;
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Go to `page` when it lies in `[1, total_pages]`; state is unchanged otherwise
    pub fn set_page(&mut self, page: u32) -> Result<()> {
        let max = self.total_pages.unwrap_or(u32::MAX).max(1);
        if page < 1 || page > max {
            return Err(Error::validation(format!(
                "page {page} is outside 1..={max}"
            )));
        }
        self.query = Query {
            page,
            ..self.query.clone()
        };
        Ok(())
    }

    /// Validate free-text page input and go there.
    ///
    /// Non-numeric or out-of-range input is rejected without clamping.
    pub fn jump_to(&mut self, input: &str) -> Result<u32> {
        let page = input.trim().parse::<u32>().map_err(|_| {
            Error::validation(format!("'{}' is not a page number", input.trim()))
        });

        match page.and_then(|page| self.set_page(page).map(|()| page)) {
            Ok(page) => Ok(page),
            Err(e) => {
                warn!("Ignoring page jump: {e}");
                Err(e)
            }
        }
    }

    /// Advance one page if there is one
    pub fn next_page(&mut self) -> bool {
        if !self.can_next() {
            return false;
        }
        self.set_page(self.page() + 1).is_ok()
    }

    /// Go back one page if there is one
    pub fn prev_page(&mut self) -> bool {
        if !self.can_prev() {
            return false;
        }
        self.set_page(self.page() - 1).is_ok()
    }

    pub fn can_prev(&self) -> bool {
        self.page() > 1
    }

    pub fn can_next(&self) -> bool {
        self.total_pages.is_some_and(|total| self.page() < total)
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Record totals from a fetched page.
    ///
    /// When the result set shrank below the current page, moves to the new
    /// last page and returns `true` so the caller refetches.
    pub fn apply_meta<T>(&mut self, page: &Page<T>) -> bool {
        self.total = page.total;
        self.total_pages = page.total_pages;

        match self.total_pages {
            Some(total) if total > 0 && self.page() > total => {
                debug!("Result set shrank to {total} pages; moving from page {}", self.page());
                self.query = Query {
                    page: total,
                    ..self.query.clone()
                };
                true
            }
            _ => false,
        }
    }

    /// Page-button model for the current state
    pub fn window(&self) -> PageWindow {
        PageWindow::compute(self.page(), self.total_pages.unwrap_or(0))
    }
}

impl Default for PaginationController {
    fn default() -> Self {
        Self::new(Query::default())
    }
}
