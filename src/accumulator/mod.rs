//! Infinite-scroll accumulator
//!
//! Appends successive pages from a `PageSource` into one growing list.
//!
//! - At most one fetch is in flight; further `load_more` calls are no-ops.
//! - Each query identity gets a generation number. A response that comes
//!   back for an older generation is discarded, never appended.
//! - Changing filters, sort, or search throws the whole list away.

use crate::error::{Error, Result};
use crate::pagination::PageSource;
use crate::query::Query;
use crate::types::{Page, PageCursor};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// What a `load_more` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was appended
    Appended { rows: usize },
    /// Another fetch was already in flight
    InFlight,
    /// The source reported no further pages
    Exhausted,
    /// The response belonged to a superseded query and was dropped
    Discarded,
}

struct State<T> {
    query: Query,
    generation: u64,
    pages: Vec<Page<T>>,
    in_flight: bool,
}

impl<T> State<T> {
    fn has_more(&self) -> bool {
        match self.pages.last() {
            None => true,
            Some(page) => page.has_next && page.cursor.is_some(),
        }
    }

    fn next_cursor(&self) -> Option<PageCursor> {
        self.pages.last().and_then(|page| page.cursor.clone())
    }
}

/// Growing list of rows over any page source
pub struct InfiniteAccumulator<T, S: ?Sized> {
    source: Arc<S>,
    state: Mutex<State<T>>,
}

impl<T, S> InfiniteAccumulator<T, S>
where
    T: Clone + Send + 'static,
    S: PageSource<T> + ?Sized,
{
    /// Create an empty accumulator for `query`
    pub fn new(source: Arc<S>, query: Query) -> Self {
        Self {
            source,
            state: Mutex::new(State {
                query: first_page(query),
                generation: 0,
                pages: Vec::new(),
                in_flight: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current query
    pub fn query(&self) -> Query {
        self.lock().query.clone()
    }

    /// Generation of the current query identity
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Whether another page may exist
    pub fn has_more(&self) -> bool {
        self.lock().has_more()
    }

    /// Whether a fetch is in flight
    pub fn is_loading(&self) -> bool {
        self.lock().in_flight
    }

    /// Number of pages appended so far
    pub fn page_count(&self) -> usize {
        self.lock().pages.len()
    }

    /// All rows in fetch order
    pub fn rows(&self) -> Vec<T> {
        self.lock()
            .pages
            .iter()
            .flat_map(|page| page.rows.iter().cloned())
            .collect()
    }

    /// Number of rows accumulated
    pub fn len(&self) -> usize {
        self.lock().pages.iter().map(Page::len).sum()
    }

    /// Whether no rows have been accumulated
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Switch to `query`.
    ///
    /// When its identity differs from the current one the list is discarded
    /// and any in-flight response becomes stale. Returns whether that happened.
    pub fn reset(&self, query: Query) -> bool {
        let query = first_page(query);
        let mut state = self.lock();
        if state.query.identity() == query.identity() {
            return false;
        }
        state.query = query;
        Self::restart(&mut state);
        true
    }

    /// Discard every page and start over with the same query
    pub fn refresh(&self) {
        Self::restart(&mut self.lock());
    }

    fn restart(state: &mut State<T>) {
        state.generation += 1;
        state.pages.clear();
        state.in_flight = false;
        debug!("Accumulator restarted at generation {}", state.generation);
    }

    /// Fetch and append the next page.
    ///
    /// No-op while a fetch is in flight or after the last page.
    pub async fn load_more(&self) -> Result<LoadOutcome> {
        let (generation, query, cursor) = {
            let mut state = self.lock();
            if state.in_flight {
                return Ok(LoadOutcome::InFlight);
            }
            if !state.has_more() {
                return Ok(LoadOutcome::Exhausted);
            }
            state.in_flight = true;
            (state.generation, state.query.clone(), state.next_cursor())
        };

        let mut guard = InFlightGuard {
            state: &self.state,
            generation,
            armed: true,
        };
        let result = self.source.fetch_page(&query, cursor.as_ref()).await;
        guard.armed = false;

        match self.commit(generation, result) {
            Err(Error::StaleResponse { expected, actual }) => {
                warn!("Discarding response for generation {actual}; current is {expected}");
                Ok(LoadOutcome::Discarded)
            }
            other => other,
        }
    }

    fn commit(&self, generation: u64, result: Result<Page<T>>) -> Result<LoadOutcome> {
        let mut state = self.lock();
        if state.generation != generation {
            return Err(Error::StaleResponse {
                expected: state.generation,
                actual: generation,
            });
        }
        state.in_flight = false;

        let page = result?;
        let rows = page.len();
        debug!(
            "Appended page {} ({} rows, has_next: {})",
            state.pages.len() + 1,
            rows,
            page.has_next
        );
        state.pages.push(page);
        Ok(LoadOutcome::Appended { rows })
    }
}

impl<T, S: ?Sized> std::fmt::Debug for InfiniteAccumulator<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("InfiniteAccumulator")
            .field("generation", &state.generation)
            .field("pages", &state.pages.len())
            .field("in_flight", &state.in_flight)
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight flag if a `load_more` future is dropped mid-fetch
struct InFlightGuard<'a, T> {
    state: &'a Mutex<State<T>>,
    generation: u64,
    armed: bool,
}

impl<T> Drop for InFlightGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation == self.generation {
            state.in_flight = false;
        }
    }
}

fn first_page(query: Query) -> Query {
    Query { page: 1, ..query }
}

#[cfg(test)]
mod tests;
