//! Document store client trait and the in-memory implementation

use super::types::{Document, FieldOp, StructuredQuery};
use super::value::{compare_values, same_type};
use crate::error::Result;
use crate::types::{JsonValue, SortDirection};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Client handle for a document store.
///
/// Handles are created once by the process entry point and passed to
/// adapters by value (`Arc<dyn DocumentStore>`).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Execute a structured query and return matching documents in order
    async fn run_query(&self, query: &StructuredQuery) -> Result<Vec<Document>>;
}

/// Document store held in process memory.
///
/// Evaluates queries with the same shape rules and ordering as the remote
/// store, so adapters can be exercised without a network.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: RwLock<Vec<Document>>,
    latency: Option<Duration>,
    queries: AtomicUsize,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding these documents
    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: RwLock::new(documents),
            ..Self::default()
        }
    }

    /// Delay every query by a fixed latency
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Insert or replace a document
    pub async fn upsert(&self, document: Document) {
        let mut docs = self.documents.write().await;
        match docs.iter_mut().find(|d| d.path == document.path) {
            Some(existing) => *existing = document,
            None => docs.push(document),
        }
    }

    /// Insert a document from a path and JSON fields
    pub async fn insert(&self, path: &str, fields: JsonValue) -> Result<()> {
        self.upsert(Document::new(path, fields)?).await;
        Ok(())
    }

    /// Number of queries executed so far
    pub fn query_count(&self) -> usize {
        self.queries.load(AtomicOrdering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn run_query(&self, query: &StructuredQuery) -> Result<Vec<Document>> {
        query.validate()?;
        self.queries.fetch_add(1, AtomicOrdering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let docs = self.documents.read().await;
        let mut matched: Vec<Document> = docs
            .iter()
            .filter(|doc| in_scope(doc, query) && matches_all(doc, query))
            .cloned()
            .collect();
        drop(docs);

        matched.sort_by(|a, b| compare_docs(a, b, query));

        if let Some(after) = &query.start_after {
            matched.retain(|doc| is_after_cursor(doc, query, after));
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit as usize);
        }

        debug!(
            "In-memory query on '{}' returned {} documents",
            query.collection,
            matched.len()
        );
        Ok(matched)
    }
}

/// Collection scope: group queries match on collection id, others on full path
fn in_scope(doc: &Document, query: &StructuredQuery) -> bool {
    if query.all_descendants {
        doc.path.collection_id() == query.collection
    } else {
        doc.path.collection_path() == query.collection.trim_matches('/')
    }
}

/// Every predicate holds and every order-by field exists
fn matches_all(doc: &Document, query: &StructuredQuery) -> bool {
    let predicates_hold = query.predicates.iter().all(|p| {
        let Some(value) = doc.get(&p.field) else {
            return false;
        };
        // Range comparisons never cross type classes
        if p.op.is_inequality() && !same_type(value, &p.value) {
            return false;
        }
        let ord = compare_values(value, &p.value);
        match p.op {
            FieldOp::Equal => ord == Ordering::Equal,
            FieldOp::LessThan => ord == Ordering::Less,
            FieldOp::LessThanOrEqual => ord != Ordering::Greater,
            FieldOp::GreaterThan => ord == Ordering::Greater,
            FieldOp::GreaterThanOrEqual => ord != Ordering::Less,
        }
    });

    predicates_hold && query.order_by.iter().all(|o| doc.get(&o.field).is_some())
}

/// Order by each clause, then by document path in the last clause's direction
fn compare_docs(a: &Document, b: &Document, query: &StructuredQuery) -> Ordering {
    for clause in &query.order_by {
        let ord = match (a.get(&clause.field), b.get(&clause.field)) {
            (Some(x), Some(y)) => compare_values(x, y),
            _ => Ordering::Equal,
        };
        let ord = apply_direction(ord, clause.direction);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    let tiebreak_dir = query
        .order_by
        .last()
        .map_or(SortDirection::Asc, |o| o.direction);
    apply_direction(a.path.cmp(&b.path), tiebreak_dir)
}

/// Whether a document sorts strictly after the cursor values
fn is_after_cursor(doc: &Document, query: &StructuredQuery, after: &[JsonValue]) -> bool {
    for (clause, cursor) in query.order_by.iter().zip(after) {
        let Some(value) = doc.get(&clause.field) else {
            return false;
        };
        let ord = apply_direction(compare_values(value, cursor), clause.direction);
        match ord {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        }
    }
    // Equal on every cursor field: not strictly after
    false
}

fn apply_direction(ord: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

