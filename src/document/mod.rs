//! Document store module
//!
//! Client-side view of a document-oriented store: paths, documents,
//! structured queries, and the `DocumentStore` client trait.
//!
//! # Overview
//!
//! The store only supports forward cursor pagination over indexed fields:
//! - collection-group queries across every parent partition
//! - equality and range predicates, with all ranges on one field
//! - a single leading order-by matching the range field
//! - `startAfter` cursors and a page `limit`
//!
//! `InMemoryStore` implements the same rules for tests and embedding.

mod store;
mod types;
pub mod value;

pub use store::{DocumentStore, InMemoryStore};
pub use types::{Document, DocumentPath, FieldOp, OrderBy, Predicate, StructuredQuery};
pub use value::compare_values;
