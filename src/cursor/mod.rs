//! Cursor pagination module
//!
//! Adapter from `CursorQuery` to the document store, plus prefix search
//! emulation over lexicographic ranges.
//!
//! # Overview
//!
//! - `CursorPageSource` - one store query per page, cursor = last sort value
//! - `PrefixSearch` - "starts with" search as a `[term, term + sentinel]` range
//! - `ConflictPolicy` - reject or client-side filter when range and sort fields differ
//! - `PartitionMapping` - parent id recovered from document paths

mod search;
mod source;

pub use search::{PrefixMode, PrefixSearch, PREFIX_SENTINEL};
pub use source::{prefix_query, ConflictPolicy, CursorPageSource, PartitionMapping, QueryPlan};
