// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # pagewise
//!
//! One paginated data-access layer over two very different backends:
//! an offset-paginated REST API returning `{data, meta}` pages, and a
//! document store that only supports forward cursor pagination, collection
//! group queries, and range-based prefix matching.
//!
//! ## Features
//!
//! - **Query encoding**: one `Query` shape, split per backend (`sort`/`order`,
//!   plain equality params, `whereJson` trees, native predicates)
//! - **Offset pagination**: `PaginationController` with reset-to-page-1 and a
//!   windowed page-button model
//! - **Cursor pagination**: collection-group fan-in, parent ids recovered from
//!   document paths, has-next inference
//! - **Infinite scroll**: `InfiniteAccumulator` with a re-entrancy guard and
//!   stale-response discard
//! - **Prefix search**: "starts with" as a lexicographic range
//! - **Tables**: column contract with a tri-state sort toggle
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pagewise::{HttpClient, HttpClientConfig, PageSource, Query, RestPageSource, RestResource};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> pagewise::Result<()> {
//!     let client = HttpClient::with_config(
//!         HttpClientConfig::builder().base_url("https://api.example.com").build(),
//!     );
//!     let orders: RestResource<serde_json::Value> =
//!         RestResource::new(Arc::new(RestPageSource::new(client)), "/orders");
//!
//!     let page = orders.fetch_page(&Query::new(20).with_sort("-createdAt"), None).await?;
//!     println!("{} rows, more: {}", page.len(), page.has_next);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! UI state (filters, sort, search)
//!            │
//!       QueryEncoder
//!            │
//!   ┌────────┴─────────┐
//!   │                  │
//! RestPageSource   CursorPageSource ── PrefixSearch
//!   │                  │
//!   └──── PageSource ──┘   (RequestCache: single-flight per key)
//!            │
//!  PaginationController | InfiniteAccumulator
//!            │
//!          Table
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Logical queries and backend encoding
pub mod query;

/// HTTP client with optional rate limiting
pub mod http;

/// Offset-paginated REST source
pub mod rest;

/// Document store model and in-memory store
pub mod document;

/// Cursor-paginated document-store source and prefix search
pub mod cursor;

/// Single-flight request cache
pub mod cache;

/// Unified page source interface and offset pagination state
pub mod pagination;

/// Infinite-scroll accumulation
pub mod accumulator;

/// Table column and sort contract
pub mod table;

/// List configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use accumulator::{InfiniteAccumulator, LoadOutcome};
pub use cache::{CacheConfig, RequestCache, RetryPolicy};
pub use config::{load_list_config, load_list_config_from_str, ListConfig, ListSource};
pub use cursor::{ConflictPolicy, CursorPageSource, PartitionMapping, PrefixMode, PrefixSearch};
pub use document::{Document, DocumentStore, InMemoryStore, StructuredQuery};
pub use http::{HttpClient, HttpClientConfig};
pub use pagination::{CollectionSource, PageSource, PageWindow, PaginationController, RestResource};
pub use query::{CursorQuery, Filter, Filters, Query, QueryEncoder};
pub use rest::RestPageSource;
pub use table::{Column, SortState, Table};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
