//! Query module
//!
//! Logical list queries and their encoding for each backend.
//!
//! # Overview
//!
//! A `Query` carries page, limit, sort string, typed filters, a search term,
//! and any unrecognized keys. `QueryEncoder` turns it into:
//! - `RequestParams` for the offset-paginated REST backend
//! - `CursorQuery` for the cursor-paginated document store

mod encoder;
mod types;

pub use encoder::{QueryEncoder, RequestParams, WHERE_JSON_PARAM};
pub use types::{CursorQuery, Filter, Filters, Query, DEFAULT_LIMIT};
