//! REST module
//!
//! Offset-paginated list endpoints returning `{ data, meta }` envelopes.

mod source;

pub use source::{RestMeta, RestPageSource, RestResponse};

#[cfg(test)]
mod tests;
