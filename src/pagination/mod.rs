//! Pagination module
//!
//! The unified hook interface and offset-style page state.
//!
//! # Overview
//!
//! - `PageSource` - one page of rows from any backend
//! - `RestResource` / `CollectionSource` - the two backends behind it
//! - `PaginationController` - page/size/sort/filter state with reset-to-page-1
//! - `PageWindow` - windowed page-button model

mod controller;
mod source;
mod window;

pub use controller::{PaginationController, DEFAULT_PAGE_SIZE_OPTIONS};
pub use source::{CollectionSource, PageSource, RestResource};
pub use window::{PageButton, PageWindow, MAX_PAGE_BUTTONS};
