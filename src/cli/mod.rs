//! CLI module
//!
//! Command-line interface for exploring paginated lists.
//!
//! # Commands
//!
//! - `page` - Fetch and print one page of a configured list
//! - `window` - Print the page-button window for a page/total pair
//! - `sort-cycle` - Print the tri-state sort sequence for a column
//! - `validate` - Validate a list configuration

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
