//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Paginated list explorer for REST and document-store backends
#[derive(Parser, Debug)]
#[command(name = "pagewise")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// List configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub list: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch and print one page of a list
    Page {
        /// Page number (1-based)
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Page size (defaults to the list's initial page size)
        #[arg(long)]
        page_size: Option<u32>,

        /// Sort key, leading `-` for descending
        #[arg(long, allow_hyphen_values = true)]
        sort: Option<String>,

        /// Search term
        #[arg(long)]
        search: Option<String>,

        /// Equality filter `field=value` (repeatable)
        #[arg(long = "filter", value_name = "FIELD=VALUE")]
        filters: Vec<String>,

        /// Nested filter tree as a JSON object
        #[arg(long)]
        where_json: Option<String>,

        /// Override the list's base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Documents backing a collection list (JSON array of `{path, fields}`)
        #[arg(long)]
        documents: Option<PathBuf>,
    },

    /// Print the page-button window
    Window {
        /// Current page
        #[arg(short, long)]
        page: u32,

        /// Total pages
        #[arg(short, long)]
        total_pages: u32,
    },

    /// Print the sort states produced by repeated header clicks
    SortCycle {
        /// Column clicked
        #[arg(short, long)]
        column: String,

        /// Number of clicks
        #[arg(short = 'n', long, default_value = "3")]
        clicks: usize,

        /// Starting sort string
        #[arg(long, allow_hyphen_values = true)]
        from: Option<String>,
    },

    /// Validate a list configuration
    Validate,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Pretty,
}
