//! List configuration
//!
//! A list view is described in YAML (or JSON): which backend serves it, its
//! columns, the query it starts from, and the page sizes it offers.
//!
//! ```yaml
//! name: orders
//! base_url: https://api.example.com
//! source:
//!   rest:
//!     path: /orders
//! columns:
//!   - key: id
//!     header: Order
//!   - key: total
//!     sortable: true
//! initial_query:
//!   sort: -createdAt
//!   filters:
//!     status: paid
//! page_size_options: [10, 20, 50]
//! initial_page_size: 20
//! ```

use crate::cursor::{ConflictPolicy, CursorPageSource, PartitionMapping, PrefixMode};
use crate::document::DocumentStore;
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::pagination::{PaginationController, DEFAULT_PAGE_SIZE_OPTIONS};
use crate::query::Query;
use crate::table::{Column, SortState, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Top-Level List Config
// ============================================================================

/// Complete list configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListConfig {
    /// List name, used in logs
    #[serde(default)]
    pub name: Option<String>,

    /// Base URL for REST sources
    #[serde(default)]
    pub base_url: Option<String>,

    /// Backend serving the list, keyed by kind (`rest:` or `collection:`)
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub source: ListSource,

    /// Table columns
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,

    /// Query the list starts from
    #[serde(default)]
    pub initial_query: Query,

    /// Page sizes offered to the user
    #[serde(default = "default_page_size_options")]
    pub page_size_options: Vec<u32>,

    /// Starting page size, defaulting to the first option
    #[serde(default)]
    pub initial_page_size: Option<u32>,

    /// HTTP client settings for REST sources
    #[serde(default)]
    pub http: HttpSettings,
}

fn default_page_size_options() -> Vec<u32> {
    DEFAULT_PAGE_SIZE_OPTIONS.to_vec()
}

// ============================================================================
// Sources
// ============================================================================

/// Backend serving a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListSource {
    /// Offset-paginated REST endpoint
    Rest(RestSourceConfig),
    /// Cursor-paginated document-store collection group
    Collection(CollectionSourceConfig),
}

/// REST endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestSourceConfig {
    /// List path, relative to `base_url`
    pub path: String,
}

/// Document-store collection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSourceConfig {
    /// Collection id, queried across all parents
    pub name: String,

    /// Row field receiving the parent document id
    #[serde(default)]
    pub parent_field: Option<String>,

    /// Row field receiving the document id
    #[serde(default)]
    pub id_field: Option<String>,

    /// Field prefix search runs over
    #[serde(default)]
    pub search_field: Option<String>,

    #[serde(default)]
    pub prefix_mode: PrefixMode,

    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
}

impl CollectionSourceConfig {
    /// Build a cursor source over `store` with these settings
    pub fn cursor_source(&self, store: Arc<dyn DocumentStore>) -> CursorPageSource {
        let mut source = CursorPageSource::new(store).with_conflict_policy(self.conflict_policy);
        if let Some(field) = &self.parent_field {
            source = source.with_partition(PartitionMapping::parent(field.clone()));
        }
        if let Some(field) = &self.id_field {
            source = source.with_id_field(field.clone());
        }
        source
    }
}

// ============================================================================
// Columns
// ============================================================================

/// Column configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Row field (dotted paths reach nested fields)
    pub key: String,

    /// Header label, defaulting to the key
    #[serde(default)]
    pub header: Option<String>,

    #[serde(default)]
    pub sortable: bool,
}

// ============================================================================
// HTTP Settings
// ============================================================================

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Client-side throttling
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,
}

fn default_timeout() -> u64 {
    30
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            headers: HashMap::new(),
            rate_limit: None,
        }
    }
}

// ============================================================================
// Derived State
// ============================================================================

impl ListConfig {
    /// Starting page size
    pub fn page_size(&self) -> u32 {
        self.initial_page_size
            .or_else(|| self.page_size_options.first().copied())
            .unwrap_or(self.initial_query.limit)
    }

    /// First-page query with the configured page size
    pub fn initial_query(&self) -> Query {
        Query {
            page: 1,
            limit: self.page_size(),
            ..self.initial_query.clone()
        }
    }

    /// Controller seeded with the initial query and page-size options
    pub fn controller(&self) -> PaginationController {
        PaginationController::new(self.initial_query())
            .with_page_size_options(self.page_size_options.clone())
    }

    /// Table with the configured columns, sorted like the initial query
    pub fn table<R: Serialize + 'static>(&self) -> Result<Table<R>> {
        let sort = SortState::from_sort_string(self.initial_query.sort.as_deref())?;
        let columns = self.columns.iter().map(Column::from_spec).collect();
        Ok(Table::new(columns).with_sort(sort))
    }

    /// HTTP client configuration; `base_url` overrides the configured one
    pub fn http_client_config(&self, base_url: Option<&str>) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .timeout(Duration::from_secs(self.http.timeout_seconds));
        if let Some(url) = base_url.map(str::to_string).or_else(|| self.base_url.clone()) {
            builder = builder.base_url(url);
        }
        if let Some(rate_limit) = &self.http.rate_limit {
            builder = builder.rate_limit(rate_limit.clone());
        }
        for (key, value) in &self.http.headers {
            builder = builder.header(key.clone(), value.clone());
        }
        builder.build()
    }

    /// Display name
    pub fn display_name(&self) -> &str {
        match (&self.name, &self.source) {
            (Some(name), _) => name,
            (None, ListSource::Rest(rest)) => &rest.path,
            (None, ListSource::Collection(collection)) => &collection.name,
        }
    }
}

// ============================================================================
// Loader Functions
// ============================================================================

/// Load a list config from a YAML or JSON file
pub fn load_list_config<P: AsRef<Path>>(path: P) -> Result<ListConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read list config '{}': {}",
            path.display(),
            e
        ))
    })?;
    load_list_config_from_str(&content)
}

/// Load a list config from a YAML string (JSON is valid YAML)
pub fn load_list_config_from_str(yaml: &str) -> Result<ListConfig> {
    let config: ListConfig = serde_yaml::from_str(yaml)?;
    validate_list_config(&config)?;
    Ok(config)
}

/// Reject structurally unusable configs
fn validate_list_config(config: &ListConfig) -> Result<()> {
    match &config.source {
        ListSource::Rest(rest) if rest.path.trim().is_empty() => {
            return Err(Error::config("REST source path cannot be empty"));
        }
        ListSource::Collection(collection) if collection.name.trim().is_empty() => {
            return Err(Error::config("Collection name cannot be empty"));
        }
        _ => {}
    }

    if config.page_size_options.contains(&0) || config.initial_page_size == Some(0) {
        return Err(Error::config("Page sizes must be > 0"));
    }

    if let Some(column) = config.columns.iter().find(|c| c.key.trim().is_empty()) {
        return Err(Error::config(format!(
            "Column key cannot be empty (header {:?})",
            column.header
        )));
    }

    config.initial_query.sort_spec()?;
    Ok(())
}
