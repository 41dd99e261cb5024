//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_list_config, ListConfig, ListSource};
use crate::document::{Document, InMemoryStore};
use crate::error::{Error, Result, ResultExt};
use crate::http::HttpClient;
use crate::pagination::{
    CollectionSource, PageSource, PageWindow, PaginationController, RestResource,
};
use crate::query::{Filter, Filters};
use crate::rest::RestPageSource;
use crate::table::{Column, SortState, Table};
use crate::types::{JsonValue, Page, PageCursor};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Page {
                page,
                page_size,
                sort,
                search,
                filters,
                where_json,
                base_url,
                documents,
            } => {
                let request = PageRequest {
                    page: *page,
                    page_size: *page_size,
                    sort: sort.clone(),
                    search: search.clone(),
                    filters: parse_filters(filters, where_json.as_deref())?,
                };
                self.page(request, base_url.as_deref(), documents.as_deref())
                    .await
            }
            Commands::Window { page, total_pages } => self.window(*page, *total_pages),
            Commands::SortCycle {
                column,
                clicks,
                from,
            } => self.sort_cycle(column, *clicks, from.as_deref()),
            Commands::Validate => self.validate(),
        }
    }

    /// Load the list configuration
    fn load_list(&self) -> Result<ListConfig> {
        let path = self
            .cli
            .list
            .as_ref()
            .ok_or_else(|| Error::config("List config not specified (use -l flag)"))?;
        load_list_config(path)
    }

    /// Print `value` as JSON, or the pretty text
    fn emit(&self, value: &JsonValue, pretty: impl FnOnce() -> String) -> Result<()> {
        match self.cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Pretty => println!("{}", pretty()),
        }
        Ok(())
    }

    // ========================================================================
    // Page
    // ========================================================================

    async fn page(
        &self,
        request: PageRequest,
        base_url: Option<&str>,
        documents: Option<&Path>,
    ) -> Result<()> {
        let config = self.load_list()?;
        let mut controller = request.apply(config.controller())?;

        info!(
            "Fetching page {} of '{}' ({} rows per page)",
            request.page,
            config.display_name(),
            controller.page_size()
        );

        let page = match &config.source {
            ListSource::Rest(rest) => {
                let http = config.http_client_config(base_url);
                if http.base_url.is_none() {
                    return Err(Error::config(
                        "REST lists need a base_url (in the list config or --base-url)",
                    ));
                }
                let source = Arc::new(RestPageSource::new(HttpClient::with_config(http)));
                let resource: RestResource<JsonValue> =
                    RestResource::new(source, rest.path.clone());

                let mut page = resource.fetch_page(controller.query(), None).await?;
                if controller.apply_meta(&page) {
                    debug!("Page out of range; refetching page {}", controller.page());
                    page = resource.fetch_page(controller.query(), None).await?;
                    controller.apply_meta(&page);
                }
                page
            }
            ListSource::Collection(collection) => {
                let path = documents.ok_or_else(|| {
                    Error::config("Collection lists need --documents <file.json>")
                })?;
                let store = Arc::new(load_documents(path)?);
                let mut source: CollectionSource<JsonValue> = CollectionSource::new(
                    Arc::new(collection.cursor_source(store)),
                    collection.name.clone(),
                )
                .with_prefix_mode(collection.prefix_mode);
                if let Some(field) = &collection.search_field {
                    source = source.with_search_field(field.clone());
                }

                walk_to_page(&source, &controller, request.page).await?
            }
        };

        let table = build_table(&config, &controller, &page.rows)?;
        let output = json!({
            "list": config.display_name(),
            "page": controller.page(),
            "page_size": controller.page_size(),
            "has_next": page.has_next,
            "total": page.total,
            "total_pages": page.total_pages,
            "rows": page.rows,
        });

        self.emit(&output, || {
            let mut text = table.render_text(&page.rows).unwrap_or_default();
            text.push_str("\n\n");
            match page.total_pages {
                Some(total_pages) => {
                    text.push_str(&format!(
                        "page {} of {} ({} rows)\n{}",
                        controller.page(),
                        total_pages,
                        page.total.unwrap_or_default(),
                        controller.window()
                    ));
                }
                None => {
                    let more = if page.has_next { ", more available" } else { "" };
                    text.push_str(&format!("page {}{more}", controller.page()));
                }
            }
            text
        })
    }

    // ========================================================================
    // Window / Sort Cycle / Validate
    // ========================================================================

    fn window(&self, page: u32, total_pages: u32) -> Result<()> {
        let window = PageWindow::compute(page, total_pages);
        let output = json!({
            "current": window.current,
            "pages": window.pages,
            "last": window.last,
            "ellipsis": window.has_ellipsis(),
        });
        self.emit(&output, || window.to_string())
    }

    fn sort_cycle(&self, column: &str, clicks: usize, from: Option<&str>) -> Result<()> {
        let mut state = SortState::from_sort_string(from)?;
        let mut states = Vec::with_capacity(clicks);
        for _ in 0..clicks {
            state = state.toggle(column);
            states.push(state.clone());
        }

        let output = serde_json::to_value(&states)?;
        self.emit(&output, || {
            states
                .iter()
                .enumerate()
                .map(|(i, state)| {
                    let sort = state.to_sort_string().unwrap_or_else(|| "none".to_string());
                    format!("click {}: {} {}", i + 1, sort, state.indicator(column))
                        .trim_end()
                        .to_string()
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
    }

    fn validate(&self) -> Result<()> {
        let config = self.load_list()?;
        let source = match &config.source {
            ListSource::Rest(rest) => format!("rest {}", rest.path),
            ListSource::Collection(collection) => format!("collection group '{}'", collection.name),
        };
        let output = json!({
            "valid": true,
            "name": config.display_name(),
            "source": source,
            "columns": config.columns.len(),
            "page_size": config.page_size(),
            "page_size_options": config.page_size_options,
        });
        self.emit(&output, || {
            format!(
                "List '{}' is valid: {}, {} columns, page size {} of {:?}",
                config.display_name(),
                source,
                config.columns.len(),
                config.page_size(),
                config.page_size_options
            )
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Query changes requested on the command line
struct PageRequest {
    page: u32,
    page_size: Option<u32>,
    sort: Option<String>,
    search: Option<String>,
    filters: Option<Filters>,
}

impl PageRequest {
    /// Apply the changes in controller order, then move to the requested page
    fn apply(&self, mut controller: PaginationController) -> Result<PaginationController> {
        if let Some(size) = self.page_size {
            controller.set_page_size(size)?;
        }
        if self.sort.is_some() {
            controller.set_sort(self.sort.clone())?;
        }
        if self.search.is_some() {
            controller.set_search(self.search.clone());
        }
        if let Some(filters) = &self.filters {
            controller.set_filters(filters.clone());
        }
        controller.set_page(self.page)?;
        Ok(controller)
    }
}

/// Parse `field=value` filters and an optional JSON tree
fn parse_filters(filters: &[String], where_json: Option<&str>) -> Result<Option<Filters>> {
    if filters.is_empty() && where_json.is_none() {
        return Ok(None);
    }

    let mut out = Filters::new();
    for filter in filters {
        let (field, value) = filter
            .split_once('=')
            .ok_or_else(|| Error::validation(format!("filter '{filter}' is not FIELD=VALUE")))?;
        let value = serde_json::from_str::<JsonValue>(value)
            .unwrap_or_else(|_| JsonValue::String(value.to_string()));
        out.push(Filter::eq(field.trim(), value));
    }
    if let Some(tree) = where_json {
        out.push(Filter::raw(serde_json::from_str(tree)?));
    }
    Ok(Some(out))
}

/// Load documents from a JSON array of `{path, fields}`
fn load_documents(path: &Path) -> Result<InMemoryStore> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read documents '{}'", path.display()))?;
    let documents: Vec<Document> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid documents file '{}'", path.display()))?;
    debug!("Loaded {} documents from {}", documents.len(), path.display());
    Ok(InMemoryStore::with_documents(documents))
}

/// Follow the cursor chain from the first page to `page`
async fn walk_to_page<S>(
    source: &S,
    controller: &PaginationController,
    page: u32,
) -> Result<Page<JsonValue>>
where
    S: PageSource<JsonValue>,
{
    let mut cursor: Option<PageCursor> = None;
    let mut current = Page::empty();
    for n in 1..=page {
        current = source.fetch_page(controller.query(), cursor.as_ref()).await?;
        if n < page {
            if !current.has_next {
                return Err(Error::validation(format!(
                    "page {page} is past the end (last page is {n})"
                )));
            }
            cursor = current.cursor.clone();
        }
    }
    Ok(current)
}

/// Configured columns, or one column per field of the first row
fn build_table(
    config: &ListConfig,
    controller: &PaginationController,
    rows: &[JsonValue],
) -> Result<Table<JsonValue>> {
    let table = if config.columns.is_empty() {
        let keys = rows
            .first()
            .and_then(JsonValue::as_object)
            .map(|obj| obj.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        Table::new(keys.into_iter().map(|key| Column::new(key.clone(), key)).collect())
    } else {
        config.table()?
    };
    Ok(table.with_sort(SortState::from_sort_string(controller.sort())?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_filters() {
        let filters = parse_filters(
            &["status=paid".to_string(), "count=3".to_string()],
            Some(r#"{"tags":{"in":["a"]}}"#),
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            filters,
            Filters::new()
                .eq("status", "paid")
                .eq("count", 3)
                .raw(json!({"tags": {"in": ["a"]}}))
        );
        assert_eq!(parse_filters(&[], None).unwrap(), None);
        assert!(parse_filters(&["nope".to_string()], None).is_err());
    }

    #[test]
    fn test_page_request_applies_then_moves_to_page() {
        let request = PageRequest {
            page: 3,
            page_size: Some(20),
            sort: Some("-total".into()),
            search: None,
            filters: Some(Filters::new().eq("status", "paid")),
        };

        let controller = request.apply(PaginationController::default()).unwrap();
        assert_eq!(controller.page(), 3);
        assert_eq!(controller.page_size(), 20);
        assert_eq!(controller.sort(), Some("-total"));
    }

    #[test]
    fn test_build_table_derives_columns() {
        let config = crate::config::load_list_config_from_str("source: {rest: {path: /a}}").unwrap();
        let rows = vec![json!({"id": "a", "name": "Ada"})];
        let table = build_table(&config, &PaginationController::default(), &rows).unwrap();

        let keys: Vec<&str> = table.columns().iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["id", "name"]);
    }
}
