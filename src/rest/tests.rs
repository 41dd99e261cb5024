//! Tests for the REST page source

use super::*;
use crate::cache::{CacheConfig, RetryPolicy};
use crate::error::Error;
use crate::http::{HttpClient, HttpClientConfig};
use crate::query::{Filters, Query};
use crate::types::{BackoffType, Page, PageCursor};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Order {
    id: String,
    total: f64,
}

fn source_for(server: &MockServer) -> RestPageSource {
    RestPageSource::new(HttpClient::with_config(
        HttpClientConfig::builder().base_url(server.uri()).build(),
    ))
}

fn envelope(rows: serde_json::Value, current: u32, total_pages: u32, total: u64) -> serde_json::Value {
    json!({
        "data": rows,
        "meta": {
            "total": total,
            "totalPages": total_pages,
            "currentPage": current,
            "limit": 2
        }
    })
}

#[test]
fn test_meta_has_next() {
    let meta = RestMeta {
        total: 5,
        total_pages: 3,
        current_page: 2,
        limit: 2,
    };
    assert!(meta.has_next());
    assert!(!RestMeta {
        current_page: 3,
        ..meta
    }
    .has_next());
    assert!(!RestMeta {
        total: 0,
        total_pages: 0,
        current_page: 1,
        limit: 2
    }
    .has_next());
}

#[tokio::test]
async fn test_fetch_page_with_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "2"))
        .and(query_param("sort", "createdAt"))
        .and(query_param("order", "desc"))
        .and(query_param("status", "paid"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([{"id": "o3", "total": 30.0}, {"id": "o4", "total": 12.5}]),
            2,
            3,
            5,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let query = Query::new(2)
        .with_page(2)
        .with_sort("-createdAt")
        .with_filters(Filters::new().eq("status", "paid"));

    let page: Page<Order> = source_for(&server).fetch("/orders", &query).await.unwrap();

    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.rows[0].id, "o3");
    assert!(page.has_next);
    assert_eq!(page.cursor, Some(PageCursor::Page(3)));
    assert_eq!(page.total, Some(5));
    assert_eq!(page.total_pages, Some(3));
}

#[tokio::test]
async fn test_last_page_has_no_next() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
            json!([{"id": "o5", "total": 1.0}]),
            3,
            3,
            5,
        )))
        .mount(&server)
        .await;

    let page: Page<Order> = source_for(&server)
        .fetch("/orders", &Query::new(2).with_page(3))
        .await
        .unwrap();

    assert!(!page.has_next);
    assert_eq!(page.cursor, None);
}

#[tokio::test]
async fn test_range_filter_sent_as_where_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("whereJson", r#"{"total":{"gte":10,"lte":50}}"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]), 1, 0, 0)))
        .expect(1)
        .mount(&server)
        .await;

    let query = Query::new(10).with_filters(Filters::new().range(
        "total",
        Some(json!(10)),
        Some(json!(50)),
    ));
    let page: Page<Order> = source_for(&server).fetch("/orders", &query).await.unwrap();

    assert!(page.is_empty());
    assert!(!page.has_next);
}

#[tokio::test]
async fn test_concurrent_identical_fetches_issue_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!([{"id": "o1", "total": 2.0}]), 1, 1, 1))
                .set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let source = source_for(&server);
    let query = Query::new(2).with_sort("total");

    let (a, b) = tokio::join!(
        source.fetch::<Order>("/orders", &query),
        source.fetch::<Order>("/orders", &query)
    );

    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(source.fetch_count(), 1);
    server.verify().await;
}

#[tokio::test]
async fn test_http_error_surfaces_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let err = source_for(&server)
        .fetch::<Order>("/orders", &Query::default())
        .await
        .unwrap_err();

    assert!(err.is_network());
    assert_eq!(err.status(), Some(500));
    server.verify().await;
}

#[tokio::test]
async fn test_opt_in_retry_policy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([]), 1, 0, 0)))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(HttpClientConfig::builder().base_url(server.uri()).build());
    let retry = RetryPolicy::new(1).backoff(
        BackoffType::Constant,
        Duration::from_millis(5),
        Duration::from_millis(5),
    );
    let source = RestPageSource::with_cache(Arc::new(client), CacheConfig::default().with_retry(retry));

    let page: Page<Order> = source.fetch("/orders", &Query::default()).await.unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn test_invalid_query_fails_before_network() {
    let server = MockServer::start().await;
    let err = source_for(&server)
        .fetch::<Order>("/orders", &Query::new(0))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::QueryConstruction { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_envelope_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": []})))
        .mount(&server)
        .await;

    let result = source_for(&server)
        .fetch::<Order>("/orders", &Query::default())
        .await;
    assert!(result.is_err());
}
