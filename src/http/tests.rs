//! Tests for the HTTP client module

use super::*;
use crate::error::Error;
use crate::query::RequestParams;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::with_config(HttpClientConfig::builder().base_url(server.uri()).build())
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert!(config.base_url.is_none());
    assert!(config.rate_limit.is_none());
    assert!(config.user_agent.starts_with("pagewise/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://api.example.com")
        .timeout(Duration::from_secs(5))
        .header("X-Tenant", "acme")
        .rate_limit(RateLimiterConfig::new(5, 5))
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.base_url, Some("https://api.example.com".to_string()));
    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(config.default_headers.get("X-Tenant"), Some(&"acme".to_string()));
    assert_eq!(config.rate_limit, Some(RateLimiterConfig::new(5, 5)));
    assert_eq!(config.user_agent, "test-agent/1.0");
    assert!(HttpClient::with_config(config).has_rate_limiter());
}

#[test]
fn test_build_url_joins_and_encodes() {
    let client = HttpClient::with_config(
        HttpClientConfig::builder()
            .base_url("https://api.example.com/v1/")
            .build(),
    );
    let mut params = RequestParams::new();
    params.push("page", "2");
    params.push("whereJson", r#"{"a":1}"#);

    let url = client.build_url("/products", &params).unwrap();
    assert_eq!(
        url.as_str(),
        "https://api.example.com/v1/products?page=2&whereJson=%7B%22a%22%3A1%7D"
    );
}

#[test]
fn test_build_url_absolute_path_and_invalid() {
    let client = HttpClient::new();
    let url = client
        .build_url("https://other.example.com/x", &RequestParams::new())
        .unwrap();
    assert_eq!(url.as_str(), "https://other.example.com/x");

    let err = client.build_url("relative/only", &RequestParams::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidUrl(_)));
}

#[tokio::test]
async fn test_get_json_with_params_and_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("page", "3"))
        .and(header("X-Tenant", "acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let client = HttpClient::with_config(
        HttpClientConfig::builder()
            .base_url(server.uri())
            .header("X-Tenant", "acme")
            .build(),
    );
    let mut params = RequestParams::new();
    params.push("page", "3");

    let body: serde_json::Value = client.get_json("/orders", &params).await.unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_non_2xx_surfaces_status_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get("/orders", &RequestParams::new()).await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert!(err.is_network());
    assert_eq!(err.to_string(), "HTTP 503: down");
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let client = HttpClient::with_config(
        HttpClientConfig::builder()
            .base_url("http://127.0.0.1:9")
            .timeout(Duration::from_secs(2))
            .build(),
    );
    let err = client.get("/x", &RequestParams::new()).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));
    assert!(err.is_network());
}

#[test]
fn test_http_client_debug() {
    let debug = format!("{:?}", HttpClient::new());
    assert!(debug.contains("HttpClient"));
    assert!(debug.contains("has_rate_limiter"));
}
