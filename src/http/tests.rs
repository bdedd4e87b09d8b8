//! Tests for the HTTP client module

use super::*;
use crate::config::Config;
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.base_url, "https://api.tinybird.co");
    assert!(config.token.is_none());
    assert!(config.rate_limit.is_none());
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("http://localhost:7181")
        .token("p.secret")
        .timeout(Duration::from_secs(60))
        .rate_limit(RateLimiterConfig::new(5, 5))
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.base_url, "http://localhost:7181");
    assert_eq!(config.token.as_deref(), Some("p.secret"));
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.rate_limit, Some(RateLimiterConfig::new(5, 5)));
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[test]
fn test_http_client_config_from_config() {
    let mut config = Config::default();
    config.host = "http://tb.local".to_string();
    config.token = Some("abc".to_string());
    config.http.requests_per_second = Some(4);

    let http = HttpClientConfig::from_config(&config);
    assert_eq!(http.base_url, "http://tb.local");
    assert_eq!(http.token.as_deref(), Some("abc"));
    assert_eq!(http.rate_limit, Some(RateLimiterConfig::new(4, 4)));

    assert!(HttpClient::with_config(http).is_ok());
}

#[tokio::test]
async fn test_post_sends_body_query_and_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v0/datasources"))
        .and(query_param("name", "events"))
        .and(query_param("mode", "append"))
        .and(header("Authorization", "Bearer p.token"))
        .and(header("Content-Type", "text/csv; charset=utf-8"))
        .and(body_string("a,1\n"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .token("p.token")
        .build();
    let client = HttpClient::with_config(config).unwrap();

    let response = client
        .post(
            "/v0/datasources",
            &[("name", "events".to_string()), ("mode", "append".to_string())],
            "text/csv; charset=utf-8",
            "a,1\n",
        )
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.text, "{}");
}

#[tokio::test]
async fn test_post_returns_rate_limited_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v0/events"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "7")
                .insert_header("X-Ratelimit-Reset", "30")
                .set_body_string("rate limited"),
        )
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .build();
    let client = HttpClient::with_config(config).unwrap();

    let response = client
        .post("v0/events", &[], "application/x-ndjson", "{}")
        .await
        .unwrap();

    assert!(response.is_rate_limited());
    assert_eq!(response.retry_after(), Some("7"));
    assert_eq!(response.ratelimit_reset(), Some("30"));
    assert_eq!(response.text, "rate limited");
}

#[tokio::test]
async fn test_post_returns_server_errors_without_retrying() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .build();
    let client = HttpClient::with_config(config).unwrap();

    let response = client
        .post("/v0/datasources", &[], "text/csv", "")
        .await
        .unwrap();

    assert_eq!(response.status, 500);
    assert_eq!(response.text, "boom");
}

#[tokio::test]
async fn test_post_connection_error() {
    let config = HttpClientConfig::builder()
        .base_url("http://127.0.0.1:1")
        .timeout(Duration::from_secs(2))
        .build();
    let client = HttpClient::with_config(config).unwrap();

    let result = client.post("/v0/events", &[], "text/plain", "").await;
    assert!(matches!(result, Err(crate::Error::Http(_))));
}

#[tokio::test]
async fn test_shared_rate_limiter_throttles_both_clients() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v0/events"))
        .respond_with(ResponseTemplate::new(202))
        .expect(2)
        .mount(&mock_server)
        .await;

    let limiter = RateLimiter::new(&RateLimiterConfig::new(1, 1));
    let config = HttpClientConfig::builder()
        .base_url(mock_server.uri())
        .build();
    let first = HttpClient::with_config(config.clone())
        .unwrap()
        .with_rate_limiter(limiter.clone());
    let second = HttpClient::with_config(config)
        .unwrap()
        .with_rate_limiter(limiter.clone());

    let started = std::time::Instant::now();
    first.post("/v0/events", &[], "text/plain", "").await.unwrap();
    second.post("/v0/events", &[], "text/plain", "").await.unwrap();

    // the second request had to wait for the shared bucket to refill
    assert!(started.elapsed() >= Duration::from_millis(800));
    assert!(!limiter.try_acquire());
}
