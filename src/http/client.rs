//! HTTP client for the Tinybird API
//!
//! Provides a thin client that handles:
//! - Base URL resolution and bearer authentication
//! - Optional client-side throttling shared between clients
//! - Conversion of every HTTP outcome (including 4xx/5xx) into an
//!   [`AppendResponse`], leaving retry decisions to the caller

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::config::{Config, HttpConfig, DEFAULT_HOST};
use crate::error::Result;
use crate::sink::AppendResponse;
use crate::types::StringMap;
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// API host all paths are resolved against
    pub base_url: String,
    /// Bearer token
    pub token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_HOST.to_string(),
            token: None,
            timeout: Duration::from_secs(30),
            rate_limit: None,
            user_agent: format!("verdin/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }

    /// Derive the client config from a loaded [`Config`]
    pub fn from_config(config: &Config) -> Self {
        let HttpConfig {
            timeout,
            requests_per_second,
            burst_size,
            user_agent,
        } = &config.http;

        Self {
            base_url: config.host.clone(),
            token: config.token.clone(),
            timeout: *timeout,
            rate_limit: requests_per_second
                .map(|rps| RateLimiterConfig::new(rps, burst_size.unwrap_or(rps))),
            user_agent: user_agent.clone(),
        }
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the bearer token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// HTTP client with authentication and optional throttling
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Create a client for the given [`Config`]
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_config(HttpClientConfig::from_config(config))
    }

    /// Replace the rate limiter, e.g. with one shared by several clients
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// POST a body and return whatever the server answered
    pub async fn post(
        &self,
        path: &str,
        query: &[(&str, String)],
        content_type: &str,
        body: impl Into<reqwest::Body>,
    ) -> Result<AppendResponse> {
        self.send(path, query, content_type, None, body.into()).await
    }

    /// Like [`post`](Self::post), for a body already encoded with `content_encoding`
    pub async fn post_encoded(
        &self,
        path: &str,
        query: &[(&str, String)],
        content_type: &str,
        content_encoding: &str,
        body: impl Into<reqwest::Body>,
    ) -> Result<AppendResponse> {
        self.send(path, query, content_type, Some(content_encoding), body.into())
            .await
    }

    async fn send(
        &self,
        path: &str,
        query: &[(&str, String)],
        content_type: &str,
        content_encoding: Option<&str>,
        body: reqwest::Body,
    ) -> Result<AppendResponse> {
        let url = self.build_url(path, query)?;

        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let mut req = self.client.post(url.clone());

        if let Some(ref token) = self.config.token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(encoding) = content_encoding {
            req = req.header(CONTENT_ENCODING, encoding);
        }

        let response = req
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        let converted = into_append_response(response).await?;
        debug!(url = %url, status = converted.status, "POST finished");
        Ok(converted)
    }

    /// Build full URL from path and query parameters
    fn build_url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{base}/{path}"))?;

        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        Ok(url)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.config.base_url)
            .field("has_token", &self.config.token.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Collect status, headers and body of a response
async fn into_append_response(response: Response) -> Result<AppendResponse> {
    let status = response.status().as_u16();
    let headers: StringMap = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let text = response.text().await?;

    Ok(AppendResponse {
        status,
        headers,
        text,
    })
}
