//! HTTP client module
//!
//! Provides the HTTP client the datasource sinks are built on.
//!
//! # Features
//!
//! - **Single-shot requests**: every status is returned to the caller, retries
//!   are handled by the queuing appender
//! - **Rate Limiting**: Token bucket rate limiter using governor, shareable
//!   between clients
//! - **Authentication**: Bearer token from the configuration

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
