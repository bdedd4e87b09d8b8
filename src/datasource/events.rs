//! High-frequency ingestion through the events API

use super::encode::{gzip, to_ndjson};
use crate::error::Result;
use crate::http::HttpClient;
use crate::sink::{AppendResponse, Sink};
use crate::types::{AppendFormat, JsonValue};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Sends NDJSON batches to `/v0/events?name=<datasource>`
#[derive(Debug, Clone)]
pub struct EventsSink {
    name: String,
    wait: bool,
    compress: bool,
    client: Arc<HttpClient>,
}

impl EventsSink {
    /// API endpoint of the events API
    pub const ENDPOINT: &'static str = "/v0/events";

    /// Create a sink for the datasource `name`
    pub fn new(name: impl Into<String>, client: Arc<HttpClient>) -> Self {
        Self {
            name: name.into(),
            wait: false,
            compress: false,
            client,
        }
    }

    /// Wait until the write is acknowledged by the database
    #[must_use]
    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    /// Whether writes wait for acknowledgement
    pub fn waits(&self) -> bool {
        self.wait
    }

    /// Gzip request bodies (`Content-Encoding: gzip`)
    #[must_use]
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

#[async_trait]
impl Sink<JsonValue> for EventsSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn append(&self, batch: &[JsonValue]) -> Result<AppendResponse> {
        let body = to_ndjson(batch)?;

        let mut query = vec![("name", self.name.clone())];
        if self.wait {
            query.push(("wait", "true".to_string()));
        }

        debug!(
            records = batch.len(),
            name = %self.name,
            compress = self.compress,
            "sending ndjson events"
        );
        let content_type = AppendFormat::Ndjson.content_type();
        if self.compress {
            let body = gzip(body.as_bytes())?;
            self.client
                .post_encoded(Self::ENDPOINT, &query, content_type, "gzip", body)
                .await
        } else {
            self.client
                .post(Self::ENDPOINT, &query, content_type, body)
                .await
        }
    }
}
