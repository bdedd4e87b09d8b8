//! Datasource appends through the HTTP API

use super::encode::{to_csv, to_ndjson};
use crate::error::Result;
use crate::http::HttpClient;
use crate::sink::{AppendResponse, Sink};
use crate::types::{AppendFormat, CsvRow, JsonValue};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// A Tinybird datasource
#[derive(Debug, Clone)]
pub struct Datasource {
    name: String,
    version: Option<u32>,
    delimiter: u8,
    client: Arc<HttpClient>,
}

impl Datasource {
    /// API endpoint for datasource operations
    pub const ENDPOINT: &'static str = "/v0/datasources";

    /// Create a handle to the datasource `name`
    pub fn new(name: impl Into<String>, client: Arc<HttpClient>) -> Self {
        Self {
            name: name.into(),
            version: None,
            delimiter: b',',
            client,
        }
    }

    /// Target a specific datasource version
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// Delimiter used when appending CSV through [`Sink`]
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Name without version suffix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Datasource version, if any
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    /// Name as known to the API, e.g. `events__v2`
    pub fn canonical_name(&self) -> String {
        match self.version {
            Some(version) => format!("{}__v{version}", self.name),
            None => self.name.clone(),
        }
    }

    /// Append CSV rows
    pub async fn append_csv<S: AsRef<str>>(
        &self,
        rows: &[Vec<S>],
        delimiter: u8,
    ) -> Result<AppendResponse> {
        let body = to_csv(rows, delimiter)?;
        let mut query = self.query(AppendFormat::Csv);
        query.push(("dialect_delimiter", char::from(delimiter).to_string()));

        debug!(
            records = rows.len(),
            datasource = %self,
            "appending csv records"
        );
        self.client
            .post(
                Self::ENDPOINT,
                &query,
                AppendFormat::Csv.content_type(),
                body,
            )
            .await
    }

    /// Append JSON documents as NDJSON
    pub async fn append_ndjson<T: Serialize + Sync>(&self, records: &[T]) -> Result<AppendResponse> {
        let body = to_ndjson(records)?;
        let query = self.query(AppendFormat::Ndjson);

        debug!(
            records = records.len(),
            datasource = %self,
            "appending ndjson records"
        );
        self.client
            .post(
                Self::ENDPOINT,
                &query,
                AppendFormat::Ndjson.content_type(),
                body,
            )
            .await
    }

    fn query(&self, format: AppendFormat) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.canonical_name()),
            ("mode", "append".to_string()),
            ("format", format.as_str().to_string()),
        ]
    }
}

impl std::fmt::Display for Datasource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Datasource({})", self.canonical_name())
    }
}

#[async_trait]
impl Sink<CsvRow> for Datasource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn append(&self, batch: &[CsvRow]) -> Result<AppendResponse> {
        self.append_csv(batch, self.delimiter).await
    }
}

#[async_trait]
impl Sink<JsonValue> for Datasource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn append(&self, batch: &[JsonValue]) -> Result<AppendResponse> {
        self.append_ndjson(batch).await
    }
}
