//! Common types used throughout verdin
//!
//! This module contains shared type definitions and type aliases
//! used across multiple modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

/// A single CSV row as appended to a datasource
pub type CsvRow = Vec<String>;

// ============================================================================
// Append Format
// ============================================================================

/// Wire format used when appending records to a datasource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AppendFormat {
    /// Comma (or custom delimiter) separated values
    #[default]
    Csv,
    /// Newline-delimited JSON documents
    Ndjson,
}

impl AppendFormat {
    /// Value of the `format` query parameter
    pub fn as_str(self) -> &'static str {
        match self {
            AppendFormat::Csv => "csv",
            AppendFormat::Ndjson => "ndjson",
        }
    }

    /// Content type of the request body
    pub fn content_type(self) -> &'static str {
        match self {
            AppendFormat::Csv => "text/csv; charset=utf-8",
            AppendFormat::Ndjson => "application/x-ndjson; charset=utf-8",
        }
    }
}

// ============================================================================
// Log Level
// ============================================================================

/// Log level for the command-line tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
