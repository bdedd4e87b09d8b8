//! CLI module
//!
//! Command-line interface for streaming records into datasources.
//!
//! # Commands
//!
//! - `append` - Append CSV or NDJSON lines to a datasource (or a local file)
//! - `events` - Send NDJSON lines to the events API
//! - `config` - Print the effective configuration

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::{parse_csv_line, parse_json_line, pump, PumpSummary, Runner};
