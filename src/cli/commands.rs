//! CLI commands and argument parsing

use crate::types::{AppendFormat, LogLevel};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Append records to Tinybird datasources
#[derive(Parser, Debug)]
#[command(name = "verdin")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API host (overrides config and TB_HOST)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Access token (overrides config and TB_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Minimum seconds between batches
    #[arg(long, global = true)]
    pub min_interval: Option<f64>,

    /// Log level
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Verbose output (same as --log-level debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Effective log level
    pub fn log_level(&self) -> LogLevel {
        match (self.verbose, self.log_level) {
            (true, _) => LogLevel::Debug,
            (false, Some(level)) => level,
            (false, None) => LogLevel::Info,
        }
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Append records to a datasource
    Append {
        /// Datasource name
        #[arg(short, long)]
        datasource: String,

        /// Datasource version
        #[arg(long)]
        version: Option<u32>,

        /// Input format (one record per line)
        #[arg(short, long, default_value = "csv")]
        format: AppendFormat,

        /// CSV delimiter
        #[arg(long, default_value = ",")]
        delimiter: char,

        /// Input file (defaults to stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Append to a local CSV file instead of the API
        #[arg(long)]
        output_file: Option<PathBuf>,
    },

    /// Send NDJSON records to the events API
    Events {
        /// Target datasource name
        #[arg(short, long)]
        name: String,

        /// Wait for the write to be acknowledged
        #[arg(long)]
        wait: bool,

        /// Gzip request bodies
        #[arg(long)]
        compress: bool,

        /// Input file (defaults to stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}
