// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Verdin
//!
//! Stream records into Tinybird datasources without tripping the API's
//! rate limits.
//!
//! Producers push records onto a [`RecordQueue`]; a [`QueuingAppender`]
//! drains it in batches and appends each batch to a [`Sink`], waiting out
//! `429 Too Many Requests` answers and pacing itself between batches.
//!
//! ## Features
//!
//! - **Batching**: every record already waiting in the queue goes out together
//! - **Rate-limit aware**: honors `Retry-After` and `X-Ratelimit-Reset`
//! - **Graceful shutdown**: `close()` interrupts any wait and flushes the batch in hand
//! - **Sinks**: datasource append API (CSV / NDJSON), events API, local CSV files
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use verdin::{AppenderConfig, Datasource, QueuingAppender, RecordQueue};
//! use verdin::http::HttpClient;
//!
//! #[tokio::main]
//! async fn main() -> verdin::Result<()> {
//!     let config = verdin::Config::default().with_env();
//!     let client = Arc::new(HttpClient::from_config(&config)?);
//!     let datasource = Arc::new(Datasource::new("page_views", client));
//!
//!     let queue = Arc::new(RecordQueue::new());
//!     let appender = Arc::new(QueuingAppender::new(
//!         queue.clone(),
//!         datasource,
//!         AppenderConfig::default(),
//!     ));
//!     let worker = tokio::spawn({
//!         let appender = appender.clone();
//!         async move { appender.run().await }
//!     });
//!
//!     queue.put(vec!["2024-01-01 00:00:00".to_string(), "/home".to_string()]).await;
//!
//!     appender.close();
//!     worker.await.ok();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!  producers ──put──▶ RecordQueue ──get──▶ QueuingAppender ──append──▶ Sink
//!                          ▲                    │    ▲                  │
//!                          └──── stop marker ───┘    └─ AppendResponse ─┘
//!
//! ┌──────────────┬──────────────────┬──────────────────────────────────┐
//! │    Queue     │      Worker      │              Sinks               │
//! ├──────────────┼──────────────────┼──────────────────────────────────┤
//! │ FIFO         │ Batch collection │ Datasource  (/v0/datasources)    │
//! │ Bounded      │ 429 retry        │ EventsSink  (/v0/events)         │
//! │ Stop marker  │ Pacing           │ FileDatasource (local CSV)       │
//! │              │ Shutdown flush   │                                  │
//! └──────────────┴──────────────────┴──────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Configuration
pub mod config;

/// Record queue feeding the appender
pub mod queue;

/// Append destinations
pub mod sink;

/// HTTP client with rate limiting
pub mod http;

/// Tinybird datasources and their encoders
pub mod datasource;

/// Queuing batch appender
pub mod worker;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::{AppenderConfig, Config, HttpConfig};
pub use datasource::{Datasource, EventsSink, FileDatasource};
pub use queue::{Item, RecordQueue};
pub use sink::{AppendResponse, Sink};
pub use worker::{DeadLetter, DropReason, QueuingAppender, WorkerState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
