//! Sink module
//!
//! The destination side of the queuing appender: anything that can take an
//! ordered batch of records and report back an HTTP-like outcome.

mod response;

pub use response::{AppendResponse, RATELIMIT_RESET_HEADER, RETRY_AFTER_HEADER};

use crate::error::Result;
use async_trait::async_trait;

/// A destination records are appended to in batches
#[async_trait]
pub trait Sink<R>: Send + Sync {
    /// Name used in log output
    fn name(&self) -> &str;

    /// Append one batch. Non-2xx outcomes are reported through the
    /// returned response; `Err` is reserved for failures to talk to the
    /// sink at all.
    async fn append(&self, batch: &[R]) -> Result<AppendResponse>;
}
