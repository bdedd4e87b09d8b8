//! Worker module
//!
//! The queuing batch appender and its lifecycle types.
//!
//! # Behaviour
//!
//! - **Batching**: waits for one record, then takes everything already queued
//! - **Rate limiting**: retries the same batch after `Retry-After` (+ margin)
//! - **Pacing**: `min_interval` between batches, a longer pause after a
//!   rate-limited batch
//! - **Shutdown**: `close()` interrupts every wait; a batch cut short by the
//!   stop marker gets a final, short-budget flush

mod appender;
mod types;

pub use appender::QueuingAppender;
pub use types::{DeadLetter, DropReason, RateLimitOutcome, WorkerState};
