//! Worker state and outcome types

use std::time::Duration;

/// Lifecycle of a queuing appender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    /// Moving batches from the queue to the sink
    #[default]
    Running,
    /// Stop requested; at most the salvaged batch is still being flushed
    Stopping,
    /// `run` has returned
    Stopped,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerState::Running => "running",
            WorkerState::Stopping => "stopping",
            WorkerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Rate-limit summary of one batch, used for the pause before the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitOutcome {
    /// Whether the batch was retried because of rate limiting
    pub retried: bool,
    /// Pause to apply before the next batch
    pub wait: Duration,
}

/// Why a batch did not reach the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The sink answered with a non rate-limit error
    Rejected { status: u16, text: String },
    /// Still rate limited after all attempts
    RetriesExhausted { attempts: u32 },
    /// The append call itself failed
    Failed(String),
    /// The append call panicked
    Panicked,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::Rejected { status, text } => write!(f, "rejected with {status}: {text}"),
            DropReason::RetriesExhausted { attempts } => {
                write!(f, "still rate limited after {attempts} attempts")
            }
            DropReason::Failed(message) => write!(f, "append failed: {message}"),
            DropReason::Panicked => f.write_str("append panicked"),
        }
    }
}

/// Receives batches the appender gives up on
///
/// Without a hook, dropped batches are only logged.
pub trait DeadLetter<R>: Send + Sync {
    /// Called once per dropped batch, from the worker task
    fn dropped(&self, batch: Vec<R>, reason: &DropReason);
}

impl<R, F> DeadLetter<R> for F
where
    F: Fn(Vec<R>, &DropReason) + Send + Sync,
{
    fn dropped(&self, batch: Vec<R>, reason: &DropReason) {
        self(batch, reason);
    }
}

/// Result of trying to append one batch
#[derive(Debug)]
pub(crate) enum Delivery {
    Delivered,
    Dropped(DropReason),
    /// A stop request cut a rate-limit backoff short
    Interrupted,
}
