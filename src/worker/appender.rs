//! Queuing batch appender
//!
//! Drains a [`RecordQueue`] in batches and appends them to a [`Sink`],
//! backing off while the sink is rate limiting. Delivery is at most once:
//! batches the sink rejects, or that fail unexpectedly, are dropped (and
//! handed to the optional [`DeadLetter`] hook).

use super::types::{DeadLetter, Delivery, DropReason, RateLimitOutcome, WorkerState};
use crate::config::AppenderConfig;
use crate::error::Result;
use crate::queue::{Item, RecordQueue};
use crate::sink::{AppendResponse, Sink};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// What the queue handed us
enum Collected<R> {
    Batch(Vec<R>),
    /// Stop marker seen, with whatever was collected before it
    Stop(Vec<R>),
}

/// Moves records from a queue to a sink in batches
///
/// The appender does not spawn anything itself. Hand [`run`](Self::run) to a
/// task and call [`close`](Self::close) from anywhere to stop it:
///
/// ```rust,ignore
/// let appender = Arc::new(QueuingAppender::new(queue.clone(), datasource, config));
/// let handle = tokio::spawn({
///     let appender = appender.clone();
///     async move { appender.run().await }
/// });
/// queue.put(record).await;
/// appender.close();
/// handle.await?;
/// ```
///
/// Only one `run` may be active per appender.
pub struct QueuingAppender<R, S: ?Sized> {
    source: Arc<RecordQueue<R>>,
    destination: Arc<S>,
    config: AppenderConfig,
    state: watch::Sender<WorkerState>,
    /// Set by [`close`](Self::close); cuts the shutdown flush's backoff short
    closed: watch::Sender<bool>,
    drain_requested: AtomicBool,
    dead_letter: Option<Arc<dyn DeadLetter<R>>>,
}

impl<R, S> QueuingAppender<R, S>
where
    R: Send + Sync + 'static,
    S: Sink<R> + ?Sized,
{
    /// Create an appender draining `source` into `destination`
    pub fn new(source: Arc<RecordQueue<R>>, destination: Arc<S>, config: AppenderConfig) -> Self {
        let (state, _) = watch::channel(WorkerState::Running);
        let (closed, _) = watch::channel(false);
        Self {
            source,
            destination,
            config,
            state,
            closed,
            drain_requested: AtomicBool::new(false),
            dead_letter: None,
        }
    }

    /// Install a hook receiving every dropped batch
    #[must_use]
    pub fn with_dead_letter(mut self, hook: impl DeadLetter<R> + 'static) -> Self {
        self.dead_letter = Some(Arc::new(hook));
        self
    }

    /// Active configuration
    pub fn config(&self) -> &AppenderConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Whether `run` has returned
    pub fn is_stopped(&self) -> bool {
        self.state() == WorkerState::Stopped
    }

    /// Watch lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Wait until `run` has returned
    pub async fn wait_stopped(&self) {
        let mut state = self.subscribe();
        loop {
            let stopped = *state.borrow_and_update() == WorkerState::Stopped;
            if stopped || state.changed().await.is_err() {
                return;
            }
        }
    }

    /// Request shutdown. Idempotent and non-blocking.
    ///
    /// Wakes the worker wherever it waits, including the backoff of a
    /// shutdown flush already in progress. Records still queued when the
    /// worker notices are not appended, except the batch it is collecting.
    pub fn close(&self) {
        self.closed.send_if_modified(|closed| !std::mem::replace(closed, true));
        if self.begin_stopping() {
            debug!(sink = self.destination.name(), "stop requested");
            self.source.put_stop();
        }
    }

    /// Request shutdown once everything queued so far has been appended
    ///
    /// The last batch still gets its rate-limit backoff unless
    /// [`close`](Self::close) is called as well. Idempotent.
    pub fn close_after_drain(&self) {
        if self.state() == WorkerState::Running
            && !self.drain_requested.swap(true, Ordering::AcqRel)
        {
            debug!(sink = self.destination.name(), "stop after drain requested");
            self.source.put_stop();
        }
    }

    /// Worker loop; returns once stopped
    pub async fn run(&self) {
        info!(sink = self.destination.name(), "starting queuing appender");

        while self.state() == WorkerState::Running {
            match self.next_batch().await {
                Collected::Batch(batch) => self.process(batch).await,
                Collected::Stop(partial) => {
                    self.begin_stopping();
                    info!(
                        records = partial.len(),
                        "indicated worker shutdown, trying to flush batch"
                    );
                    if !partial.is_empty() {
                        self.flush(partial).await;
                    }
                    break;
                }
            }
        }

        info!(
            remaining = self.source.len(),
            sink = self.destination.name(),
            "shutting down queuing appender"
        );
        self.state.send_replace(WorkerState::Stopped);
    }

    fn begin_stopping(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == WorkerState::Running {
                *state = WorkerState::Stopping;
                true
            } else {
                false
            }
        })
    }

    /// Block for the first record, then take what is already queued
    async fn next_batch(&self) -> Collected<R> {
        let first = match self.source.get().await {
            Item::Record(record) => record,
            Item::Stop => return Collected::Stop(Vec::new()),
        };

        let mut extra = self.source.len();
        if let Some(max) = self.config.max_batch_size {
            extra = extra.min(max.saturating_sub(1));
        }

        let mut batch = Vec::with_capacity(extra + 1);
        batch.push(first);
        for _ in 0..extra {
            match self.source.try_get() {
                Some(Item::Record(record)) => batch.push(record),
                Some(Item::Stop) => return Collected::Stop(batch),
                None => break,
            }
        }

        Collected::Batch(batch)
    }

    async fn process(&self, batch: Vec<R>) {
        let started = Instant::now();
        debug!(
            size = batch.len(),
            sink = self.destination.name(),
            "processing batch"
        );

        let budget = self.config.max_retries_per_batch;
        let (delivery, rate_limit) = match self.attempt(&batch, budget, true).await {
            Ok(result) => result,
            Err(reason) => {
                self.drop_batch(batch, reason);
                return;
            }
        };

        match delivery {
            Delivery::Delivered => {}
            Delivery::Dropped(reason) => self.drop_batch(batch, reason),
            Delivery::Interrupted => {
                info!(size = batch.len(), "stop requested while rate limited, flushing batch");
                self.flush(batch).await;
                return;
            }
        }

        debug!(
            duration_secs = started.elapsed().as_secs_f64(),
            "processing batch finished"
        );

        if rate_limit.retried {
            info!(
                wait_secs = rate_limit.wait.as_secs_f64(),
                "waiting until rate-limit window resets before batching again"
            );
            self.pause(rate_limit.wait).await;
        } else if !self.config.min_interval.is_zero() {
            self.pause(self.config.min_interval).await;
        }
    }

    /// Last attempts for a batch salvaged at shutdown
    ///
    /// Backs off on 429 like a regular batch until `close()` is called, then
    /// retries without waiting.
    async fn flush(&self, batch: Vec<R>) {
        let budget = self.config.shutdown_max_retries;
        match self.attempt(&batch, budget, false).await {
            Ok((Delivery::Delivered, _)) => {
                info!(size = batch.len(), "flushed batch on shutdown");
            }
            Ok((Delivery::Dropped(reason), _)) | Err(reason) => self.drop_batch(batch, reason),
            Ok((Delivery::Interrupted, _)) => {
                self.drop_batch(batch, DropReason::RetriesExhausted { attempts: budget });
            }
        }
    }

    /// Run the retry loop, turning errors and panics into a drop reason
    async fn attempt(
        &self,
        batch: &[R],
        max_retries: u32,
        interruptible: bool,
    ) -> std::result::Result<(Delivery, RateLimitOutcome), DropReason> {
        let outcome = AssertUnwindSafe(self.retry_batch(batch, max_retries, interruptible))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                error!(
                    error = %e,
                    size = batch.len(),
                    "exception while processing batch, events will be dropped"
                );
                Err(DropReason::Failed(e.to_string()))
            }
            Err(_) => {
                error!(
                    size = batch.len(),
                    "append panicked while processing batch, events will be dropped"
                );
                Err(DropReason::Panicked)
            }
        }
    }

    /// Append, retrying only while rate limited
    async fn retry_batch(
        &self,
        batch: &[R],
        max_retries: u32,
        interruptible: bool,
    ) -> Result<(Delivery, RateLimitOutcome)> {
        let mut limited = false;
        let mut last = AppendResponse::default();

        for attempt in 1..=max_retries {
            let response = self.destination.append(batch).await?;

            if response.is_success() {
                let outcome = self.rate_limit_outcome(limited, &response);
                return Ok((Delivery::Delivered, outcome));
            }

            if !response.is_rate_limited() {
                let outcome = self.rate_limit_outcome(limited, &response);
                let reason = DropReason::Rejected {
                    status: response.status,
                    text: response.text,
                };
                return Ok((Delivery::Dropped(reason), outcome));
            }

            limited = true;
            if attempt < max_retries {
                let wait = self.retry_wait(&response);
                debug!(
                    records = batch.len(),
                    attempt,
                    wait_secs = wait.as_secs_f64(),
                    text = %response.text,
                    "rate limited by API, keeping records safe"
                );
                if interruptible {
                    if !self.pause(wait).await {
                        return Ok((Delivery::Interrupted, RateLimitOutcome::default()));
                    }
                } else {
                    self.flush_pause(wait).await;
                }
            }
            last = response;
        }

        let outcome = self.rate_limit_outcome(limited, &last);
        let reason = DropReason::RetriesExhausted {
            attempts: max_retries,
        };
        Ok((Delivery::Dropped(reason), outcome))
    }

    /// Wait before retrying a rate-limited append
    pub(crate) fn retry_wait(&self, response: &AppendResponse) -> Duration {
        let Some(value) = response.retry_after().map(str::trim).filter(|v| !v.is_empty()) else {
            return self.config.default_retry_after;
        };

        match parse_seconds(value) {
            Some(hint) => hint + self.config.retry_after_margin,
            None => {
                error!(value, "error while parsing Retry-After value");
                self.config.default_retry_after
            }
        }
    }

    /// Pause owed after a batch, given whether it was rate limited
    pub(crate) fn rate_limit_outcome(&self, retried: bool, last: &AppendResponse) -> RateLimitOutcome {
        if !retried {
            return RateLimitOutcome::default();
        }

        let wait = if self.config.wait_after_rate_limit.is_zero() {
            match last.ratelimit_reset().map(str::trim) {
                None | Some("") => Duration::ZERO,
                Some(value) => parse_seconds(value).unwrap_or_else(|| {
                    error!(value, "error while parsing X-Ratelimit-Reset value");
                    Duration::ZERO
                }),
            }
        } else {
            self.config.wait_after_rate_limit
        };

        RateLimitOutcome {
            retried: true,
            wait,
        }
    }

    fn drop_batch(&self, batch: Vec<R>, reason: DropReason) {
        warn!(
            size = batch.len(),
            sink = self.destination.name(),
            reason = %reason,
            "dropping batch"
        );
        if let Some(hook) = &self.dead_letter {
            hook.dropped(batch, &reason);
        }
    }

    /// Sleep unless a stop is requested first; `false` if interrupted
    async fn pause(&self, duration: Duration) -> bool {
        if self.state() != WorkerState::Running {
            return false;
        }
        if duration.is_zero() {
            return true;
        }

        tokio::select! {
            () = tokio::time::sleep(duration) => true,
            () = wait_until(self.subscribe(), |state| *state != WorkerState::Running) => false,
        }
    }

    /// Sleep unless `close()` is called first
    async fn flush_pause(&self, duration: Duration) {
        let closed = *self.closed.borrow();
        if closed || duration.is_zero() {
            return;
        }

        tokio::select! {
            () = tokio::time::sleep(duration) => {}
            () = wait_until(self.closed.subscribe(), |closed| *closed) => {
                debug!("close requested, retrying flush without waiting");
            }
        }
    }
}

impl<R, S: ?Sized> std::fmt::Debug for QueuingAppender<R, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuingAppender")
            .field("state", &*self.state.borrow())
            .field("closed", &*self.closed.borrow())
            .field("queued", &self.source.len())
            .field("config", &self.config)
            .field("has_dead_letter", &self.dead_letter.is_some())
            .finish_non_exhaustive()
    }
}

/// Resolves once `done` holds for the watched value, or the sender is gone
async fn wait_until<T>(mut rx: watch::Receiver<T>, done: impl Fn(&T) -> bool) {
    loop {
        let reached = done(&rx.borrow_and_update());
        if reached || rx.changed().await.is_err() {
            return;
        }
    }
}

fn parse_seconds(value: &str) -> Option<Duration> {
    value
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}
