//! FIFO queue with blocking and non-blocking access

use super::types::Item;
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Multi-producer queue drained by a queuing appender
///
/// Order is FIFO as observed under the internal lock. The lock is never held
/// across an await point.
pub struct RecordQueue<R> {
    items: Mutex<VecDeque<Item<R>>>,
    capacity: Option<usize>,
    readable: Notify,
    writable: Notify,
}

impl<R> RecordQueue<R> {
    /// Create an unbounded queue
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            capacity: None,
            readable: Notify::new(),
            writable: Notify::new(),
        }
    }

    /// Create a queue holding at most `capacity` items
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::new()
        }
    }

    /// Maximum number of items, if bounded
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Enqueue a record, waiting for space if the queue is bounded and full
    pub async fn put(&self, record: R) {
        let mut item = Item::Record(record);
        loop {
            match self.try_push(item) {
                Ok(()) => return,
                Err(rejected) => item = rejected,
            }
            self.writable.notified().await;
        }
    }

    /// Enqueue a record without waiting
    pub fn put_nowait(&self, record: R) -> Result<()> {
        self.try_push(Item::Record(record)).map_err(|_| Error::QueueFull {
            capacity: self.capacity.unwrap_or_default(),
        })
    }

    /// Enqueue the stop marker. Ignores the capacity so this cannot fail.
    pub fn put_stop(&self) {
        self.lock().push_back(Item::Stop);
        self.readable.notify_one();
    }

    /// Dequeue the next item, waiting until one is available
    pub async fn get(&self) -> Item<R> {
        loop {
            if let Some(item) = self.try_get() {
                return item;
            }
            self.readable.notified().await;
        }
    }

    /// Dequeue the next item if one is available
    pub fn try_get(&self) -> Option<Item<R>> {
        let item = self.lock().pop_front();
        if item.is_some() {
            self.writable.notify_one();
        }
        item
    }

    /// Number of queued items (records and stop markers)
    ///
    /// Only a snapshot; producers may change it concurrently.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is currently empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn try_push(&self, item: Item<R>) -> std::result::Result<(), Item<R>> {
        {
            let mut items = self.lock();
            if self.capacity.is_some_and(|cap| items.len() >= cap) {
                return Err(item);
            }
            items.push_back(item);
        }
        self.readable.notify_one();
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Item<R>>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R> Default for RecordQueue<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> std::fmt::Debug for RecordQueue<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
