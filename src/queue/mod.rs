//! Record queue module
//!
//! The buffer between producers and the queuing appender.
//!
//! Producers `put` records from any number of tasks; the appender is the
//! single consumer. A [`Item::Stop`] marker travels through the same queue
//! so a consumer blocked in [`RecordQueue::get`] wakes up on shutdown.

mod record_queue;
mod types;

pub use record_queue::RecordQueue;
pub use types::Item;

#[cfg(test)]
mod tests;
