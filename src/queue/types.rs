//! Queue item types

/// An entry of a [`RecordQueue`](super::RecordQueue)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item<R> {
    /// A record to append
    Record(R),
    /// Request to stop the consumer
    Stop,
}

impl<R> Item<R> {
    /// Whether this is the stop marker
    pub fn is_stop(&self) -> bool {
        matches!(self, Item::Stop)
    }

    /// The record, if this is not the stop marker
    pub fn into_record(self) -> Option<R> {
        match self {
            Item::Record(record) => Some(record),
            Item::Stop => None,
        }
    }
}

impl<R> From<R> for Item<R> {
    fn from(record: R) -> Self {
        Item::Record(record)
    }
}
