//! Tests for the record queue

use super::*;
use crate::error::Error;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_fifo_order() {
    let queue = RecordQueue::new();
    queue.put("a").await;
    queue.put("b").await;
    queue.put_nowait("c").unwrap();

    assert_eq!(queue.len(), 3);
    assert_eq!(queue.get().await, Item::Record("a"));
    assert_eq!(queue.try_get(), Some(Item::Record("b")));
    assert_eq!(queue.get().await, Item::Record("c"));
    assert!(queue.is_empty());
}

#[test]
fn test_try_get_on_empty_queue() {
    let queue: RecordQueue<u32> = RecordQueue::new();
    assert_eq!(queue.try_get(), None);
}

#[tokio::test]
async fn test_get_wakes_up_on_put_from_other_task() {
    let queue = Arc::new(RecordQueue::new());

    let producer = {
        let queue = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            queue.put(42).await;
        })
    };

    let item = tokio::time::timeout(Duration::from_secs(1), queue.get())
        .await
        .expect("get should wake up");
    assert_eq!(item, Item::Record(42));
    producer.await.unwrap();
}

#[tokio::test]
async fn test_stop_marker_wakes_blocked_consumer() {
    let queue: Arc<RecordQueue<String>> = Arc::new(RecordQueue::new());

    let consumer = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.get().await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.put_stop();

    let item = tokio::time::timeout(Duration::from_secs(1), consumer)
        .await
        .unwrap()
        .unwrap();
    assert!(item.is_stop());
}

#[test]
fn test_bounded_put_nowait_rejects_when_full() {
    let queue = RecordQueue::bounded(2);
    queue.put_nowait(1).unwrap();
    queue.put_nowait(2).unwrap();

    let result = queue.put_nowait(3);
    assert!(matches!(result, Err(Error::QueueFull { capacity: 2 })));
    assert_eq!(queue.len(), 2);
}

#[test]
fn test_stop_ignores_capacity() {
    let queue = RecordQueue::bounded(1);
    queue.put_nowait("x").unwrap();
    queue.put_stop();

    assert_eq!(queue.len(), 2);
    assert_eq!(queue.try_get(), Some(Item::Record("x")));
    assert_eq!(queue.try_get(), Some(Item::Stop));
}

#[tokio::test]
async fn test_bounded_put_waits_for_space() {
    let queue = Arc::new(RecordQueue::bounded(1));
    queue.put(1).await;

    let producer = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.put(2).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!producer.is_finished());

    assert_eq!(queue.try_get(), Some(Item::Record(1)));
    tokio::time::timeout(Duration::from_secs(1), producer)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(queue.try_get(), Some(Item::Record(2)));
}

#[test]
fn test_item_helpers() {
    let item: Item<&str> = "a".into();
    assert!(!item.is_stop());
    assert_eq!(item.into_record(), Some("a"));
    assert_eq!(Item::<&str>::Stop.into_record(), None);
}
