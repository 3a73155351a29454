//! Realtime dispatch integration tests
//!
//! Exercises the throttled broadcast path the way the HTTP handlers
//! drive it: domain events in, at most one snapshot per interval out.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::*;
use takt_common::events::FloorEvent;
use takt_server::realtime::{ChannelMessage, DashboardHub, SnapshotDispatcher};
use uuid::Uuid;

fn opened_event() -> FloorEvent {
    FloorEvent::SessionOpened {
        session_id: Uuid::new_v4(),
        post_id: Uuid::new_v4(),
        worker_id: Uuid::new_v4(),
        timestamp: takt_common::time::now_local(),
    }
}

fn drain_snapshots(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ChannelMessage>) -> usize {
    let mut count = 0;
    while let Ok(message) = rx.try_recv() {
        if matches!(message, ChannelMessage::Snapshot { .. }) {
            count += 1;
        }
    }
    count
}

#[tokio::test]
async fn test_event_burst_broadcasts_once() {
    let db = memory_pool().await;
    seed_basic(&db).await;

    let hub = Arc::new(DashboardHub::new());
    let dispatcher = SnapshotDispatcher::new(db, hub.clone(), Duration::from_secs(60));
    let (_id, mut rx) = hub.subscribe();

    for _ in 0..5 {
        dispatcher.publish(&opened_event()).await;
    }

    assert_eq!(drain_snapshots(&mut rx), 1);

    // A forced notify still goes out inside the interval
    dispatcher.notify(true).await;
    assert_eq!(drain_snapshots(&mut rx), 1);
}

#[tokio::test]
async fn test_broadcast_resumes_after_interval() {
    let db = memory_pool().await;
    seed_basic(&db).await;

    let hub = Arc::new(DashboardHub::new());
    let dispatcher = SnapshotDispatcher::new(db, hub.clone(), Duration::from_millis(30));
    let (_id, mut rx) = hub.subscribe();

    dispatcher.publish(&opened_event()).await;
    dispatcher.publish(&opened_event()).await;
    assert_eq!(drain_snapshots(&mut rx), 1);

    tokio::time::sleep(Duration::from_millis(40)).await;
    dispatcher.publish(&opened_event()).await;
    assert_eq!(drain_snapshots(&mut rx), 1);
}

#[tokio::test]
async fn test_point_to_point_snapshot() {
    let db = memory_pool().await;
    seed_basic(&db).await;

    let hub = Arc::new(DashboardHub::new());
    let dispatcher = SnapshotDispatcher::new(db, hub.clone(), Duration::from_secs(60));
    let (id_a, mut rx_a) = hub.subscribe();
    let (_id_b, mut rx_b) = hub.subscribe();

    dispatcher.send_snapshot_to(id_a).await.unwrap();
    assert_eq!(drain_snapshots(&mut rx_a), 1);
    assert_eq!(drain_snapshots(&mut rx_b), 0);

    // Unknown subscriber errors without reaching anyone
    let err = dispatcher.send_snapshot_to(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, takt_common::Error::NotFound(_)));
}

#[tokio::test]
async fn test_publish_survives_disconnected_subscribers() {
    let db = memory_pool().await;
    seed_basic(&db).await;

    let hub = Arc::new(DashboardHub::new());
    let dispatcher = SnapshotDispatcher::new(db, hub.clone(), Duration::from_secs(60));
    let (_id, rx) = hub.subscribe();
    drop(rx);

    // Publish must not fail even though the only subscriber is gone
    dispatcher.publish(&opened_event()).await;
    assert_eq!(hub.subscriber_count(), 0);
}
