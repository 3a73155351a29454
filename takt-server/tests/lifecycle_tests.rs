//! Session lifecycle integration tests

mod helpers;

use helpers::{memory_pool, seed_basic, seed_device};
use takt_common::db::init_database;
use takt_common::events::FloorEvent;
use takt_common::Error;
use takt_server::service::lifecycle::{self, CloseSelector, OpenRequest};

fn open_request(fixture: &helpers::Fixture) -> OpenRequest {
    OpenRequest {
        post_id: fixture.post,
        worker_id: fixture.worker,
        product_id: fixture.product,
        operation_id: None,
        part_id: None,
        production_code: None,
        comment: None,
        quantity: None,
    }
}

#[tokio::test]
async fn test_open_then_close() {
    let db = memory_pool().await;
    let fixture = seed_basic(&db).await;

    let (session, event) = lifecycle::open(&db, open_request(&fixture)).await.unwrap();
    assert!(session.is_open());
    assert!(matches!(event, FloorEvent::SessionOpened { session_id, .. } if session_id == session.id));

    let (outcome, event) = lifecycle::close(&db, CloseSelector::ById(session.id), Some(25))
        .await
        .unwrap();
    assert!(!outcome.session.is_open());
    assert_eq!(outcome.session.quantity, Some(25));
    assert!(outcome.duration_minutes >= 0);
    assert!(matches!(event, FloorEvent::SessionClosed { duration_minutes, .. }
        if duration_minutes == outcome.duration_minutes));
}

#[tokio::test]
async fn test_open_conflicts_on_second_open() {
    let db = memory_pool().await;
    let fixture = seed_basic(&db).await;

    let (first, _) = lifecycle::open(&db, open_request(&fixture)).await.unwrap();

    let err = lifecycle::open(&db, open_request(&fixture)).await.unwrap_err();
    match err {
        Error::DuplicateOpen { existing_id } => assert_eq!(existing_id, first.id),
        other => panic!("expected DuplicateOpen, got {:?}", other),
    }
}

#[tokio::test]
async fn test_close_twice_is_conflict_and_first_duration_stands() {
    let db = memory_pool().await;
    let fixture = seed_basic(&db).await;

    let (session, _) = lifecycle::open(&db, open_request(&fixture)).await.unwrap();
    let (outcome, _) = lifecycle::close(&db, CloseSelector::ById(session.id), Some(10))
        .await
        .unwrap();

    let err = lifecycle::close(&db, CloseSelector::ById(session.id), Some(99))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyClosed(id) if id == session.id));

    // The first close's outcome is untouched by the failed retry
    let persisted = lifecycle::resolve_open(&db, CloseSelector::ById(session.id)).await;
    assert!(persisted.is_err());
    let row = takt_server::store::sessions::find_by_id(&db, session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.quantity, Some(10));
    assert_eq!(row.end_ts, outcome.session.end_ts);
}

#[tokio::test]
async fn test_close_by_pair() {
    let db = memory_pool().await;
    let fixture = seed_basic(&db).await;

    let (session, _) = lifecycle::open(&db, open_request(&fixture)).await.unwrap();

    let (outcome, _) = lifecycle::close(
        &db,
        CloseSelector::ByPair {
            post_id: fixture.post,
            worker_id: fixture.worker,
        },
        None,
    )
    .await
    .unwrap();
    assert_eq!(outcome.session.id, session.id);

    // No open session left for the pair
    let err = lifecycle::close(
        &db,
        CloseSelector::ByPair {
            post_id: fixture.post,
            worker_id: fixture.worker,
        },
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_open_unknown_refs_not_found() {
    let db = memory_pool().await;
    let fixture = seed_basic(&db).await;

    let mut req = open_request(&fixture);
    req.worker_id = uuid::Uuid::new_v4();
    let err = lifecycle::open(&db, req).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let mut req = open_request(&fixture);
    req.post_id = uuid::Uuid::new_v4();
    let err = lifecycle::open(&db, req).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_open_snapshots_device_name() {
    let db = memory_pool().await;
    let fixture = seed_basic(&db).await;
    seed_device(&db, fixture.post, "rpi-post-1").await;

    let (session, _) = lifecycle::open(&db, open_request(&fixture)).await.unwrap();
    assert_eq!(session.device_name_snapshot.as_deref(), Some("rpi-post-1"));
}

#[tokio::test]
async fn test_resolve_open_by_pair_and_id() {
    let db = memory_pool().await;
    let fixture = seed_basic(&db).await;

    let (session, _) = lifecycle::open(&db, open_request(&fixture)).await.unwrap();

    let by_id = lifecycle::resolve_open(&db, CloseSelector::ById(session.id))
        .await
        .unwrap();
    assert_eq!(by_id.id, session.id);

    let by_pair = lifecycle::resolve_open(
        &db,
        CloseSelector::ByPair {
            post_id: fixture.post,
            worker_id: fixture.worker,
        },
    )
    .await
    .unwrap();
    assert_eq!(by_pair.id, session.id);
}

#[tokio::test]
async fn test_concurrent_opens_one_winner() {
    // File-backed database: concurrent writers need a real shared store
    let dir = tempfile::tempdir().unwrap();
    let db = init_database(&dir.path().join("takt.db")).await.unwrap();
    let fixture = seed_basic(&db).await;

    let (a, b) = tokio::join!(
        lifecycle::open(&db, open_request(&fixture)),
        lifecycle::open(&db, open_request(&fixture)),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one concurrent open must win");

    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(
        loser.is_conflict(),
        "loser must fail with a conflict, got {:?}",
        loser
    );
}
