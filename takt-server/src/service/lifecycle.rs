//! Session lifecycle state transitions
//!
//! A session is `open` until exactly one of two things happens: a close
//! (sets the end timestamp, terminal) or a cancellation (removes the
//! row and leaves an archive record, terminal). Both operations return
//! the domain event to hand to the snapshot dispatcher; emitting the
//! event is the caller's job so a failed broadcast can never fail the
//! business operation.

use sqlx::SqlitePool;
use takt_common::db::models::Session;
use takt_common::events::FloorEvent;
use takt_common::{time, Error, Result};
use tracing::info;
use uuid::Uuid;

use crate::store::{catalog, sessions};
use crate::store::sessions::NewSession;

/// Parameters for opening a session
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub post_id: Uuid,
    pub worker_id: Uuid,
    pub product_id: Uuid,
    pub operation_id: Option<Uuid>,
    pub part_id: Option<Uuid>,
    pub production_code: Option<String>,
    pub comment: Option<String>,
    pub quantity: Option<i64>,
}

/// How to locate the session to close
#[derive(Debug, Clone, Copy)]
pub enum CloseSelector {
    /// Explicit session id (takes priority over the pair lookup)
    ById(Uuid),
    /// The open session at this (post, worker) pair
    ByPair { post_id: Uuid, worker_id: Uuid },
}

/// Result of a close, with the worked duration resolved
#[derive(Debug, Clone)]
pub struct CloseOutcome {
    pub session: Session,
    pub duration_minutes: i64,
}

/// Open a new session at `start = now`
///
/// Fails with the duplicate-open conflict if the pair already has an
/// open session; the store re-validates that precondition at commit
/// time, so two concurrent opens resolve to one success.
pub async fn open(db: &SqlitePool, req: OpenRequest) -> Result<(Session, FloorEvent)> {
    let worker = catalog::worker_by_id(db, req.worker_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("worker {} not found", req.worker_id)))?;
    let post = catalog::post_by_id(db, req.post_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("post {} not found", req.post_id)))?;
    catalog::product_by_id(db, req.product_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("product {} not found", req.product_id)))?;
    if let Some(operation_id) = req.operation_id {
        catalog::operation_by_id(db, operation_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("operation {} not found", operation_id)))?;
    }
    if let Some(part_id) = req.part_id {
        catalog::part_by_id(db, part_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("part {} not found", part_id)))?;
    }

    let device_name_snapshot = catalog::device_name_for_post(db, req.post_id).await?;
    let start_ts = time::now_local();

    let session = sessions::insert_open(
        db,
        &NewSession {
            post_id: req.post_id,
            worker_id: req.worker_id,
            product_id: req.product_id,
            operation_id: req.operation_id,
            part_id: req.part_id,
            start_ts,
            quantity: req.quantity,
            production_code: req.production_code,
            comment: req.comment,
            device_name_snapshot,
        },
    )
    .await?;

    info!(
        "Opened session {} for worker {} at post {}",
        session.id, worker.matricula, post.name
    );

    let event = FloorEvent::SessionOpened {
        session_id: session.id,
        post_id: session.post_id,
        worker_id: session.worker_id,
        timestamp: start_ts,
    };

    Ok((session, event))
}

/// Close an open session at `end = now`
///
/// An explicit id resolves even if the session is already closed (then
/// fails with the already-closed conflict); the pair lookup only sees
/// open sessions and fails with not-found otherwise.
pub async fn close(
    db: &SqlitePool,
    selector: CloseSelector,
    quantity: Option<i64>,
) -> Result<(CloseOutcome, FloorEvent)> {
    let target = resolve_target(db, selector).await?;

    let end_ts = time::now_local();
    let won = sessions::close(db, target.id, end_ts, quantity).await?;
    if !won {
        // Lost a race against another close or a cancellation
        return match sessions::find_by_id(db, target.id).await? {
            Some(_) => Err(Error::AlreadyClosed(target.id)),
            None => Err(Error::NotFound(format!("session {} not found", target.id))),
        };
    }

    let session = sessions::find_by_id(db, target.id)
        .await?
        .ok_or_else(|| Error::Internal(format!("session {} vanished after close", target.id)))?;
    let duration_minutes = time::duration_minutes(session.start_ts, end_ts);

    info!(
        "Closed session {} after {} minutes",
        session.id, duration_minutes
    );

    let event = FloorEvent::SessionClosed {
        session_id: session.id,
        post_id: session.post_id,
        worker_id: session.worker_id,
        duration_minutes,
        timestamp: end_ts,
    };

    Ok((
        CloseOutcome {
            session,
            duration_minutes,
        },
        event,
    ))
}

/// Resolve an open session by id or by (post, worker) pair
///
/// Unlike the close path this never reports a conflict: a closed or
/// missing session is simply not found.
pub async fn resolve_open(db: &SqlitePool, selector: CloseSelector) -> Result<Session> {
    match selector {
        CloseSelector::ById(id) => sessions::find_by_id(db, id)
            .await?
            .filter(Session::is_open)
            .ok_or_else(|| Error::NotFound(format!("no open session {}", id))),
        CloseSelector::ByPair { post_id, worker_id } => {
            sessions::find_open_by_pair(db, post_id, worker_id)
                .await?
                .ok_or_else(|| {
                    Error::NotFound(format!(
                        "no open session for post {} and worker {}",
                        post_id, worker_id
                    ))
                })
        }
    }
}

async fn resolve_target(db: &SqlitePool, selector: CloseSelector) -> Result<Session> {
    match selector {
        CloseSelector::ById(id) => {
            let session = sessions::find_by_id(db, id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("session {} not found", id)))?;
            if session.end_ts.is_some() {
                return Err(Error::AlreadyClosed(id));
            }
            Ok(session)
        }
        CloseSelector::ByPair { post_id, worker_id } => sessions::find_open_by_pair(db, post_id, worker_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "no open session for post {} and worker {}",
                    post_id, worker_id
                ))
            }),
    }
}
