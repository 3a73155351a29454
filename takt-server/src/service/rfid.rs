//! Badge-driven entry/exit toggle
//!
//! A badge tap is a pure toggle: if the resolved worker has an open
//! session at the resolved post the tap closes it, otherwise it opens
//! one. The caller supplies no mode; the tagged outcome says which way
//! the toggle went.

use sqlx::SqlitePool;
use takt_common::db::models::{Post, Session, Worker};
use takt_common::events::FloorEvent;
use takt_common::{time, Error, Result};
use tracing::debug;
use uuid::Uuid;

use crate::store::{catalog, sessions};

use super::lifecycle::{self, CloseSelector, OpenRequest};

/// What a badge tap did
#[derive(Debug, Clone)]
pub enum ToggleOutcome {
    /// No open session existed; one was opened
    Entry {
        session: Session,
        worker: Worker,
        post: Post,
    },
    /// An open session existed; it was closed
    Exit {
        session: Session,
        duration_minutes: i64,
        worker: Worker,
        post: Post,
    },
}

/// Resolve a badge scan and flip the worker's session state
///
/// Resolution order: badge → worker (temporary overlay first, then the
/// permanent directory), post (explicit argument, else the worker's
/// most recent configuration with a product), product (from that
/// post's configuration), then open-or-close by current ledger state.
pub async fn toggle(
    db: &SqlitePool,
    tag_code: &str,
    explicit_post: Option<Uuid>,
) -> Result<(ToggleOutcome, FloorEvent)> {
    let now = time::now_local();

    let worker = catalog::worker_by_badge(db, tag_code, now)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no worker matches badge {}", tag_code)))?;
    if !worker.active {
        return Err(Error::Forbidden(format!(
            "worker {} is deactivated",
            worker.matricula
        )));
    }

    let (post, product_id) = resolve_post_and_product(db, &worker, explicit_post).await?;

    match sessions::find_open_by_pair(db, post.id, worker.id).await? {
        Some(open) => {
            debug!(
                "Badge {} toggles exit for worker {} at post {}",
                tag_code, worker.matricula, post.name
            );
            let (outcome, event) =
                lifecycle::close(db, CloseSelector::ById(open.id), None).await?;
            Ok((
                ToggleOutcome::Exit {
                    session: outcome.session,
                    duration_minutes: outcome.duration_minutes,
                    worker,
                    post,
                },
                event,
            ))
        }
        None => {
            debug!(
                "Badge {} toggles entry for worker {} at post {}",
                tag_code, worker.matricula, post.name
            );
            let (session, event) = lifecycle::open(
                db,
                OpenRequest {
                    post_id: post.id,
                    worker_id: worker.id,
                    product_id,
                    operation_id: None,
                    part_id: None,
                    production_code: None,
                    comment: None,
                    quantity: None,
                },
            )
            .await?;
            Ok((
                ToggleOutcome::Entry {
                    session,
                    worker,
                    post,
                },
                event,
            ))
        }
    }
}

async fn resolve_post_and_product(
    db: &SqlitePool,
    worker: &Worker,
    explicit_post: Option<Uuid>,
) -> Result<(Post, Uuid)> {
    let (post_id, config) = match explicit_post {
        Some(post_id) => {
            let config = catalog::latest_config_for_post(db, post_id).await?;
            (post_id, config)
        }
        None => {
            let config = catalog::latest_config_for_worker(db, worker.id)
                .await?
                .ok_or_else(|| {
                    Error::NotFound(format!(
                        "no post configuration for worker {}",
                        worker.matricula
                    ))
                })?;
            (config.post_id, Some(config))
        }
    };

    let post = catalog::post_by_id(db, post_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("post {} not found", post_id)))?;

    let product_id = config.and_then(|c| c.product_id).ok_or_else(|| {
        Error::Validation(format!("no product configured for post {}", post.name))
    })?;

    Ok((post, product_id))
}
