//! Cancellation archiver
//!
//! Removes a session from the live ledger while leaving an immutable
//! archive record. The snapshot materialization, archive insert and
//! session delete form one transaction: a fault anywhere rolls the
//! whole unit back, so "archive without delete" and "delete without
//! archive" are never observable.

use chrono::NaiveDateTime;
use sqlx::{Row, SqlitePool};
use takt_common::db::models::CancelledSession;
use takt_common::events::FloorEvent;
use takt_common::{time, Error, Result};
use tracing::info;
use uuid::Uuid;

/// Display fields frozen into the archive row
struct SnapshotLabels {
    worker_name: String,
    worker_matricula: String,
    post_name: String,
    operation_code: Option<String>,
    operation_name: Option<String>,
    start_ts: NaiveDateTime,
}

/// Cancel a session, open or closed
///
/// Cancelling an already-closed session is a supported path: the row
/// still exists in the ledger until archived. Racing cancellers are
/// resolved by the unique index on the original session id.
pub async fn cancel(
    db: &SqlitePool,
    session_id: Uuid,
    reason: Option<String>,
    cancelling_user_id: Option<Uuid>,
) -> Result<(CancelledSession, FloorEvent)> {
    let mut tx = db.begin().await?;

    let labels = materialize_snapshot(&mut tx, session_id).await?;

    let cancellation_id = Uuid::new_v4();
    let cancellation_ts = time::now_local();

    let inserted = sqlx::query(
        r#"
        INSERT INTO cancelled_sessions
            (id, original_session_id, reason, cancelling_user_id, cancellation_ts,
             worker_name_snapshot, worker_matricula_snapshot, post_name_snapshot,
             operation_code_snapshot, operation_name_snapshot, start_ts_snapshot)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(cancellation_id.to_string())
    .bind(session_id.to_string())
    .bind(reason.as_deref())
    .bind(cancelling_user_id.map(|u| u.to_string()))
    .bind(cancellation_ts)
    .bind(&labels.worker_name)
    .bind(&labels.worker_matricula)
    .bind(&labels.post_name)
    .bind(labels.operation_code.as_deref())
    .bind(labels.operation_name.as_deref())
    .bind(labels.start_ts)
    .execute(&mut *tx)
    .await;

    if let Err(sqlx::Error::Database(db_err)) = &inserted {
        if db_err.is_unique_violation() {
            return Err(Error::AlreadyCancelled(session_id));
        }
    }
    inserted?;

    let deleted = sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(session_id.to_string())
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        // Session disappeared under us; dropping tx rolls back the insert
        return Err(Error::NotFound(format!("session {} not found", session_id)));
    }

    tx.commit().await?;

    info!(
        "Cancelled session {} (archive {})",
        session_id, cancellation_id
    );

    let record = CancelledSession {
        id: cancellation_id,
        original_session_id: session_id,
        reason,
        cancelling_user_id,
        cancellation_ts,
        worker_name_snapshot: labels.worker_name,
        worker_matricula_snapshot: labels.worker_matricula,
        post_name_snapshot: labels.post_name,
        operation_code_snapshot: labels.operation_code,
        operation_name_snapshot: labels.operation_name,
        start_ts_snapshot: labels.start_ts,
    };

    let event = FloorEvent::SessionCancelled {
        session_id,
        cancellation_id,
        timestamp: cancellation_ts,
    };

    Ok((record, event))
}

/// Resolve every display label in one pass inside the transaction
async fn materialize_snapshot(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    session_id: Uuid,
) -> Result<SnapshotLabels> {
    let row = sqlx::query(
        r#"
        SELECT s.start_ts,
               w.name AS worker_name, w.matricula AS worker_matricula,
               p.name AS post_name,
               o.code AS operation_code, o.name AS operation_name
        FROM sessions s
        JOIN workers w ON w.id = s.worker_id
        JOIN posts p ON p.id = s.post_id
        LEFT JOIN operations o ON o.id = s.operation_id
        WHERE s.id = ?
        "#,
    )
    .bind(session_id.to_string())
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| Error::NotFound(format!("session {} not found", session_id)))?;

    Ok(SnapshotLabels {
        worker_name: row.try_get("worker_name")?,
        worker_matricula: row.try_get("worker_matricula")?,
        post_name: row.try_get("post_name")?,
        operation_code: row.try_get("operation_code")?,
        operation_name: row.try_get("operation_name")?,
        start_ts: row.try_get("start_ts")?,
    })
}

/// Edit the reason text on an existing archive record
pub async fn update_reason(db: &SqlitePool, cancellation_id: Uuid, reason: &str) -> Result<()> {
    if reason.trim().is_empty() {
        return Err(Error::Validation("reason must not be blank".to_string()));
    }

    crate::store::cancellations::update_reason(db, cancellation_id, reason).await
}

/// Remove an archive record; never resurrects the original session
pub async fn delete(db: &SqlitePool, cancellation_id: Uuid) -> Result<()> {
    crate::store::cancellations::delete(db, cancellation_id).await
}
