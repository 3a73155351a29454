//! Cancellation archive queries
//!
//! Reads and post-hoc edits over `cancelled_sessions`. Creation of
//! archive rows happens inside the archiver's transaction, not here.

use chrono::NaiveDate;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use takt_common::db::models::CancelledSession;
use takt_common::db::{parse_uuid, parse_uuid_opt};
use takt_common::{Error, Result};
use uuid::Uuid;

const CANCELLATION_COLUMNS: &str = "id, original_session_id, reason, cancelling_user_id, \
     cancellation_ts, worker_name_snapshot, worker_matricula_snapshot, post_name_snapshot, \
     operation_code_snapshot, operation_name_snapshot, start_ts_snapshot";

pub(crate) fn map_cancellation(row: &SqliteRow) -> Result<CancelledSession> {
    Ok(CancelledSession {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        original_session_id: parse_uuid(&row.try_get::<String, _>("original_session_id")?)?,
        reason: row.try_get("reason")?,
        cancelling_user_id: parse_uuid_opt(row.try_get::<Option<String>, _>("cancelling_user_id")?)?,
        cancellation_ts: row.try_get("cancellation_ts")?,
        worker_name_snapshot: row.try_get("worker_name_snapshot")?,
        worker_matricula_snapshot: row.try_get("worker_matricula_snapshot")?,
        post_name_snapshot: row.try_get("post_name_snapshot")?,
        operation_code_snapshot: row.try_get("operation_code_snapshot")?,
        operation_name_snapshot: row.try_get("operation_name_snapshot")?,
        start_ts_snapshot: row.try_get("start_ts_snapshot")?,
    })
}

pub async fn find_by_id(db: &SqlitePool, id: Uuid) -> Result<Option<CancelledSession>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM cancelled_sessions WHERE id = ?",
        CANCELLATION_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(db)
    .await?;

    row.as_ref().map(map_cancellation).transpose()
}

/// One page of archive records, newest first, with the unfiltered total
pub async fn list(
    db: &SqlitePool,
    limit: i64,
    offset: i64,
    date: Option<NaiveDate>,
) -> Result<(Vec<CancelledSession>, i64)> {
    let (rows, total) = match date {
        Some(date) => {
            let rows = sqlx::query(&format!(
                "SELECT {} FROM cancelled_sessions WHERE date(cancellation_ts) = ? \
                 ORDER BY cancellation_ts DESC LIMIT ? OFFSET ?",
                CANCELLATION_COLUMNS
            ))
            .bind(date)
            .bind(limit)
            .bind(offset)
            .fetch_all(db)
            .await?;

            let total: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM cancelled_sessions WHERE date(cancellation_ts) = ?",
            )
            .bind(date)
            .fetch_one(db)
            .await?;

            (rows, total)
        }
        None => {
            let rows = sqlx::query(&format!(
                "SELECT {} FROM cancelled_sessions ORDER BY cancellation_ts DESC LIMIT ? OFFSET ?",
                CANCELLATION_COLUMNS
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(db)
            .await?;

            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cancelled_sessions")
                .fetch_one(db)
                .await?;

            (rows, total)
        }
    };

    let records = rows
        .iter()
        .map(map_cancellation)
        .collect::<Result<Vec<_>>>()?;

    Ok((records, total))
}

/// Update the reason text; the only field editable after creation
pub async fn update_reason(db: &SqlitePool, id: Uuid, reason: &str) -> Result<()> {
    let result = sqlx::query("UPDATE cancelled_sessions SET reason = ? WHERE id = ?")
        .bind(reason)
        .bind(id.to_string())
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("cancellation {} not found", id)));
    }

    Ok(())
}

/// Remove an archive row; the original session is never resurrected
pub async fn delete(db: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM cancelled_sessions WHERE id = ?")
        .bind(id.to_string())
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("cancellation {} not found", id)));
    }

    Ok(())
}
