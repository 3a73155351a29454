//! Session ledger queries
//!
//! Sole write path for the `sessions` table. The "at most one open
//! session per (post, worker)" invariant lives in the partial unique
//! index created at init time; this module translates the constraint
//! violation into the duplicate-open conflict, so the check and the
//! insert are indivisible even under concurrent calls.

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use takt_common::db::models::Session;
use takt_common::db::{parse_uuid, parse_uuid_opt};
use takt_common::{Error, Result};
use uuid::Uuid;

const SESSION_COLUMNS: &str = "id, post_id, worker_id, product_id, operation_id, part_id, \
     start_ts, end_ts, quantity, production_code, comment, device_name_snapshot";

/// Field values for a new open session row
#[derive(Debug, Clone)]
pub struct NewSession {
    pub post_id: Uuid,
    pub worker_id: Uuid,
    pub product_id: Uuid,
    pub operation_id: Option<Uuid>,
    pub part_id: Option<Uuid>,
    pub start_ts: NaiveDateTime,
    pub quantity: Option<i64>,
    pub production_code: Option<String>,
    pub comment: Option<String>,
    pub device_name_snapshot: Option<String>,
}

pub(crate) fn map_session(row: &SqliteRow) -> Result<Session> {
    Ok(Session {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        post_id: parse_uuid(&row.try_get::<String, _>("post_id")?)?,
        worker_id: parse_uuid(&row.try_get::<String, _>("worker_id")?)?,
        product_id: parse_uuid(&row.try_get::<String, _>("product_id")?)?,
        operation_id: parse_uuid_opt(row.try_get::<Option<String>, _>("operation_id")?)?,
        part_id: parse_uuid_opt(row.try_get::<Option<String>, _>("part_id")?)?,
        start_ts: row.try_get("start_ts")?,
        end_ts: row.try_get("end_ts")?,
        quantity: row.try_get("quantity")?,
        production_code: row.try_get("production_code")?,
        comment: row.try_get("comment")?,
        device_name_snapshot: row.try_get("device_name_snapshot")?,
    })
}

/// Insert a new open session
///
/// A unique-index violation means an open session already exists for
/// the pair; the existing id is fetched for the conflict payload.
pub async fn insert_open(db: &SqlitePool, new: &NewSession) -> Result<Session> {
    let id = Uuid::new_v4();

    let inserted = sqlx::query(
        r#"
        INSERT INTO sessions
            (id, post_id, worker_id, product_id, operation_id, part_id,
             start_ts, quantity, production_code, comment, device_name_snapshot)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(new.post_id.to_string())
    .bind(new.worker_id.to_string())
    .bind(new.product_id.to_string())
    .bind(new.operation_id.map(|u| u.to_string()))
    .bind(new.part_id.map(|u| u.to_string()))
    .bind(new.start_ts)
    .bind(new.quantity)
    .bind(new.production_code.as_deref())
    .bind(new.comment.as_deref())
    .bind(new.device_name_snapshot.as_deref())
    .execute(db)
    .await;

    match inserted {
        Ok(_) => find_by_id(db, id)
            .await?
            .ok_or_else(|| Error::Internal(format!("session {} vanished after insert", id))),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            match find_open_by_pair(db, new.post_id, new.worker_id).await? {
                Some(existing) => Err(Error::DuplicateOpen {
                    existing_id: existing.id,
                }),
                None => Err(Error::Conflict(
                    "an open session already exists for this post and worker".to_string(),
                )),
            }
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn find_by_id(db: &SqlitePool, id: Uuid) -> Result<Option<Session>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM sessions WHERE id = ?",
        SESSION_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(db)
    .await?;

    row.as_ref().map(map_session).transpose()
}

/// The open session for a (post, worker) pair, if any
pub async fn find_open_by_pair(
    db: &SqlitePool,
    post_id: Uuid,
    worker_id: Uuid,
) -> Result<Option<Session>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM sessions WHERE post_id = ? AND worker_id = ? AND end_ts IS NULL",
        SESSION_COLUMNS
    ))
    .bind(post_id.to_string())
    .bind(worker_id.to_string())
    .fetch_optional(db)
    .await?;

    row.as_ref().map(map_session).transpose()
}

/// Set the end timestamp (and quantity, if supplied) on an open session
///
/// The `end_ts IS NULL` guard makes racing closers resolve by commit
/// order: the loser updates zero rows. Returns whether this call won.
pub async fn close(
    db: &SqlitePool,
    id: Uuid,
    end_ts: NaiveDateTime,
    quantity: Option<i64>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET end_ts = ?, quantity = COALESCE(?, quantity)
        WHERE id = ? AND end_ts IS NULL
        "#,
    )
    .bind(end_ts)
    .bind(quantity)
    .bind(id.to_string())
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// One open session joined with its display labels, for the dashboard
#[derive(Debug, Clone)]
pub struct OpenSessionLabels {
    pub session_id: Uuid,
    pub post_id: Uuid,
    pub worker_id: Uuid,
    pub worker_name: String,
    pub worker_matricula: String,
    pub product_code: String,
    pub operation_name: Option<String>,
    pub start_ts: NaiveDateTime,
}

/// All open sessions with worker/product/operation labels resolved
pub async fn open_sessions_with_labels(db: &SqlitePool) -> Result<Vec<OpenSessionLabels>> {
    let rows = sqlx::query(
        r#"
        SELECT s.id, s.post_id, s.worker_id, s.start_ts,
               w.name AS worker_name, w.matricula AS worker_matricula,
               pr.code AS product_code,
               o.name AS operation_name
        FROM sessions s
        JOIN workers w ON w.id = s.worker_id
        JOIN products pr ON pr.id = s.product_id
        LEFT JOIN operations o ON o.id = s.operation_id
        WHERE s.end_ts IS NULL
        ORDER BY s.start_ts
        "#,
    )
    .fetch_all(db)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(OpenSessionLabels {
                session_id: parse_uuid(&row.try_get::<String, _>("id")?)?,
                post_id: parse_uuid(&row.try_get::<String, _>("post_id")?)?,
                worker_id: parse_uuid(&row.try_get::<String, _>("worker_id")?)?,
                worker_name: row.try_get("worker_name")?,
                worker_matricula: row.try_get("worker_matricula")?,
                product_code: row.try_get("product_code")?,
                operation_name: row.try_get("operation_name")?,
                start_ts: row.try_get("start_ts")?,
            })
        })
        .collect()
}

/// Sum of quantities over sessions started on `date` and already closed
pub async fn closed_quantity_for_date(db: &SqlitePool, date: NaiveDate) -> Result<i64> {
    let total: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT SUM(quantity) FROM sessions
        WHERE end_ts IS NOT NULL AND date(start_ts) = ?
        "#,
    )
    .bind(date)
    .fetch_one(db)
    .await?;

    Ok(total.unwrap_or(0))
}
