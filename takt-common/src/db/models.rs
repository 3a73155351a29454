//! Database row models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One worker's work interval at a post
///
/// `end_ts = None` means the session is open. Rows are created by the
/// lifecycle manager's open path, mutated only by its close path, and
/// removed only by cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub post_id: Uuid,
    pub worker_id: Uuid,
    pub product_id: Uuid,
    pub operation_id: Option<Uuid>,
    pub part_id: Option<Uuid>,
    pub start_ts: NaiveDateTime,
    pub end_ts: Option<NaiveDateTime>,
    pub quantity: Option<i64>,
    pub production_code: Option<String>,
    pub comment: Option<String>,
    pub device_name_snapshot: Option<String>,
}

impl Session {
    pub fn is_open(&self) -> bool {
        self.end_ts.is_none()
    }
}

/// Immutable archive record left behind when a session is cancelled
///
/// Display fields are frozen at cancellation time; only `reason` may be
/// edited afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelledSession {
    pub id: Uuid,
    pub original_session_id: Uuid,
    pub reason: Option<String>,
    pub cancelling_user_id: Option<Uuid>,
    pub cancellation_ts: NaiveDateTime,
    pub worker_name_snapshot: String,
    pub worker_matricula_snapshot: String,
    pub post_name_snapshot: String,
    pub operation_code_snapshot: Option<String>,
    pub operation_name_snapshot: Option<String>,
    pub start_ts_snapshot: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: Uuid,
    pub name: String,
    pub matricula: String,
    pub badge_code: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubLine {
    pub id: Uuid,
    pub line_id: Uuid,
    pub name: String,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub sub_line_id: Uuid,
    pub name: String,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

/// Per-post default worker/product, most recent configuration wins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostConfiguration {
    pub id: Uuid,
    pub post_id: Uuid,
    pub worker_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub configured_at: NaiveDateTime,
}
