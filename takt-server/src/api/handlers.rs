//! HTTP request handlers
//!
//! Implements the REST endpoints for the session lifecycle, the badge
//! toggle, the cancellation archive and the dashboard snapshot.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use takt_common::db::models::{CancelledSession, Session};
use takt_common::Error;
use uuid::Uuid;

use crate::service::dashboard::{self, DashboardSnapshot};
use crate::service::lifecycle::{self, CloseSelector, OpenRequest};
use crate::service::rfid::{self, ToggleOutcome};
use crate::service::cancel;
use crate::store::{cancellations, catalog};
use crate::AppState;

use super::ApiError;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenEntryRequest {
    pub post: Option<Uuid>,
    pub worker: Option<Uuid>,
    pub product: Option<Uuid>,
    pub operation: Option<Uuid>,
    pub part: Option<Uuid>,
    pub code: Option<String>,
    pub comment: Option<String>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub id: Uuid,
    pub start_time: NaiveTime,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct CloseExitRequest {
    pub session_id: Option<Uuid>,
    pub post: Option<Uuid>,
    pub worker: Option<Uuid>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ExitResponse {
    pub id: Uuid,
    pub end_time: NaiveDateTime,
    pub duration_minutes: i64,
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveOpenQuery {
    pub session_id: Option<Uuid>,
    pub post: Option<Uuid>,
    pub worker: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub tag_code: String,
    pub post: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub session_id: Uuid,
    pub worker_id: Uuid,
    pub worker_name: String,
    pub matricula: String,
    pub post_id: Uuid,
    pub post_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub session_id: Uuid,
    pub reason: Option<String>,
    pub cancelling_user: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CancellationListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct CancellationPage {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub items: Vec<CancelledSession>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReasonRequest {
    pub reason: String,
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "takt-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Session Lifecycle Endpoints
// ============================================================================

/// POST /production/entry - Open a session
///
/// Worker and product fall back to the post's most recent
/// configuration when not supplied explicitly.
pub async fn open_entry(
    State(state): State<AppState>,
    Json(req): Json<OpenEntryRequest>,
) -> Result<Json<EntryResponse>, ApiError> {
    let post_id = req
        .post
        .ok_or_else(|| Error::Validation("post is required".to_string()))?;

    let config = catalog::latest_config_for_post(&state.db, post_id).await?;
    let worker_id = req
        .worker
        .or_else(|| config.as_ref().and_then(|c| c.worker_id))
        .ok_or_else(|| {
            Error::Validation("worker is required and the post has no default worker".to_string())
        })?;
    let product_id = req
        .product
        .or_else(|| config.as_ref().and_then(|c| c.product_id))
        .ok_or_else(|| {
            Error::Validation("product is required and the post has no configured product".to_string())
        })?;

    let (session, event) = lifecycle::open(
        &state.db,
        OpenRequest {
            post_id,
            worker_id,
            product_id,
            operation_id: req.operation,
            part_id: req.part,
            production_code: req.code,
            comment: req.comment,
            quantity: req.quantity,
        },
    )
    .await?;

    state.dispatcher.publish(&event).await;

    Ok(Json(EntryResponse {
        id: session.id,
        start_time: session.start_ts.time(),
        date: session.start_ts.date(),
    }))
}

/// POST /production/exit - Close a session
///
/// Accepts either an explicit session id or a (post, worker) pair; the
/// id takes priority when both are present.
pub async fn close_exit(
    State(state): State<AppState>,
    Json(req): Json<CloseExitRequest>,
) -> Result<Json<ExitResponse>, ApiError> {
    let selector = selector_from(req.session_id, req.post, req.worker)?;

    let (outcome, event) = lifecycle::close(&state.db, selector, req.quantity).await?;

    state.dispatcher.publish(&event).await;

    let end_time = outcome.session.end_ts.ok_or_else(|| {
        Error::Internal(format!("session {} closed without end_ts", outcome.session.id))
    })?;

    Ok(Json(ExitResponse {
        id: outcome.session.id,
        end_time,
        duration_minutes: outcome.duration_minutes,
        quantity: outcome.session.quantity,
    }))
}

/// GET /production/open - Resolve the open session for an id or pair
pub async fn resolve_open(
    State(state): State<AppState>,
    Query(query): Query<ResolveOpenQuery>,
) -> Result<Json<Session>, ApiError> {
    let selector = selector_from(query.session_id, query.post, query.worker)?;
    let session = lifecycle::resolve_open(&state.db, selector).await?;
    Ok(Json(session))
}

fn selector_from(
    session_id: Option<Uuid>,
    post: Option<Uuid>,
    worker: Option<Uuid>,
) -> Result<CloseSelector, Error> {
    if let Some(id) = session_id {
        return Ok(CloseSelector::ById(id));
    }
    match (post, worker) {
        (Some(post_id), Some(worker_id)) => Ok(CloseSelector::ByPair { post_id, worker_id }),
        _ => Err(Error::Validation(
            "either session_id or both post and worker are required".to_string(),
        )),
    }
}

// ============================================================================
// Badge Toggle Endpoint
// ============================================================================

/// POST /rfid/toggle - Entry/exit toggle driven by a badge scan
pub async fn toggle_by_badge(
    State(state): State<AppState>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, ApiError> {
    if req.tag_code.trim().is_empty() {
        return Err(Error::Validation("tag_code is required".to_string()).into());
    }

    let (outcome, event) = rfid::toggle(&state.db, &req.tag_code, req.post).await?;

    state.dispatcher.publish(&event).await;

    let response = match outcome {
        ToggleOutcome::Entry {
            session,
            worker,
            post,
        } => ToggleResponse {
            kind: "entry".to_string(),
            session_id: session.id,
            worker_id: worker.id,
            worker_name: worker.name,
            matricula: worker.matricula,
            post_id: post.id,
            post_name: post.name,
            start_time: Some(session.start_ts),
            end_time: None,
            duration_minutes: None,
        },
        ToggleOutcome::Exit {
            session,
            duration_minutes,
            worker,
            post,
        } => ToggleResponse {
            kind: "exit".to_string(),
            session_id: session.id,
            worker_id: worker.id,
            worker_name: worker.name,
            matricula: worker.matricula,
            post_id: post.id,
            post_name: post.name,
            start_time: Some(session.start_ts),
            end_time: session.end_ts,
            duration_minutes: Some(duration_minutes),
        },
    };

    Ok(Json(response))
}

// ============================================================================
// Cancellation Endpoints
// ============================================================================

/// POST /production/cancel - Archive and remove a session
pub async fn cancel_session(
    State(state): State<AppState>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<CancelledSession>, ApiError> {
    let (record, event) =
        cancel::cancel(&state.db, req.session_id, req.reason, req.cancelling_user).await?;

    state.dispatcher.publish(&event).await;

    Ok(Json(record))
}

/// GET /cancellations - Page through the cancellation archive
pub async fn list_cancellations(
    State(state): State<AppState>,
    Query(query): Query<CancellationListQuery>,
) -> Result<Json<CancellationPage>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let (items, total) = cancellations::list(&state.db, limit, offset, query.date).await?;

    Ok(Json(CancellationPage {
        total,
        limit,
        offset,
        items,
    }))
}

/// PUT /cancellations/:id/reason - Edit the reason text
pub async fn update_cancellation_reason(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateReasonRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    cancel::update_reason(&state.db, id, &req.reason).await?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

/// DELETE /cancellations/:id - Remove an archive record
pub async fn delete_cancellation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    cancel::delete(&state.db, id).await?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

// ============================================================================
// Dashboard Endpoint
// ============================================================================

/// GET /dashboard - Current occupancy snapshot
///
/// Also serves as the unthrottled request-update path for clients not
/// holding an SSE connection.
pub async fn dashboard_snapshot(
    State(state): State<AppState>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    let snapshot = dashboard::snapshot(&state.db).await?;
    Ok(Json(snapshot))
}
