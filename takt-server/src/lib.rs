//! TAKT server library
//!
//! Real-time production post occupancy tracking: session lifecycle,
//! RFID badge toggle, cancellation archive and the throttled dashboard
//! broadcast. The router is exposed here so integration tests can
//! drive the HTTP surface in-process.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod realtime;
pub mod service;
pub mod store;

use realtime::{DashboardHub, SnapshotDispatcher};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Connected dashboard subscribers
    pub hub: Arc<DashboardHub>,
    /// Throttled broadcast owner
    pub dispatcher: Arc<SnapshotDispatcher>,
}

impl AppState {
    /// Create application state with a fresh hub and dispatcher
    pub fn new(db: SqlitePool, broadcast_interval: Duration) -> Self {
        let hub = Arc::new(DashboardHub::new());
        let dispatcher = Arc::new(SnapshotDispatcher::new(
            db.clone(),
            hub.clone(),
            broadcast_interval,
        ));
        Self {
            db,
            hub,
            dispatcher,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(api::health))
        // Session lifecycle
        .route("/production/entry", post(api::open_entry))
        .route("/production/exit", post(api::close_exit))
        .route("/production/open", get(api::resolve_open))
        // Badge toggle
        .route("/rfid/toggle", post(api::toggle_by_badge))
        // Cancellation archive
        .route("/production/cancel", post(api::cancel_session))
        .route("/cancellations", get(api::list_cancellations))
        .route("/cancellations/:id/reason", put(api::update_cancellation_reason))
        .route("/cancellations/:id", delete(api::delete_cancellation))
        // Dashboard
        .route("/dashboard", get(api::dashboard_snapshot))
        // SSE event stream
        .route("/events", get(api::event_stream))
        .route("/events/:id/refresh", post(api::request_refresh))
        // Attach application state
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Enable CORS for dashboard clients on other hosts
        .layer(CorsLayer::permissive())
}
