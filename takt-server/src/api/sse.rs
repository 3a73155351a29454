//! Server-Sent Events (SSE) stream for dashboard subscribers
//!
//! Streams occupancy snapshots to connected clients. A new subscriber
//! immediately receives its subscriber id and one unthrottled snapshot;
//! everything after that arrives through the throttled broadcast.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::Stream;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::realtime::{ChannelMessage, DashboardHub};
use crate::service::dashboard;
use crate::AppState;

use super::handlers::StatusResponse;
use super::ApiError;

/// Removes the subscriber from the hub when the client goes away
struct SubscriberGuard {
    hub: Arc<DashboardHub>,
    id: Uuid,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}

/// GET /events - SSE subscription
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, mut rx) = state.hub.subscribe();
    info!(
        "New dashboard subscriber {} ({} connected)",
        id,
        state.hub.subscriber_count()
    );

    // Point-to-point hello plus one immediate snapshot, independent of
    // the broadcast throttle
    state
        .hub
        .send_to(id, ChannelMessage::Connected { subscriber_id: id });
    match dashboard::snapshot(&state.db).await {
        Ok(snapshot) => {
            state.hub.send_to(id, ChannelMessage::Snapshot { snapshot });
        }
        Err(e) => warn!("Initial snapshot for subscriber {} failed: {}", id, e),
    }

    let hub = state.hub.clone();
    let stream = async_stream::stream! {
        let _guard = SubscriberGuard { hub, id };
        while let Some(message) = rx.recv().await {
            match Event::default()
                .event(message.event_name())
                .json_data(&message)
            {
                Ok(event) => yield Ok::<_, Infallible>(event),
                Err(e) => {
                    warn!("Failed to serialize SSE payload: {}", e);
                }
            }
        }
        debug!("SSE stream for subscriber {} ended", id);
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// POST /events/:id/refresh - Point-to-point snapshot on request
///
/// Bypasses the throttle entirely; only the requesting subscriber
/// receives the payload.
pub async fn request_refresh(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.dispatcher.send_snapshot_to(id).await?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}
