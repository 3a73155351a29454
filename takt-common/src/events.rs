//! Domain events for the TAKT event system
//!
//! The lifecycle services return one of these alongside their business
//! result; a dispatcher owns the throttled dashboard broadcast so that
//! notification failures can never fail the originating operation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// TAKT domain event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FloorEvent {
    /// A worker started a session at a post
    SessionOpened {
        session_id: Uuid,
        post_id: Uuid,
        worker_id: Uuid,
        timestamp: NaiveDateTime,
    },

    /// A worker closed their session at a post
    SessionClosed {
        session_id: Uuid,
        post_id: Uuid,
        worker_id: Uuid,
        duration_minutes: i64,
        timestamp: NaiveDateTime,
    },

    /// A session was removed from the live ledger and archived
    SessionCancelled {
        session_id: Uuid,
        cancellation_id: Uuid,
        timestamp: NaiveDateTime,
    },
}

impl FloorEvent {
    /// Event type string used for logging and SSE event names
    pub fn event_type(&self) -> &'static str {
        match self {
            FloorEvent::SessionOpened { .. } => "SessionOpened",
            FloorEvent::SessionClosed { .. } => "SessionClosed",
            FloorEvent::SessionCancelled { .. } => "SessionCancelled",
        }
    }
}
