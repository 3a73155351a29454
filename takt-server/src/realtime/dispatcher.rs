//! Snapshot dispatcher
//!
//! Subscribes the realtime side to the domain events returned by the
//! business services. Owns the throttle and the hub: handlers call
//! `publish` after a successful operation and the dispatcher decides
//! whether a broadcast actually goes out. Everything here logs and
//! swallows its own failures; the business result is already decided
//! by the time publish runs.

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use takt_common::events::FloorEvent;
use takt_common::{Error, Result};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::service::dashboard;

use super::channel::{ChannelMessage, DashboardHub};
use super::throttle::BroadcastThrottler;

pub struct SnapshotDispatcher {
    db: SqlitePool,
    hub: Arc<DashboardHub>,
    throttler: BroadcastThrottler,
}

impl SnapshotDispatcher {
    pub fn new(db: SqlitePool, hub: Arc<DashboardHub>, min_interval: Duration) -> Self {
        Self {
            db,
            hub,
            throttler: BroadcastThrottler::new(min_interval),
        }
    }

    /// React to a domain event with a throttled dashboard broadcast
    pub async fn publish(&self, event: &FloorEvent) {
        debug!("Domain event: {}", event.event_type());
        self.notify(false).await;
    }

    /// Throttled broadcast of the current snapshot
    ///
    /// `force` bypasses the interval (used when a burst must end with a
    /// guaranteed emission). All failures are logged, never returned.
    pub async fn notify(&self, force: bool) {
        if !self.throttler.should_emit(force) {
            return;
        }

        match dashboard::snapshot(&self.db).await {
            Ok(snapshot) => {
                let delivered = self
                    .hub
                    .broadcast(ChannelMessage::Snapshot { snapshot });
                debug!("Dashboard snapshot broadcast to {} subscribers", delivered);
            }
            Err(e) => warn!("Dashboard broadcast skipped: {}", e),
        }
    }

    /// Unthrottled point-to-point snapshot for one subscriber
    pub async fn send_snapshot_to(&self, subscriber_id: Uuid) -> Result<()> {
        let snapshot = dashboard::snapshot(&self.db).await?;
        if !self
            .hub
            .send_to(subscriber_id, ChannelMessage::Snapshot { snapshot })
        {
            return Err(Error::NotFound(format!(
                "subscriber {} is not connected",
                subscriber_id
            )));
        }
        Ok(())
    }
}
