//! Dashboard subscriber hub
//!
//! Tracks connected subscribers and fans payloads out to all of them.
//! Delivery is fire-and-forget: a subscriber whose channel is gone is
//! pruned and logged, and a failed delivery never reaches the business
//! operation that triggered the broadcast. The hub is constructed once
//! at startup and shared through application state; its subscriber map
//! sits behind an explicit lock.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::service::dashboard::DashboardSnapshot;

/// Payloads delivered over the realtime channel
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelMessage {
    /// Sent point-to-point right after connecting
    Connected { subscriber_id: Uuid },
    /// Current full occupancy state
    Snapshot { snapshot: DashboardSnapshot },
}

impl ChannelMessage {
    /// SSE event name for this payload
    pub fn event_name(&self) -> &'static str {
        match self {
            ChannelMessage::Connected { .. } => "connected",
            ChannelMessage::Snapshot { .. } => "snapshot",
        }
    }
}

pub struct DashboardHub {
    subscribers: Mutex<HashMap<Uuid, mpsc::UnboundedSender<ChannelMessage>>>,
}

impl DashboardHub {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new subscriber and hand back its receiving end
    pub fn subscribe(&self) -> (Uuid, mpsc::UnboundedReceiver<ChannelMessage>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().insert(id, tx);
        debug!("Subscriber {} connected", id);
        (id, rx)
    }

    /// Remove a subscriber (called on disconnect)
    pub fn unsubscribe(&self, id: Uuid) {
        if self.subscribers.lock().unwrap().remove(&id).is_some() {
            debug!("Subscriber {} disconnected", id);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    /// Deliver to every connected subscriber; returns the delivered count
    ///
    /// Subscribers whose receiving end is gone are pruned here rather
    /// than erroring out the broadcast.
    pub fn broadcast(&self, message: ChannelMessage) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|id, tx| match tx.send(message.clone()) {
            Ok(()) => true,
            Err(_) => {
                debug!("Pruning disconnected subscriber {}", id);
                false
            }
        });
        subscribers.len()
    }

    /// Deliver to one subscriber; false if it is not connected
    pub fn send_to(&self, id: Uuid, message: ChannelMessage) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap();
        match subscribers.get(&id) {
            Some(tx) => {
                if tx.send(message).is_err() {
                    subscribers.remove(&id);
                    return false;
                }
                true
            }
            None => false,
        }
    }
}

impl Default for DashboardHub {
    fn default() -> Self {
        Self::new()
    }
}
