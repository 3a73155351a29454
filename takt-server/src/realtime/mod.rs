//! Real-time synchronization: subscriber hub, broadcast throttle and
//! the domain-event dispatcher that ties them together

pub mod channel;
pub mod dispatcher;
pub mod throttle;

pub use channel::{ChannelMessage, DashboardHub};
pub use dispatcher::SnapshotDispatcher;
pub use throttle::BroadcastThrottler;
