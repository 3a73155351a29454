//! Business services: session lifecycle, badge toggle, cancellation
//! archival and dashboard aggregation

pub mod cancel;
pub mod dashboard;
pub mod lifecycle;
pub mod rfid;
