//! Database access for the live session ledger, the cancellation
//! archive and the read-only reference catalogs

pub mod cancellations;
pub mod catalog;
pub mod sessions;
