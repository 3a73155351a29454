//! Database access shared across TAKT services

pub mod init;
pub mod models;

pub use init::{create_schema, init_database};

use crate::{Error, Result};
use uuid::Uuid;

/// Parse a TEXT uuid column read back from the database
pub fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("invalid uuid in database: {}", e)))
}

/// Parse an optional TEXT uuid column
pub fn parse_uuid_opt(value: Option<String>) -> Result<Option<Uuid>> {
    match value {
        Some(s) => parse_uuid(&s).map(Some),
        None => Ok(None),
    }
}
