//! Storage Layer
//!
//! Persists alert suppression windows in SQLite so that a (rule, value) pair
//! which already fired is not re-alerted until its window expires.

mod suppression;

pub use suppression::{SuppressionRecord, SuppressionStore, SUPPRESSION_TABLE};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Could not open database {path}: {reason}")]
    Connection { path: String, reason: String },
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}
