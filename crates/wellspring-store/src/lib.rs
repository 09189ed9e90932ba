//! Persistence layer for wellspring
//!
//! Provides:
//! - Audit log (append-only)
//! - Local mirror of compliance records sent to the backend
//! - Key-value state (e.g. which users have seen the welcome dialog)

mod audit;
mod memory;
mod sqlite;
mod traits;

pub use audit::*;
pub use memory::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<StoreError> for wellspring_util::WellspringError {
    fn from(e: StoreError) -> Self {
        wellspring_util::WellspringError::store(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
