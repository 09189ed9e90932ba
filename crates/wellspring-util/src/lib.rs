//! Shared utilities for wellspring
//!
//! This crate provides:
//! - ID types (UserId, RecordId)
//! - Time utilities (mockable clock, countdown formatting, timestamp parsing)
//! - Error types
//! - Default paths for the config file and data directory

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
