//! Wire types for the wellspring backend functions
//!
//! This crate defines the JSON shapes exchanged with:
//! - The billing-status, checkout and customer-portal functions
//! - The audit, consent and waiver recording functions
//! - The auth provider's token refresh endpoint

mod auth;
mod billing;
mod compliance;

pub use auth::*;
pub use billing::*;
pub use compliance::*;
