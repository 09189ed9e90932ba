//! Backend trait interfaces for wellspring
//!
//! This crate defines the seams between the core logic and the remote
//! services it talks to. It contains no network code itself:
//! - `BillingBackend`: subscription status, checkout and customer portal
//! - `CredentialProvider`: current bearer credential and refresh
//! - `ComplianceSink`: audit, consent and waiver recording
//!
//! Mock implementations are provided for tests.

mod mock;
mod token;
mod traits;

pub use mock::*;
pub use token::*;
pub use traits::*;
