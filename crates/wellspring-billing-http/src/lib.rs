//! HTTP backends for wellspring
//!
//! This crate provides reqwest implementations of the traits in
//! `wellspring-billing-api`:
//! - `HttpBilling`: subscription status, checkout and customer portal functions
//! - `HttpComplianceSink`: audit, consent and waiver recording functions
//! - `RefreshingCredentials`: bearer credentials renewed through the auth provider
//! - `StaticCredentials`: a fixed bearer credential

mod billing;
mod client;
mod compliance;
mod credentials;

pub use billing::*;
pub use compliance::*;
pub use credentials::*;
