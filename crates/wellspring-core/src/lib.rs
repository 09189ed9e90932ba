//! Core logic for wellspring
//!
//! This crate contains:
//! - Join window evaluation (when a booked session can be joined) and a ticking watch
//! - Subscription reconciliation with sequence fencing
//! - Periodic subscription monitoring driven by the signed-in identity
//! - Checkout and customer portal actions returning redirect URLs
//! - Fire-and-forget compliance recording with a local mirror
//! - First-run welcome tracking

mod billing;
mod compliance;
mod credential;
mod events;
mod join_window;
mod monitor;
mod subscription;
mod welcome;

pub use billing::*;
pub use compliance::*;
pub use credential::*;
pub use events::*;
pub use join_window::*;
pub use monitor::*;
pub use subscription::*;
pub use welcome::*;
