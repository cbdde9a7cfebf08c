//! Shared utilities for slotkeeper
//!
//! This crate provides:
//! - Client IDs
//! - Time utilities (mockable wall clock, date and time-of-day parsing)
//! - Error types
//! - Rate limiting helpers
//! - Default paths for the socket and config file

mod error;
mod ids;
mod paths;
mod rate_limit;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use rate_limit::*;
pub use time::*;
