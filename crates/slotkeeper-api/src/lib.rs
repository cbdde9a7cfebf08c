//! Protocol types for slotkeeper IPC
//!
//! This crate defines the stable API between slotkeeperd and clients:
//! - Commands (requests from clients)
//! - Responses
//! - Events (service -> clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;

/// Number of slots returned by a search when the client does not ask for a count
pub const DEFAULT_SEARCH_COUNT: usize = 5;
