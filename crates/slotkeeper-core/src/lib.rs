//! Slot allocation engine for slotkeeperd
//!
//! This crate is the heart of slotkeeper, containing:
//! - Slot grid generation over a rolling horizon of days
//! - Nearest-free-slot search
//! - Booking and cancellation with per-slot atomicity (Free <-> Booked)
//! - The console calendar table

mod display;
mod engine;
mod slot;

pub use display::*;
pub use engine::*;
pub use slot::*;
