//! Event types for slotkeeperd -> client streaming

use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{SlotView, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: slotkeeper_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A slot was booked
    SlotBooked { slot: SlotView },

    /// A booking was cancelled and the slot is free again
    SlotCancelled {
        date: NaiveDate,
        start_time: NaiveTime,
    },

    /// The calendar was regenerated; all bookings are gone
    CalendarReset { slot_count: usize },

    /// Service is shutting down
    Shutdown,
}
