//! Shared types for the slotkeeper API

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Summary of one slot as seen by clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotView {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub booked: bool,
    /// Empty when the slot is free
    pub client: String,
    pub description: String,
    pub advisor: String,
}

/// Every slot in the horizon, sorted by date then start time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSnapshot {
    pub api_version: u32,
    /// First day of the horizon. None before the calendar is initialized.
    pub first_day: Option<NaiveDate>,
    pub horizon_days: u32,
    pub slots: Vec<SlotView>,
}

impl CalendarSnapshot {
    pub fn booked_count(&self) -> usize {
        self.slots.iter().filter(|s| s.booked).count()
    }
}

/// Role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// Can search, book and cancel
    Client,
    /// Local admin - can also reset the calendar
    Admin,
}

impl ClientRole {
    pub fn can_reset_calendar(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub slot_count: usize,
    pub booked_count: usize,
}
