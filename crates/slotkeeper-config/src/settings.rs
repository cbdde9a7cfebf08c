//! Validated settings structures

use crate::schema::{RawCalendarConfig, RawConfig, RawServiceConfig};
use crate::validation::parse_clock;
use slotkeeper_util::{WallClock, DEFAULT_REQUESTS_PER_SECOND};
use std::path::PathBuf;

/// Default daily opening time
pub const DEFAULT_OPENING: WallClock = WallClock { hour: 9, minute: 0 };

/// Default daily closing time
pub const DEFAULT_CLOSING: WallClock = WallClock { hour: 17, minute: 0 };

/// Default slot length in minutes
pub const DEFAULT_SLOT_MINUTES: u32 = 15;

/// Default number of days in the horizon (today + 13)
pub const DEFAULT_HORIZON_DAYS: u32 = 14;

/// Longest horizon accepted by validation
pub const MAX_HORIZON_DAYS: u32 = 366;

/// Validated settings ready for use by the service
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub service: ServiceConfig,
    pub calendar: CalendarConfig,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            calendar: CalendarConfig::from_raw(raw.calendar),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// None means use the default socket path
    pub socket_path: Option<PathBuf>,
    pub print_calendar: bool,
    pub colored_output: bool,
    pub requests_per_second: u32,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        let defaults = Self::default();
        Self {
            socket_path: raw.socket_path,
            print_calendar: raw.print_calendar.unwrap_or(defaults.print_calendar),
            colored_output: raw.colored_output.unwrap_or(defaults.colored_output),
            requests_per_second: raw
                .requests_per_second
                .unwrap_or(defaults.requests_per_second),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            print_calendar: true,
            colored_output: true,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

/// Shape of the slot grid: daily window, slot length and horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarConfig {
    pub opening: WallClock,
    pub closing: WallClock,
    pub slot_minutes: u32,
    pub horizon_days: u32,
}

impl CalendarConfig {
    fn from_raw(raw: RawCalendarConfig) -> Self {
        let clock = |value: Option<String>, default: WallClock| {
            value
                .and_then(|v| parse_clock(&v).ok())
                .unwrap_or(default)
        };

        Self {
            opening: clock(raw.opening, DEFAULT_OPENING),
            closing: clock(raw.closing, DEFAULT_CLOSING),
            slot_minutes: raw.slot_minutes.unwrap_or(DEFAULT_SLOT_MINUTES),
            horizon_days: raw.horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS),
        }
    }

    /// Length of one slot
    pub fn slot_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.slot_minutes))
    }

    /// Whole slots that fit between opening and closing
    pub fn slots_per_day(&self) -> usize {
        if self.slot_minutes == 0 {
            return 0;
        }
        let window = self
            .closing
            .as_minutes_from_midnight()
            .saturating_sub(self.opening.as_minutes_from_midnight());
        (window / self.slot_minutes) as usize
    }

    /// Slots across the whole horizon
    pub fn total_slots(&self) -> usize {
        self.slots_per_day() * self.horizon_days as usize
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            opening: DEFAULT_OPENING,
            closing: DEFAULT_CLOSING,
            slot_minutes: DEFAULT_SLOT_MINUTES,
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }
}
