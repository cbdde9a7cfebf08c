//! Time utilities for slotkeeper
//!
//! The calendar lives in a single implicit zone (the host's local time), so
//! everything here deals in `chrono::Local` and naive dates/times.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `SLOTKEEPER_MOCK_TIME` environment variable can be set
//! to override the system time. "Today" (and therefore the first day of the
//! generated calendar) follows the mocked clock.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)
//!
//! Example:
//! ```bash
//! SLOTKEEPER_MOCK_TIME="2025-12-25 14:30:00" cargo run --bin slotkeeperd
//! ```

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::{Result, SlotkeeperError};

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "SLOTKEEPER_MOCK_TIME";

/// Wire format for calendar dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Accepted time-of-day layouts, tried in order
const TIME_FORMATS: [&str; 3] = ["%H:%M", "%H:%M:%S", "%H:%M:%S%.f"];

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    Ok(naive_dt) => match Local.from_local_datetime(&naive_dt).single() {
                        Some(mock_dt) => {
                            let offset = mock_dt.signed_duration_since(chrono::Local::now());
                            tracing::info!(
                                mock_time = %mock_time_str,
                                offset_secs = offset.num_seconds(),
                                "Mock time enabled"
                            );
                            return Some(offset);
                        }
                        None => {
                            tracing::warn!(
                                mock_time = %mock_time_str,
                                "Failed to convert mock time to local timezone"
                            );
                        }
                    },
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = "%Y-%m-%d %H:%M:%S",
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Today's local date, respecting mock time.
pub fn today() -> NaiveDate {
    now().date_naive()
}

/// Parse a calendar date in strict `YYYY-MM-DD` form.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    if !matches_shape(s, "dddd-dd-dd") {
        return Err(SlotkeeperError::InvalidDate(s.to_string()));
    }

    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| SlotkeeperError::InvalidDate(s.to_string()))
}

/// Parse a time of day: `HH:MM`, `HH:MM:SS` or `HH:MM:SS.fff` (1 to 9
/// fraction digits), every field two ASCII digits.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    let well_formed = match s.len() {
        5 => matches_shape(s, "dd:dd"),
        8 => matches_shape(s, "dd:dd:dd"),
        10..=18 => {
            let (clock, fraction) = s.split_at(9);
            matches_shape(clock, "dd:dd:dd.") && fraction.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    };
    if !well_formed {
        return Err(SlotkeeperError::InvalidTime(s.to_string()));
    }

    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| SlotkeeperError::InvalidTime(s.to_string()))
}

/// `d` in `shape` stands for one ASCII digit, any other byte must match exactly.
/// chrono alone accepts padded or signed numbers.
fn matches_shape(s: &str, shape: &str) -> bool {
    s.len() == shape.len()
        && s.bytes().zip(shape.bytes()).all(|(b, expected)| match expected {
            b'd' => b.is_ascii_digit(),
            other => b == other,
        })
}

/// Format a date the way it travels on the wire.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Format a time of day as `HH:MM`.
pub fn format_clock_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Wall-clock time of day with minute resolution, used for opening hours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallClock {
    pub hour: u8,
    pub minute: u8,
}

impl WallClock {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0).unwrap_or(NaiveTime::MIN)
    }

    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }

    /// Minutes since midnight
    pub fn as_minutes_from_midnight(&self) -> u32 {
        (self.hour as u32) * 60 + self.minute as u32
    }
}

impl PartialOrd for WallClock {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WallClock {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_minutes_from_midnight()
            .cmp(&other.as_minutes_from_midnight())
    }
}

impl std::fmt::Display for WallClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}
