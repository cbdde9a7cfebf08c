//! Configuration validation

use crate::schema::{RawCalendarConfig, RawConfig};
use crate::settings::{DEFAULT_CLOSING, DEFAULT_OPENING, DEFAULT_SLOT_MINUTES, MAX_HORIZON_DAYS};
use slotkeeper_util::{WallClock, parse_time_of_day};
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid time format '{value}': {message}")]
    InvalidTimeFormat { value: String, message: String },

    #[error("Closing time {closing} must be after opening time {opening}")]
    ClosingNotAfterOpening {
        opening: WallClock,
        closing: WallClock,
    },

    #[error("slot_minutes must be greater than zero")]
    ZeroSlotLength,

    #[error("A {slot_minutes}-minute slot does not fit between {opening} and {closing}")]
    SlotLongerThanDay {
        slot_minutes: u32,
        opening: WallClock,
        closing: WallClock,
    },

    #[error("horizon_days must be between 1 and {max}, got {value}")]
    HorizonOutOfRange { value: u32, max: u32 },

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = validate_calendar(&config.calendar);

    if config.service.requests_per_second == Some(0) {
        errors.push(ValidationError::GlobalError(
            "requests_per_second must be greater than zero".into(),
        ));
    }

    errors
}

fn validate_calendar(calendar: &RawCalendarConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let opening = validate_clock(calendar.opening.as_deref(), DEFAULT_OPENING, &mut errors);
    let closing = validate_clock(calendar.closing.as_deref(), DEFAULT_CLOSING, &mut errors);
    let slot_minutes = calendar.slot_minutes.unwrap_or(DEFAULT_SLOT_MINUTES);

    if slot_minutes == 0 {
        errors.push(ValidationError::ZeroSlotLength);
    }

    // Only compare hours that parsed; a bad string is already reported
    if let (Some(opening), Some(closing)) = (opening, closing) {
        if closing <= opening {
            errors.push(ValidationError::ClosingNotAfterOpening { opening, closing });
        } else if slot_minutes > 0
            && closing.as_minutes_from_midnight() - opening.as_minutes_from_midnight() < slot_minutes
        {
            errors.push(ValidationError::SlotLongerThanDay {
                slot_minutes,
                opening,
                closing,
            });
        }
    }

    if let Some(days) = calendar.horizon_days {
        if days == 0 || days > MAX_HORIZON_DAYS {
            errors.push(ValidationError::HorizonOutOfRange {
                value: days,
                max: MAX_HORIZON_DAYS,
            });
        }
    }

    errors
}

fn validate_clock(
    value: Option<&str>,
    default: WallClock,
    errors: &mut Vec<ValidationError>,
) -> Option<WallClock> {
    let Some(value) = value else {
        return Some(default);
    };

    match parse_clock(value) {
        Ok(clock) => Some(clock),
        Err(message) => {
            errors.push(ValidationError::InvalidTimeFormat {
                value: value.to_string(),
                message,
            });
            None
        }
    }
}

/// Parse an opening or closing hour. Accepts the same strings as a slot
/// start time, but only on a whole minute.
pub fn parse_clock(s: &str) -> Result<WallClock, String> {
    let time = parse_time_of_day(s).map_err(|e| e.to_string())?;
    let clock = WallClock::from_naive_time(time);
    if clock.to_naive_time() != time {
        return Err("Seconds must be zero".into());
    }
    Ok(clock)
}
