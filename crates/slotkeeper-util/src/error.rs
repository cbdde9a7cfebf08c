//! Error types for slotkeeper

use thiserror::Error;

/// Input that could not be turned into a calendar date or time of day
#[derive(Debug, Error)]
pub enum SlotkeeperError {
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid time '{0}': expected HH:MM or HH:MM:SS")]
    InvalidTime(String),
}

pub type Result<T> = std::result::Result<T, SlotkeeperError>;
