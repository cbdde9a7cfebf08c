//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global service settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Slot grid parameters
    #[serde(default)]
    pub calendar: RawCalendarConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path (default: $XDG_RUNTIME_DIR/slotkeeper/slotkeeper.sock)
    pub socket_path: Option<PathBuf>,

    /// Print the calendar table at startup and after every change
    pub print_calendar: Option<bool>,

    /// Use ANSI colors in the calendar table
    pub colored_output: Option<bool>,

    /// Requests per second allowed for each connected client
    pub requests_per_second: Option<u32>,
}

/// Slot grid parameters
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawCalendarConfig {
    /// Start of the first slot of each day (HH:MM)
    pub opening: Option<String>,

    /// No slot ends after this time (HH:MM)
    pub closing: Option<String>,

    /// Length of every slot in minutes
    pub slot_minutes: Option<u32>,

    /// Number of consecutive days, starting today
    pub horizon_days: Option<u32>,
}
