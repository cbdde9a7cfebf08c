//! Configuration parsing and validation for slotkeeperd
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Calendar grid parameters (opening hours, slot length, horizon)
//! - Service settings (socket path, console output, rate limit)
//! - Validation with clear error messages
//!
//! Every field is optional; a missing file yields the defaults
//! (09:00-17:00, 15-minute slots, 14 days).

mod schema;
mod settings;
mod validation;

pub use schema::*;
pub use settings::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Settings> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Like [`load_config`], but a missing file yields the default settings
pub fn load_config_or_default(path: impl AsRef<Path>) -> ConfigResult<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        info!(path = %path.display(), "No config file, using defaults");
        return Ok(Settings::default());
    }

    load_config(path)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Settings> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Settings::from_raw(raw))
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use slotkeeper_util::WallClock;

    #[test]
    fn parse_minimal_config() {
        let settings = parse_config("config_version = 1").unwrap();
        assert_eq!(settings.calendar, CalendarConfig::default());
        assert_eq!(settings.calendar.slots_per_day(), 32);
        assert_eq!(settings.calendar.total_slots(), 448);
    }

    #[test]
    fn parse_full_config() {
        let config = r#"
            config_version = 1

            [service]
            socket_path = "/tmp/slotkeeper-test.sock"
            print_calendar = false

            [calendar]
            opening = "08:30"
            closing = "12:30"
            slot_minutes = 30
            horizon_days = 5
        "#;

        let settings = parse_config(config).unwrap();
        assert_eq!(settings.calendar.opening, WallClock::new(8, 30).unwrap());
        assert_eq!(settings.calendar.slots_per_day(), 8);
        assert_eq!(settings.calendar.total_slots(), 40);
        assert!(!settings.service.print_calendar);
        assert_eq!(
            settings.service.socket_path.as_deref(),
            Some(Path::new("/tmp/slotkeeper-test.sock"))
        );
    }

    #[test]
    fn reject_wrong_version() {
        let result = parse_config("config_version = 99");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_inverted_hours() {
        let config = r#"
            config_version = 1

            [calendar]
            opening = "17:00"
            closing = "09:00"
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_config_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.calendar.horizon_days, DEFAULT_HORIZON_DAYS);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "config_version = 1\n[calendar]\nhorizon_days = 3\n").unwrap();

        let settings = load_config(&path).unwrap();
        assert_eq!(settings.calendar.horizon_days, 3);
        assert_eq!(settings.calendar.total_slots(), 96);
    }
}
