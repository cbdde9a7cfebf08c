//! Config validation CLI tool
//!
//! Validates a slotkeeperd configuration file and reports any errors.

use slotkeeper_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a slotkeeperd configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match slotkeeper_config::load_config(&config_path) {
        Ok(settings) => {
            let calendar = &settings.calendar;
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", slotkeeper_config::CURRENT_CONFIG_VERSION);
            println!("  Opening hours: {} - {}", calendar.opening, calendar.closing);
            println!("  Slot length: {} min", calendar.slot_minutes);
            println!("  Horizon: {} days", calendar.horizon_days);
            println!(
                "  Slots: {} per day, {} total",
                calendar.slots_per_day(),
                calendar.total_slots()
            );
            if let Some(socket) = &settings.service.socket_path {
                println!("  Socket: {}", socket.display());
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                slotkeeper_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                slotkeeper_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                slotkeeper_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                slotkeeper_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        slotkeeper_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
