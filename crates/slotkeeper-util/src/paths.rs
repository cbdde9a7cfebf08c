//! Default paths for slotkeeper components
//!
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/slotkeeper/slotkeeper.sock` or `/tmp/slotkeeper-$USER/slotkeeper.sock`
//! - Config: `$XDG_CONFIG_HOME/slotkeeper/config.toml` or `~/.config/slotkeeper/config.toml`

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const SLOTKEEPER_SOCKET_ENV: &str = "SLOTKEEPER_SOCKET";

/// Environment variable for overriding the config file path
pub const SLOTKEEPER_CONFIG_ENV: &str = "SLOTKEEPER_CONFIG";

/// Socket filename within the socket directory
const SOCKET_FILENAME: &str = "slotkeeper.sock";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Application subdirectory name
const APP_DIR: &str = "slotkeeper";

/// Get the default socket path.
///
/// Order of precedence:
/// 1. `$SLOTKEEPER_SOCKET` environment variable (if set)
/// 2. `$XDG_RUNTIME_DIR/slotkeeper/slotkeeper.sock` (if XDG_RUNTIME_DIR is set)
/// 3. `/tmp/slotkeeper-$USER/slotkeeper.sock` (fallback)
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(SLOTKEEPER_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Get the socket path without checking the SLOTKEEPER_SOCKET env var.
/// Used for default values in configs where the env var is checked separately.
pub fn socket_path_without_env() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$SLOTKEEPER_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/slotkeeper/config.toml` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/slotkeeper/config.toml`
/// 4. `/etc/slotkeeper/config.toml` (no home directory)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(SLOTKEEPER_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}
