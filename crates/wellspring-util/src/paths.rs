//! Default paths for wellspring components
//!
//! Paths are user-writable by default:
//! - Config: `$XDG_CONFIG_HOME/wellspring/config.toml` or `~/.config/wellspring/config.toml`
//! - Data: `$XDG_DATA_HOME/wellspring` or `~/.local/share/wellspring`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const WELLSPRING_CONFIG_ENV: &str = "WELLSPRING_CONFIG";

/// Environment variable for overriding the data directory
pub const WELLSPRING_DATA_DIR_ENV: &str = "WELLSPRING_DATA_DIR";

/// Application subdirectory name
const APP_DIR: &str = "wellspring";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$WELLSPRING_CONFIG` environment variable (if set)
/// 2. `<config dir>/wellspring/config.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(WELLSPRING_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/etc"))
        .join(APP_DIR)
        .join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$WELLSPRING_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/wellspring` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/wellspring` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(WELLSPRING_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking WELLSPRING_DATA_DIR env var.
/// Used for default values in configs where the env var is checked separately.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}
