//! Configuration management for the clipstack daemon.
//!
//! Loads configuration from TOML files and provides runtime defaults.

use clipstack_store::DUPLICATE_WINDOW_MS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

/// Directory name under the user data root, per mode
const PROD_DIR_NAME: &str = "clipstack-pro";
const DEV_DIR_NAME: &str = "clipstack-pro-dev";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub presentation: PresentationConfig,
}

/// Where the store lives: a development build keeps its own history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Production,
    Development,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether capture is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level (trace, debug, info, warn, error), used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub mode: Mode,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: default_log_level(),
            mode: Mode::Production,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Overrides the platform data directory
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_db_file_name")]
    pub db_file_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            db_file_name: default_db_file_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Identical content within this many ms of the last copy is a repeat
    #[serde(default = "default_duplicate_window")]
    pub duplicate_window_ms: i64,

    /// Pending clipboard changes buffered ahead of the orchestrator
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            duplicate_window_ms: DUPLICATE_WINDOW_MS,
            queue_size: default_queue_size(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSection {
    /// Expose the action protocol on a Unix socket
    #[serde(default)]
    pub enabled: bool,

    /// Defaults to `<runtime_dir>/clipstack.sock`
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationConfig {
    /// Write refreshed history to stdout after each save
    #[serde(default = "default_true")]
    pub push_updates: bool,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self { push_updates: true }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_db_file_name() -> String {
    "clipstack.db".to_string()
}

fn default_duplicate_window() -> i64 {
    DUPLICATE_WINDOW_MS
}

fn default_queue_size() -> usize {
    100
}

impl Mode {
    /// Development mode when asked for on the command line or through the environment
    pub fn detect(dev_flag: bool, configured: Mode) -> Self {
        let env_dev = std::env::var("CLIPSTACK_ENV").map(|v| v == "development").unwrap_or(false);
        let debug_prod = std::env::var("DEBUG_PROD").map(|v| v == "true").unwrap_or(false);
        Self::resolve(dev_flag, env_dev, debug_prod, configured)
    }

    fn resolve(dev_flag: bool, env_dev: bool, debug_prod: bool, configured: Mode) -> Self {
        if dev_flag || env_dev || debug_prod {
            Mode::Development
        } else {
            configured
        }
    }

    fn dir_name(&self) -> &'static str {
        match self {
            Mode::Production => PROD_DIR_NAME,
            Mode::Development => DEV_DIR_NAME,
        }
    }
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clipstack")
            .join("config.toml")
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Directory holding the store for the configured mode
    pub fn data_dir(&self) -> PathBuf {
        let root = self
            .storage
            .data_dir
            .clone()
            .or_else(dirs::data_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        root.join(self.general.mode.dir_name())
    }

    /// Full path of the database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.db_file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.general.enabled);
        assert_eq!(config.general.mode, Mode::Production);
        assert_eq!(config.storage.db_file_name, "clipstack.db");
        assert_eq!(config.capture.duplicate_window_ms, 2000);
        assert!(!config.server.enabled);
        assert!(config.presentation.push_updates);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[general]
log_level = "debug"
mode = "development"

[storage]
data_dir = "/var/lib/clips"

[capture]
duplicate_window_ms = 500
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.general.enabled);
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.mode, Mode::Development);
        assert_eq!(config.capture.duplicate_window_ms, 500);
        assert_eq!(config.capture.queue_size, 100);
        assert_eq!(
            config.db_path(),
            PathBuf::from("/var/lib/clips/clipstack-pro-dev/clipstack.db")
        );
    }

    #[test]
    fn test_production_path() {
        let mut config = Config::default();
        config.storage.data_dir = Some(PathBuf::from("/data"));
        assert_eq!(config.db_path(), PathBuf::from("/data/clipstack-pro/clipstack.db"));
    }

    #[test]
    fn test_mode_resolution() {
        assert_eq!(Mode::resolve(false, false, false, Mode::Production), Mode::Production);
        assert_eq!(Mode::resolve(true, false, false, Mode::Production), Mode::Development);
        assert_eq!(Mode::resolve(false, true, false, Mode::Production), Mode::Development);
        assert_eq!(Mode::resolve(false, false, true, Mode::Production), Mode::Development);
        assert_eq!(Mode::resolve(false, false, false, Mode::Development), Mode::Development);
    }

    #[test]
    fn test_missing_or_broken_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_path(dir.path().join("absent.toml"));
        assert_eq!(config.storage.db_file_name, "clipstack.db");

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[general\nenabled = ").unwrap();
        let config = Config::load_from_path(broken);
        assert!(config.general.enabled);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.server.enabled = true;
        config.server.socket_path = Some(PathBuf::from("/tmp/clips.sock"));
        config.save_to_path(path.clone()).unwrap();

        let loaded = Config::load_from_path(path);
        assert!(loaded.server.enabled);
        assert_eq!(loaded.server.socket_path, Some(PathBuf::from("/tmp/clips.sock")));
    }
}
