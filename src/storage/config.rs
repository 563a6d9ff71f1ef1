//! Application configuration loaded from TOML.

use crate::tracking::types::{ForegroundResume, TrackerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Config format version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Session controller settings
    pub tracking: TrackingSettings,
    /// Statistics settings
    pub statistics: StatisticsSettings,
    /// Database settings
    pub storage: StorageSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            tracking: TrackingSettings::default(),
            statistics: StatisticsSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl AppConfig {
    /// Full path of the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.storage.database_file)
    }
}

/// Session tracking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingSettings {
    /// Store write interval while active
    pub persist_interval_secs: u32,
    /// UI refresh interval
    pub ui_tick_interval_ms: u64,
    /// Step recomputation interval
    pub step_recompute_interval_secs: u32,
    /// GPS jitter cutoff in meters
    pub min_segment_m: f64,
    /// GPS teleport cutoff in meters
    pub max_segment_m: f64,
    /// Foreground auto-resume policy
    pub resume_on_foreground: ForegroundResume,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        let tracker = TrackerConfig::default();
        Self {
            persist_interval_secs: tracker.persist_interval_secs,
            ui_tick_interval_ms: tracker.ui_tick_interval_ms,
            step_recompute_interval_secs: tracker.step_recompute_interval_secs,
            min_segment_m: tracker.min_segment_m,
            max_segment_m: tracker.max_segment_m,
            resume_on_foreground: tracker.resume_on_foreground,
        }
    }
}

impl From<&TrackingSettings> for TrackerConfig {
    fn from(settings: &TrackingSettings) -> Self {
        Self {
            persist_interval_secs: settings.persist_interval_secs,
            step_recompute_interval_secs: settings.step_recompute_interval_secs,
            ui_tick_interval_ms: settings.ui_tick_interval_ms,
            min_segment_m: settings.min_segment_m,
            max_segment_m: settings.max_segment_m,
            resume_on_foreground: settings.resume_on_foreground,
        }
    }
}

/// Statistics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsSettings {
    /// Minimum steps for a day to count toward a streak
    pub streak_min_steps: u64,
}

impl Default for StatisticsSettings {
    fn default() -> Self {
        Self {
            streak_min_steps: 100,
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Database file name inside the data directory
    pub database_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_file: "fittrack.db".to_string(),
        }
    }
}

/// Get the data directory path.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "fittrack", "FitTrack")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the config file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&get_config_path(), get_data_dir())
}

/// Load configuration from `path`, using `data_dir` for runtime files.
///
/// A missing file yields defaults.
pub fn load_config_from(path: &Path, data_dir: PathBuf) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig {
            data_dir,
            ..Default::default()
        });
    }

    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.data_dir = data_dir;

    Ok(config)
}

/// Save configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path())
}

/// Save configuration to `path`.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
