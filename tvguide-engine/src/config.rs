//! TOML configuration file.
//!
//! ```toml
//! [epg]
//! linger_time_mins = 60
//! days_to_display = 3
//! refresh_interval_secs = 300
//! cleanup_interval_secs = 600
//!
//! [grid]
//! minutes_per_block = 5
//! blocks_per_page = 24
//! channels_per_page = 8
//!
//! [logging]
//! log_dir = "logs"
//! retention_days = 7
//! level = "debug"
//! ```
//!
//! Every field is optional.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::grid::GridConfig;
use crate::scheduler::RefreshSchedulerConfig;
use crate::store::StoreConfig;

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tvguide.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Configuration file format.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub epg: EpgSection,
    #[serde(default)]
    pub grid: GridSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EpgSection {
    pub linger_time_mins: Option<i64>,
    pub days_to_display: Option<i64>,
    pub refresh_interval_secs: Option<u64>,
    pub cleanup_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GridSection {
    pub minutes_per_block: Option<u32>,
    pub blocks_per_page: Option<usize>,
    pub channels_per_page: Option<usize>,
    pub visible_width: Option<f32>,
    pub channel_height: Option<f32>,
    pub scroll_duration_ms: Option<u32>,
    pub wraparound: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSection {
    pub log_dir: Option<String>,
    pub retention_days: Option<u64>,
    pub level: Option<String>,
}

impl EngineConfig {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path, else `tvguide.toml` in the working directory if present.
    pub fn locate(explicit: Option<PathBuf>) -> Option<PathBuf> {
        explicit.or_else(|| {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            default_path.exists().then_some(default_path)
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = &self.grid;
        if grid.minutes_per_block == Some(0) {
            return Err(ConfigError::Invalid("grid.minutes_per_block must be > 0".into()));
        }
        if grid.blocks_per_page == Some(0) {
            return Err(ConfigError::Invalid("grid.blocks_per_page must be > 0".into()));
        }
        if grid.channels_per_page == Some(0) {
            return Err(ConfigError::Invalid("grid.channels_per_page must be > 0".into()));
        }
        if matches!(grid.visible_width, Some(w) if w <= 0.0) {
            return Err(ConfigError::Invalid("grid.visible_width must be > 0".into()));
        }
        if matches!(self.epg.linger_time_mins, Some(m) if m < 0) {
            return Err(ConfigError::Invalid("epg.linger_time_mins must not be negative".into()));
        }
        if matches!(self.epg.days_to_display, Some(d) if d <= 0) {
            return Err(ConfigError::Invalid("epg.days_to_display must be > 0".into()));
        }
        Ok(())
    }

    pub fn store_config(&self) -> StoreConfig {
        let defaults = StoreConfig::default();
        StoreConfig {
            linger_time: self
                .epg
                .linger_time_mins
                .map(chrono::Duration::minutes)
                .unwrap_or(defaults.linger_time),
            days_to_display: self.epg.days_to_display.unwrap_or(defaults.days_to_display),
        }
    }

    pub fn scheduler_config(&self) -> RefreshSchedulerConfig {
        let defaults = RefreshSchedulerConfig::default();
        RefreshSchedulerConfig {
            refresh_interval_secs: self
                .epg
                .refresh_interval_secs
                .unwrap_or(defaults.refresh_interval_secs),
            cleanup_interval_secs: self
                .epg
                .cleanup_interval_secs
                .unwrap_or(defaults.cleanup_interval_secs),
        }
    }

    pub fn grid_config(&self) -> GridConfig {
        let defaults = GridConfig::default();
        let grid = &self.grid;
        GridConfig {
            minutes_per_block: grid.minutes_per_block.unwrap_or(defaults.minutes_per_block),
            blocks_per_page: grid.blocks_per_page.unwrap_or(defaults.blocks_per_page),
            channels_per_page: grid.channels_per_page.unwrap_or(defaults.channels_per_page),
            visible_width: grid.visible_width.unwrap_or(defaults.visible_width),
            channel_height: grid.channel_height.unwrap_or(defaults.channel_height),
            scroll_duration_ms: grid.scroll_duration_ms.unwrap_or(defaults.scroll_duration_ms),
            wraparound: grid.wraparound.unwrap_or(defaults.wraparound),
        }
    }
}
