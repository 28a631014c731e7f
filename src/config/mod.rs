//! Configuration module for DataMon-RS
//!
//! This module handles the monitor configuration:
//! - Acquisition timing (sample period, refresh rate)
//! - Live and record window sizes, from which buffer capacities derive
//! - Export layout
//!
//! # Config Location
//!
//! A default config file is looked up in the platform config directory
//! under `dev.hxyulin.datamon-rs`:
//!
//! - **Linux**: `~/.config/dev.hxyulin.datamon-rs/datamon.toml`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.datamon-rs/datamon.toml`
//! - **Windows**: `%APPDATA%\dev.hxyulin.datamon-rs\datamon.toml`
//!
//! Files are TOML; a `.json` extension selects JSON instead.
//!
//! # Example
//!
//! ```ignore
//! use datamon_rs::config::MonitorConfig;
//!
//! let config = MonitorConfig::load("datamon.toml")?;
//! assert_eq!(config.live_capacity(), 2000);
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{MonitorError, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config directories
pub const APP_ID: &str = "dev.hxyulin.datamon-rs";

/// Default config filename
pub const CONFIG_FILE: &str = "datamon.toml";

/// Default acquisition period in seconds (100 Hz)
pub const DEFAULT_SAMPLE_PERIOD_S: f64 = 0.01;

/// Default view refresh rate in Hz
pub const DEFAULT_REFRESH_RATE_HZ: u32 = 20;

/// Default live window in seconds
pub const DEFAULT_LIVE_WINDOW_S: f64 = 20.0;

/// Default recording sample rate in Hz
pub const DEFAULT_RECORD_SAMPLE_RATE_HZ: u32 = 500;

/// Default maximum recording length in seconds
pub const DEFAULT_RECORD_WINDOW_S: f64 = 5.0 * 60.0;

/// Path of the default config file, if a config directory exists
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Acquisition tick period in seconds
    pub sample_period_s: f64,

    /// View refresh rate in Hz
    pub refresh_rate_hz: u32,

    /// Seconds of history kept by the live sampler
    pub live_window_s: f64,

    /// Sample rate used to size the record sampler
    pub record_sample_rate_hz: u32,

    /// Maximum recording length in seconds
    pub record_window_s: f64,

    /// Export settings
    pub export: ExportSettings,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_period_s: DEFAULT_SAMPLE_PERIOD_S,
            refresh_rate_hz: DEFAULT_REFRESH_RATE_HZ,
            live_window_s: DEFAULT_LIVE_WINDOW_S,
            record_sample_rate_hz: DEFAULT_RECORD_SAMPLE_RATE_HZ,
            record_window_s: DEFAULT_RECORD_WINDOW_S,
            export: ExportSettings::default(),
        }
    }
}

impl MonitorConfig {
    /// Live buffer capacity: samples per second times the live window
    pub fn live_capacity(&self) -> usize {
        (self.live_window_s / self.sample_period_s).round().max(0.0) as usize
    }

    /// Record buffer capacity: record rate times the record window
    pub fn record_capacity(&self) -> usize {
        (self.record_sample_rate_hz as f64 * self.record_window_s)
            .round()
            .max(0.0) as usize
    }

    pub fn live_sampler_config(&self) -> SamplerConfig {
        SamplerConfig::live(self.live_capacity())
    }

    pub fn record_sampler_config(&self) -> SamplerConfig {
        SamplerConfig::record(self.record_capacity())
    }

    /// Interval between acquisition ticks
    pub fn tick_interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.sample_period_s).map_err(|e| {
            MonitorError::Config(format!(
                "sample period {} is not a valid interval: {}",
                self.sample_period_s, e
            ))
        })
    }

    /// Interval between view refreshes
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.refresh_rate_hz.max(1) as u64)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sample_period_s.is_finite() && self.sample_period_s > 0.0) {
            return Err(MonitorError::Config(format!(
                "sample period must be positive, got {}",
                self.sample_period_s
            )));
        }
        self.tick_interval()?;
        if self.refresh_rate_hz == 0 {
            return Err(MonitorError::Config(
                "refresh rate must be non-zero".to_string(),
            ));
        }
        self.live_sampler_config()
            .validate()
            .context("live sampler")?;
        self.record_sampler_config()
            .validate()
            .context("record sampler")?;
        self.export.validate()
    }

    /// Load a config file (TOML, or JSON for `.json` paths)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;

        let config: MonitorConfig = if is_json(path) {
            serde_json::from_str(&content)
                .map_err(|e| MonitorError::Serialization(e.to_string()))?
        } else {
            toml::from_str(&content).map_err(|e| MonitorError::Serialization(e.to_string()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Load a config file, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Using default config, failed to load {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save the config, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory {}", parent.display())
                })?;
            }
        }

        let content = if is_json(path) {
            serde_json::to_string_pretty(self)
                .map_err(|e| MonitorError::Serialization(e.to_string()))?
        } else {
            toml::to_string_pretty(self).map_err(|e| MonitorError::Serialization(e.to_string()))?
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
