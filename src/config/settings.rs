//! Sampler and export settings
//!
//! These are the explicit configuration structs handed to constructors.
//! Nothing in the crate reads global settings.
//!
//! # Main Types
//!
//! - [`SamplerConfig`] - Capacity, overflow policy and initial enabled state
//! - [`ExportSettings`] - CSV layout options for exports
//! - [`NanMarker`] - How NaN cells are written

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};

/// Shared configuration of every buffer in a `Sampler`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Maximum samples per buffer
    pub capacity: usize,
    /// Evict the oldest sample when full ("continuous" mode); otherwise
    /// reject the newest
    pub overwrite_on_full: bool,
    /// Enabled state of the sampler when created
    pub enabled_initial: bool,
}

impl SamplerConfig {
    pub fn new(capacity: usize, overwrite_on_full: bool, enabled_initial: bool) -> Self {
        Self {
            capacity,
            overwrite_on_full,
            enabled_initial,
        }
    }

    /// Continuous, enabled sampler used for the live view
    pub fn live(capacity: usize) -> Self {
        Self::new(capacity, true, true)
    }

    /// Reject-on-full sampler that starts disabled, used for recordings
    pub fn record(capacity: usize) -> Self {
        Self::new(capacity, false, false)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(MonitorError::Config(
                "sampler capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// How NaN cells are written to CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NanMarker {
    /// Literal `nan`
    #[default]
    Text,
    /// Empty cell
    Empty,
}

impl NanMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            NanMarker::Text => "nan",
            NanMarker::Empty => "",
        }
    }
}

/// Data export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Field separator for CSV export
    pub field_separator: char,

    /// Marker written for NaN cells
    pub nan_marker: NanMarker,

    /// Include header row in CSV export
    pub include_header: bool,

    /// Suffix appended to the export path (without extension) for the
    /// auxiliary text file
    pub sidecar_suffix: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            field_separator: ',',
            nan_marker: NanMarker::Text,
            include_header: true,
            sidecar_suffix: String::from("_loaddata.txt"),
        }
    }
}

impl ExportSettings {
    /// Separator as the single byte the CSV writer needs
    pub fn delimiter(&self) -> Result<u8> {
        let c = self.field_separator;
        if !c.is_ascii() || c == '"' || c == '\n' || c == '\r' {
            return Err(MonitorError::Config(format!(
                "unsupported field separator {:?}",
                c
            )));
        }
        Ok(c as u8)
    }

    pub fn validate(&self) -> Result<()> {
        self.delimiter()?;
        if self.sidecar_suffix.is_empty() {
            return Err(MonitorError::Config(
                "sidecar suffix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
