//! Test data builders for creating test objects

use datamon_rs::config::{ExportSettings, MonitorConfig, NanMarker};
use datamon_rs::Sample;

/// Builder for small monitor configs with predictable capacities
pub struct MonitorConfigBuilder {
    config: MonitorConfig,
}

impl MonitorConfigBuilder {
    /// 10 Hz ticks, 10-sample live window, 20-sample record window
    pub fn new() -> Self {
        Self {
            config: MonitorConfig {
                sample_period_s: 0.1,
                live_window_s: 1.0,
                record_sample_rate_hz: 10,
                record_window_s: 2.0,
                ..Default::default()
            },
        }
    }

    pub fn live_samples(mut self, n: usize) -> Self {
        self.config.live_window_s = n as f64 * self.config.sample_period_s;
        self
    }

    pub fn record_samples(mut self, n: usize) -> Self {
        self.config.record_sample_rate_hz = 1;
        self.config.record_window_s = n as f64;
        self
    }

    pub fn separator(mut self, separator: char) -> Self {
        self.config.export.field_separator = separator;
        self
    }

    pub fn nan_marker(mut self, marker: NanMarker) -> Self {
        self.config.export.nan_marker = marker;
        self
    }

    pub fn build(self) -> MonitorConfig {
        self.config
    }
}

impl Default for MonitorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Scalar samples `(t0 + i * dt, f(i))` for `i in 0..n`
pub fn ramp<F>(n: usize, t0: f64, dt: f64, f: F) -> Vec<Sample>
where
    F: Fn(usize) -> f64,
{
    (0..n)
        .map(|i| Sample::scalar(t0 + i as f64 * dt, f(i)))
        .collect()
}

/// Export settings with an empty NaN marker
pub fn empty_nan_settings() -> ExportSettings {
    ExportSettings {
        nan_marker: NanMarker::Empty,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = MonitorConfigBuilder::new()
            .live_samples(4)
            .record_samples(6)
            .build();
        assert_eq!(config.live_capacity(), 4);
        assert_eq!(config.record_capacity(), 6);
    }
}
