//! The monitor session: variables, their sources, and the live and record
//! samplers they feed.
//!
//! Every variable gets its own [`SignalHandle`], registered with both
//! samplers. The live sampler runs continuously in overwrite mode; the
//! record sampler rejects once full and is enabled only while recording.
//!
//! # Tick
//!
//! [`Monitor::tick`] polls each source once, rebases the reading's timestamp
//! on the monitor's time origin and commits it. A source returning `None`
//! is skipped for that tick.

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result, ResultExt};
use crate::sampler::export;
use crate::sampler::{BufferView, ExportSummary, Sampler};
use crate::session::source::{now_seconds, SampleSource};
use crate::signal::{DerivativeSignalHandle, SignalHandle, VariableId};
use crate::types::Sample;
use std::path::{Path, PathBuf};

enum VariableKind {
    Sourced(Box<dyn SampleSource>),
    Derived(DerivativeSignalHandle),
}

struct Variable {
    name: String,
    handle: SignalHandle,
    kind: VariableKind,
}

/// Outcome of one [`Monitor::tick`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Variables that produced and committed a reading
    pub committed: usize,
    /// Variables whose source had no reading
    pub skipped: usize,
    /// Buffers that rejected a sample because they were full
    pub overflows: usize,
    /// Other listener failures
    pub failures: usize,
}

/// Running counters over the life of a monitor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorStats {
    pub ticks: u64,
    pub readings: u64,
    pub skipped: u64,
    pub overflows: u64,
    pub failures: u64,
    pub saves: u64,
}

impl MonitorStats {
    fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.readings += report.committed as u64;
        self.skipped += report.skipped as u64;
        self.overflows += report.overflows as u64;
        self.failures += report.failures as u64;
    }
}

/// Monitoring session
pub struct Monitor {
    config: MonitorConfig,
    origin: f64,
    variables: Vec<Variable>,
    live: Sampler,
    record: Sampler,
    recording: bool,
    sidecar: Option<String>,
    previous_path: Option<PathBuf>,
    stats: MonitorStats,
}

impl Monitor {
    /// Create a monitor whose time origin is now
    pub fn new(config: MonitorConfig) -> Result<Self> {
        Self::with_origin(config, now_seconds())
    }

    /// Create a monitor with an explicit time origin, in the same clock as
    /// its sources' timestamps
    pub fn with_origin(config: MonitorConfig, origin: f64) -> Result<Self> {
        config.validate()?;
        let live = Sampler::new(config.live_sampler_config());
        let record = Sampler::new(config.record_sampler_config());
        tracing::info!(
            "Monitor created: live capacity {}, record capacity {}",
            live.config().capacity,
            record.config().capacity
        );
        Ok(Self {
            config,
            origin,
            variables: Vec::new(),
            live,
            record,
            recording: false,
            sidecar: None,
            previous_path: None,
            stats: MonitorStats::default(),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Time origin that timestamps are rebased on
    pub fn origin(&self) -> f64 {
        self.origin
    }

    /// Register a variable fed by `source`
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        source: impl SampleSource + 'static,
    ) -> VariableId {
        let name = name.into();
        let handle = SignalHandle::with_name(name.clone());
        self.push_variable(name, handle, VariableKind::Sourced(Box::new(source)))
    }

    /// Register a variable carrying the time derivative of `of`
    pub fn add_derivative(
        &mut self,
        of: VariableId,
        name: impl Into<String>,
    ) -> Result<VariableId> {
        let upstream = self
            .variables
            .get(of.index())
            .ok_or(MonitorError::UnknownVariable(of.0))?;
        let derivative = DerivativeSignalHandle::new(&upstream.handle);
        let handle = derivative.handle().clone();
        Ok(self.push_variable(name.into(), handle, VariableKind::Derived(derivative)))
    }

    fn push_variable(
        &mut self,
        name: String,
        handle: SignalHandle,
        kind: VariableKind,
    ) -> VariableId {
        let id = VariableId(self.variables.len() as u32);
        self.live.add_signal(&handle, name.clone());
        self.record.add_signal(&handle, name.clone());
        tracing::debug!("Monitor: added variable {} '{}'", id, name);
        self.variables.push(Variable { name, handle, kind });
        id
    }

    /// Handle of a variable, for attaching further listeners
    pub fn handle(&self, id: VariableId) -> Option<&SignalHandle> {
        self.variables.get(id.index()).map(|v| &v.handle)
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Poll every source once and commit the readings
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        for variable in &mut self.variables {
            let VariableKind::Sourced(source) = &mut variable.kind else {
                continue;
            };
            let Some(reading) = source.read() else {
                report.skipped += 1;
                continue;
            };

            let sample = Sample::scalar(reading.timestamp - self.origin, reading.value);
            let delivery = variable.handle.commit_sample(sample);
            report.committed += 1;
            let overflows = delivery.overflow_count();
            report.overflows += overflows;
            report.failures += delivery.failures.len() - overflows;
        }

        if report.overflows > 0 || report.failures > 0 {
            tracing::debug!("Tick: {:?}", report);
        } else {
            tracing::trace!("Tick: {:?}", report);
        }
        self.stats.record(&report);
        report
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Clear the record sampler and start storing into it. Returns false if
    /// a recording was already running.
    pub fn start_recording(&mut self) -> bool {
        if self.recording {
            tracing::warn!("Recording already started");
            return false;
        }
        // Clearing is gated on enabled, so enable first
        self.record.set_enabled(true);
        self.record.clear_all();
        self.recording = true;
        tracing::info!("Recording started");
        true
    }

    /// Stop storing into the record sampler. Returns false if no recording
    /// was running.
    pub fn stop_recording(&mut self) -> bool {
        if !self.recording {
            tracing::warn!("Recording not running");
            return false;
        }
        self.record.set_enabled(false);
        self.recording = false;
        tracing::info!(
            "Recording stopped ({} overflowed sample(s))",
            self.record.overflow_count()
        );
        true
    }

    /// Register text written next to every export
    pub fn set_sidecar_text(&mut self, text: impl Into<String>) {
        self.sidecar = Some(text.into());
    }

    pub fn clear_sidecar_text(&mut self) {
        self.sidecar = None;
    }

    pub fn sidecar_text(&self) -> Option<&str> {
        self.sidecar.as_deref()
    }

    /// Export the record sampler to `path`.
    ///
    /// A running recording is stopped first. Missing parent folders are
    /// created. The sidecar text, if any, is written alongside. The path is
    /// remembered for [`Monitor::suggested_filename`].
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<ExportSummary> {
        let path = path.as_ref();
        if self.recording {
            self.stop_recording();
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create folder {}", parent.display()))?;
            }
        }

        let mut summary = self
            .record
            .export_to_csv(path, &self.config.export)
            .context("Failed to save recording")?;

        if let Some(text) = &self.sidecar {
            summary.sidecar = Some(export::write_sidecar(
                path,
                &self.config.export.sidecar_suffix,
                text,
            )?);
        }

        self.previous_path = Some(path.to_path_buf());
        self.stats.saves += 1;
        Ok(summary)
    }

    /// Save to `<folder>/<stem>.csv`
    pub fn save_to_folder(
        &mut self,
        folder: impl AsRef<Path>,
        stem: &str,
    ) -> Result<ExportSummary> {
        let path = folder.as_ref().join(format!("{}.csv", stem));
        self.save(path)
    }

    /// Last save path, or `sample_<date>_<time>.csv`
    pub fn suggested_filename(&self) -> PathBuf {
        self.previous_path.clone().unwrap_or_else(|| {
            PathBuf::from(
                chrono::Local::now()
                    .format("sample_%Y%m%d_%H%M%S.csv")
                    .to_string(),
            )
        })
    }

    pub fn previous_path(&self) -> Option<&Path> {
        self.previous_path.as_deref()
    }

    /// Rebuild both samplers from `config` and re-register every variable.
    /// Any recording is discarded.
    pub fn reset(&mut self, config: MonitorConfig) -> Result<()> {
        config.validate()?;
        self.live.rebuild(config.live_sampler_config());
        self.record.rebuild(config.record_sampler_config());
        self.recording = false;

        for variable in &self.variables {
            if let VariableKind::Derived(derivative) = &variable.kind {
                derivative.reset_state();
            }
            self.live.add_signal(&variable.handle, variable.name.clone());
            self.record.add_signal(&variable.handle, variable.name.clone());
        }
        tracing::info!(
            "Monitor reset with {} variable(s), live capacity {}, record capacity {}",
            self.variables.len(),
            config.live_capacity(),
            config.record_capacity()
        );
        self.config = config;
        Ok(())
    }

    pub fn live(&self) -> &Sampler {
        &self.live
    }

    pub fn record(&self) -> &Sampler {
        &self.record
    }

    pub fn live_views(&self) -> Vec<BufferView> {
        self.live.views()
    }

    pub fn record_views(&self) -> Vec<BufferView> {
        self.record.views()
    }

    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("variables", &self.variable_names())
            .field("recording", &self.recording)
            .field("live", &self.live)
            .field("record", &self.record)
            .finish()
    }
}
