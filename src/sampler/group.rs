//! A group of buffers sharing one capacity, overflow policy and enabled state.

use crate::config::{ExportSettings, SamplerConfig};
use crate::error::{MonitorError, Result};
use crate::sampler::buffer::{BufferView, SignalBuffer};
use crate::sampler::export::{self, ExportSummary};
use crate::signal::{BufferId, SignalHandle};
use crate::types::Matrix;
use std::path::Path;

/// Owning collection of [`SignalBuffer`]s.
///
/// Buffers are indexed by [`BufferId`] in registration order, which is also
/// the column order of exports.
#[derive(Debug)]
pub struct Sampler {
    config: SamplerConfig,
    enabled: bool,
    buffers: Vec<SignalBuffer>,
}

impl Sampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            config,
            enabled: config.enabled_initial,
            buffers: Vec::new(),
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Register a scalar signal
    pub fn add_signal(&mut self, handle: &SignalHandle, name: impl Into<String>) -> BufferId {
        self.push_buffer(handle, name.into(), 1)
    }

    /// Register a signal carrying `width` values per sample
    pub fn add_vector_signal(
        &mut self,
        handle: &SignalHandle,
        name: impl Into<String>,
        width: usize,
    ) -> Result<BufferId> {
        let name = name.into();
        if width == 0 {
            return Err(MonitorError::Config(format!(
                "signal '{}' must carry at least one value",
                name
            )));
        }
        Ok(self.push_buffer(handle, name, width))
    }

    fn push_buffer(&mut self, handle: &SignalHandle, name: String, width: usize) -> BufferId {
        // New buffers follow the sampler's current state, not the initial one
        let config = SamplerConfig {
            enabled_initial: self.enabled,
            ..self.config
        };
        let id = BufferId(self.buffers.len() as u32);
        tracing::debug!("Sampler: {:?} '{}' (width {})", id, name, width);
        self.buffers
            .push(SignalBuffer::new(handle, name, &config, width));
        id
    }

    pub fn buffers(&self) -> &[SignalBuffer] {
        &self.buffers
    }

    pub fn buffer(&self, id: BufferId) -> Option<&SignalBuffer> {
        self.buffers.get(id.index())
    }

    /// Find a buffer by signal name
    pub fn find(&self, name: &str) -> Option<&SignalBuffer> {
        self.buffers.iter().find(|b| b.name() == name)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.buffers.iter().map(SignalBuffer::name).collect()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        for buffer in &self.buffers {
            buffer.set_enabled(enabled);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Clear every buffer. Disabled buffers keep their contents. Returns the
    /// number of buffers cleared.
    ///
    /// Buffers are cleared directly rather than through their handles, so
    /// other listeners on the same handles are not affected.
    pub fn clear_all(&self) -> usize {
        self.buffers.iter().filter(|b| b.clear()).count()
    }

    /// Unsubscribe and drop every buffer, then adopt `config`.
    pub fn rebuild(&mut self, config: SamplerConfig) {
        let dropped = self.buffers.len();
        for buffer in &mut self.buffers {
            buffer.unsubscribe();
        }
        self.buffers.clear();
        self.config = config;
        self.enabled = config.enabled_initial;
        tracing::info!(
            "Sampler rebuilt: dropped {} buffer(s), capacity {}, overwrite {}",
            dropped,
            config.capacity,
            config.overwrite_on_full
        );
    }

    /// Read-only views of every buffer, in registration order
    pub fn views(&self) -> Vec<BufferView> {
        self.buffers.iter().map(SignalBuffer::view).collect()
    }

    /// Samples rejected by all buffers since they were created
    pub fn overflow_count(&self) -> u64 {
        self.buffers.iter().map(SignalBuffer::overflow_count).sum()
    }

    /// Whether any buffer holds samples
    pub fn has_data(&self) -> bool {
        self.buffers.iter().any(|b| !b.is_empty())
    }

    /// Export header: `Time` followed by one column per value component
    pub fn header(&self) -> Vec<String> {
        export::header_for(self.buffers.iter().map(|b| (b.name(), b.width())))
    }

    /// Merged contents, one row per sample slot and one column per header
    /// field. See [`export`](crate::sampler::export) for the packing.
    pub fn export(&self) -> Matrix {
        let snapshots: Vec<Matrix> = self.buffers.iter().map(SignalBuffer::snapshot).collect();
        export::pack_column_blocks(&snapshots).transpose()
    }

    /// Write [`Sampler::export`] to a CSV file, overwriting it.
    pub fn export_to_csv(
        &self,
        path: impl AsRef<Path>,
        settings: &ExportSettings,
    ) -> Result<ExportSummary> {
        export::write_csv(path.as_ref(), &self.header(), &self.export(), settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sample;

    #[test]
    fn test_new_buffers_follow_sampler_state() {
        let handle = SignalHandle::new();
        let mut sampler = Sampler::new(SamplerConfig::record(10));
        let a = sampler.add_signal(&handle, "a");
        assert!(!sampler.buffer(a).unwrap().is_enabled());

        sampler.set_enabled(true);
        let b = sampler.add_signal(&handle, "b");
        assert!(sampler.buffer(a).unwrap().is_enabled());
        assert!(sampler.buffer(b).unwrap().is_enabled());
        assert_eq!(sampler.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_zero_width_vector_rejected() {
        let handle = SignalHandle::new();
        let mut sampler = Sampler::new(SamplerConfig::live(10));
        assert!(sampler.add_vector_signal(&handle, "v", 0).is_err());
        assert!(sampler.is_empty());
    }

    #[test]
    fn test_clear_all_respects_enabled() {
        let handle = SignalHandle::new();
        let mut sampler = Sampler::new(SamplerConfig::live(10));
        let a = sampler.add_signal(&handle, "a");
        let b = sampler.add_signal(&handle, "b");
        handle.commit_sample(Sample::scalar(0.0, 1.0));

        assert_eq!(sampler.clear_all(), 2);
        assert!(sampler.buffer(a).unwrap().is_empty());

        handle.commit_sample(Sample::scalar(1.0, 1.0));
        sampler.buffer(b).unwrap().set_enabled(false);
        assert_eq!(sampler.clear_all(), 1);
        assert!(sampler.buffer(a).unwrap().is_empty());
        assert_eq!(sampler.buffer(b).unwrap().len(), 1);
    }

    #[test]
    fn test_rebuild_detaches_everything() {
        let handle = SignalHandle::new();
        let mut sampler = Sampler::new(SamplerConfig::live(10));
        sampler.add_signal(&handle, "a");
        sampler.add_signal(&handle, "b");
        assert_eq!(handle.listener_count(), 2);

        sampler.rebuild(SamplerConfig::record(3));
        assert!(sampler.is_empty());
        assert_eq!(handle.listener_count(), 0);
        assert!(!sampler.is_enabled());
        assert_eq!(sampler.config().capacity, 3);

        handle.commit_sample(Sample::scalar(0.0, 1.0));
    }

    #[test]
    fn test_export_two_plus_three() {
        let a = SignalHandle::with_name("a");
        let b = SignalHandle::with_name("b");
        let mut sampler = Sampler::new(SamplerConfig::live(10));
        sampler.add_signal(&a, "a");
        sampler.add_signal(&b, "b");

        for i in 0..2 {
            a.commit_sample(Sample::scalar(i as f64, 10.0 + i as f64));
        }
        for i in 0..3 {
            b.commit_sample(Sample::scalar(0.5 + i as f64, 20.0 + i as f64));
        }

        let table = sampler.export();
        assert_eq!(table.shape(), (5, 3));
        assert_eq!(sampler.header(), vec!["Time", "a", "b"]);

        let times: Vec<f64> = table.iter_rows().map(|r| r[0]).collect();
        assert_eq!(times, vec![0.0, 1.0, 0.5, 1.5, 2.5]);
        assert_eq!(table.get(1, 1), 11.0);
        assert!(table.get(1, 2).is_nan());
        assert!(table.get(2, 1).is_nan());
        assert_eq!(table.get(4, 2), 22.0);
    }

    #[test]
    fn test_export_vector_signal_header() {
        let handle = SignalHandle::new();
        let mut sampler = Sampler::new(SamplerConfig::live(4));
        sampler.add_vector_signal(&handle, "xyz", 3).unwrap();
        handle.commit_sample(Sample::new(0.0, vec![1.0, 2.0, 3.0]));

        assert_eq!(sampler.header(), vec!["Time", "xyz[0]", "xyz[1]", "xyz[2]"]);
        let table = sampler.export();
        assert_eq!(table.row(0), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_export_empty_sampler() {
        let sampler = Sampler::new(SamplerConfig::live(4));
        assert_eq!(sampler.export().shape(), (0, 1));
        assert_eq!(sampler.header(), vec!["Time"]);
        assert!(!sampler.has_data());
    }
}
