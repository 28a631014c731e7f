//! Fixed-capacity time-series buffers.
//!
//! A [`SignalBuffer`] stores the samples of one signal in a ring, bounded by
//! its capacity. It is bound to exactly one `SignalHandle` for its whole
//! life and only stores (or clears) while enabled.
//!
//! # Overflow Policy
//!
//! With `overwrite_on_full` the oldest sample is evicted. Without it the
//! buffer rejects the newest: samples that do not fit are dropped, the
//! overflow counter grows by one per rejected sample, and the delivery
//! reports [`MonitorError::BufferOverflow`] once, carrying the rejected
//! count. The part of a batch that fits is kept.
//!
//! # Concurrency
//!
//! The ring sits behind an `RwLock`: commits take the write side,
//! snapshots the read side. [`BufferView`] is a read-only clone that can be
//! handed to a rendering thread.

use crate::config::SamplerConfig;
use crate::error::{MonitorError, Result};
use crate::signal::{Listener, ListenerId, SignalHandle, Subscription};
use crate::types::{Matrix, Sample};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Result of pushing one sample into a [`RingStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Stored without eviction
    Stored,
    /// Stored after evicting the oldest sample
    Evicted,
    /// Rejected because the store is full
    Rejected,
}

/// Bounded FIFO of samples
#[derive(Debug, Clone)]
pub struct RingStore {
    samples: VecDeque<Sample>,
    capacity: usize,
    overwrite_on_full: bool,
}

impl RingStore {
    pub fn new(capacity: usize, overwrite_on_full: bool) -> Self {
        Self {
            // Large record buffers are allocated lazily
            samples: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            overwrite_on_full,
        }
    }

    pub fn push(&mut self, sample: Sample) -> PushOutcome {
        if self.samples.len() < self.capacity {
            self.samples.push_back(sample);
            return PushOutcome::Stored;
        }
        if !self.overwrite_on_full {
            return PushOutcome::Rejected;
        }
        // Zero capacity evicts the incoming sample itself
        if self.samples.pop_front().is_some() {
            self.samples.push_back(sample);
        }
        PushOutcome::Evicted
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Samples oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }
}

struct BufferInner {
    name: String,
    width: usize,
    overwrite_on_full: bool,
    capacity: usize,
    enabled: AtomicBool,
    store: RwLock<RingStore>,
    overflow_count: AtomicU64,
}

impl BufferInner {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn len(&self) -> usize {
        self.store.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn samples(&self) -> Vec<Sample> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn last(&self) -> Option<Sample> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    fn snapshot(&self) -> Matrix {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let mut matrix = Matrix::nan(1 + self.width, store.len());
        for (col, sample) in store.iter().enumerate() {
            matrix.set(0, col, sample.timestamp);
            for (k, value) in sample.values.iter().enumerate() {
                matrix.set(1 + k, col, *value);
            }
        }
        matrix
    }

    fn clear_if_enabled(&self) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        true
    }
}

impl Listener for BufferInner {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_commit(&self, samples: &[Sample]) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        if let Some(bad) = samples.iter().find(|s| s.width() != self.width) {
            return Err(MonitorError::ShapeMismatch {
                buffer: self.name.clone(),
                expected: self.width,
                actual: bad.width(),
            });
        }

        let rejected = {
            let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
            samples
                .iter()
                .filter(|s| store.push((*s).clone()) == PushOutcome::Rejected)
                .count()
        };

        if rejected == 0 {
            return Ok(());
        }

        let before = self
            .overflow_count
            .fetch_add(rejected as u64, Ordering::AcqRel);
        if before == 0 {
            tracing::warn!(
                "Buffer '{}' is full at {} samples, rejecting new samples",
                self.name,
                self.capacity
            );
        }
        Err(MonitorError::BufferOverflow {
            buffer: self.name.clone(),
            capacity: self.capacity,
            rejected,
        })
    }

    fn handles_clear(&self) -> bool {
        true
    }

    fn on_clear(&self) -> Result<()> {
        self.clear_if_enabled();
        Ok(())
    }
}

/// Per-signal bounded store, subscribed to one handle.
pub struct SignalBuffer {
    inner: Arc<BufferInner>,
    subscription: Subscription,
}

impl SignalBuffer {
    /// Create a buffer with `config`'s capacity and policy, enabled according
    /// to `config.enabled_initial`, and subscribe it to `handle`.
    pub fn new(
        handle: &SignalHandle,
        name: impl Into<String>,
        config: &SamplerConfig,
        width: usize,
    ) -> Self {
        let inner = Arc::new(BufferInner {
            name: name.into(),
            width,
            overwrite_on_full: config.overwrite_on_full,
            capacity: config.capacity,
            enabled: AtomicBool::new(config.enabled_initial),
            store: RwLock::new(RingStore::new(config.capacity, config.overwrite_on_full)),
            overflow_count: AtomicU64::new(0),
        });
        let subscription = handle.subscribe(inner.clone());
        Self {
            inner,
            subscription,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Values per sample
    pub fn width(&self) -> usize {
        self.inner.width
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn overwrite_on_full(&self) -> bool {
        self.inner.overwrite_on_full
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }

    /// Flip the enabled flag. Does not clear or backfill.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples rejected so far because the buffer was full
    pub fn overflow_count(&self) -> u64 {
        self.inner.overflow_count.load(Ordering::Acquire)
    }

    /// `(1 + width) × len` matrix, oldest sample first
    pub fn snapshot(&self) -> Matrix {
        self.inner.snapshot()
    }

    /// Stored samples, oldest first
    pub fn samples(&self) -> Vec<Sample> {
        self.inner.samples()
    }

    pub fn last(&self) -> Option<Sample> {
        self.inner.last()
    }

    /// Empty the store. A disabled buffer is left untouched; returns whether
    /// the store was cleared.
    pub fn clear(&self) -> bool {
        self.inner.clear_if_enabled()
    }

    /// Read-only view sharing this buffer's storage
    pub fn view(&self) -> BufferView {
        BufferView {
            inner: self.inner.clone(),
        }
    }

    /// ID of this buffer's registration on its handle
    pub fn listener_id(&self) -> ListenerId {
        self.subscription.id()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_attached()
    }

    /// Remove the registration from the handle. Further commits on the handle
    /// no longer reach this buffer.
    pub fn unsubscribe(&mut self) -> bool {
        self.subscription.detach()
    }
}

impl std::fmt::Debug for SignalBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBuffer")
            .field("name", &self.inner.name)
            .field("len", &self.len())
            .field("capacity", &self.inner.capacity)
            .field("overwrite_on_full", &self.inner.overwrite_on_full)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Read-only handle on a buffer's storage, safe to use from another thread.
#[derive(Clone)]
pub struct BufferView {
    inner: Arc<BufferInner>,
}

impl BufferView {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn width(&self) -> usize {
        self.inner.width
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Matrix {
        self.inner.snapshot()
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.inner.samples()
    }

    pub fn last(&self) -> Option<Sample> {
        self.inner.last()
    }
}

impl std::fmt::Debug for BufferView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferView")
            .field("name", &self.inner.name)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ramp(handle: &SignalHandle, range: std::ops::Range<usize>) {
        for i in range {
            handle.commit_sample(Sample::scalar(i as f64, i as f64 * 10.0));
        }
    }

    #[test]
    fn test_ring_store_outcomes() {
        let mut ring = RingStore::new(2, true);
        assert_eq!(ring.push(Sample::scalar(0.0, 0.0)), PushOutcome::Stored);
        assert_eq!(ring.push(Sample::scalar(1.0, 1.0)), PushOutcome::Stored);
        assert_eq!(ring.push(Sample::scalar(2.0, 2.0)), PushOutcome::Evicted);
        assert_eq!(ring.iter().next().unwrap().timestamp, 1.0);

        let mut strict = RingStore::new(1, false);
        assert_eq!(strict.push(Sample::scalar(0.0, 0.0)), PushOutcome::Stored);
        assert_eq!(strict.push(Sample::scalar(1.0, 1.0)), PushOutcome::Rejected);
        assert_eq!(strict.last().unwrap().timestamp, 0.0);
    }

    #[test]
    fn test_zero_capacity_store() {
        let mut ring = RingStore::new(0, true);
        assert_eq!(ring.push(Sample::scalar(0.0, 0.0)), PushOutcome::Evicted);
        assert!(ring.is_empty());
        let mut strict = RingStore::new(0, false);
        assert_eq!(strict.push(Sample::scalar(0.0, 0.0)), PushOutcome::Rejected);
    }

    #[test]
    fn test_snapshot_layout() {
        let handle = SignalHandle::new();
        let buffer = SignalBuffer::new(&handle, "x", &SamplerConfig::live(8), 1);
        ramp(&handle, 0..3);

        let snap = buffer.snapshot();
        assert_eq!(snap.shape(), (2, 3));
        assert_eq!(snap.row(0), &[0.0, 1.0, 2.0]);
        assert_eq!(snap.row(1), &[0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_reject_newest_reports_overflow() {
        let handle = SignalHandle::new();
        let buffer = SignalBuffer::new(&handle, "rec", &SamplerConfig::new(2, false, true), 1);
        ramp(&handle, 0..2);

        let report = handle.commit_sample(Sample::scalar(2.0, 20.0));
        assert_eq!(report.overflow_count(), 1);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.overflow_count(), 1);
        assert_eq!(buffer.last().unwrap().timestamp, 1.0);
    }

    #[test]
    fn test_partial_batch_kept_on_overflow() {
        let handle = SignalHandle::new();
        let buffer = SignalBuffer::new(&handle, "rec", &SamplerConfig::new(3, false, true), 1);
        let batch: Vec<Sample> = (0..5).map(|i| Sample::scalar(i as f64, 0.0)).collect();

        let report = handle.commit(&batch);
        assert_eq!(report.failures.len(), 1);
        match &report.failures[0].error {
            MonitorError::BufferOverflow { rejected, .. } => assert_eq!(*rejected, 2),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.overflow_count(), 2);
    }

    #[test]
    fn test_shape_mismatch_rejects_batch() {
        let handle = SignalHandle::new();
        let buffer = SignalBuffer::new(&handle, "vec", &SamplerConfig::live(4), 2);
        let report = handle.commit_sample(Sample::scalar(0.0, 1.0));
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            MonitorError::ShapeMismatch { expected: 2, actual: 1, .. }
        ));
        assert!(buffer.is_empty());

        handle.commit_sample(Sample::new(0.0, vec![1.0, 2.0]));
        assert_eq!(buffer.snapshot().shape(), (3, 1));
    }

    #[test]
    fn test_disabled_buffer_drops_and_ignores_clear() {
        let handle = SignalHandle::new();
        let buffer = SignalBuffer::new(&handle, "x", &SamplerConfig::live(8), 1);
        ramp(&handle, 0..2);

        buffer.set_enabled(false);
        ramp(&handle, 2..5);
        assert_eq!(buffer.len(), 2);

        assert!(!buffer.clear());
        handle.clear();
        assert_eq!(buffer.len(), 2);

        buffer.set_enabled(true);
        assert_eq!(buffer.len(), 2);
        assert!(buffer.clear());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let handle = SignalHandle::new();
        let mut buffer = SignalBuffer::new(&handle, "x", &SamplerConfig::live(8), 1);
        assert!(buffer.is_subscribed());
        assert!(buffer.unsubscribe());
        assert!(!buffer.is_subscribed());
        ramp(&handle, 0..3);
        assert!(buffer.is_empty());
        assert_eq!(handle.listener_count(), 0);
    }

    #[test]
    fn test_view_reads_from_other_thread() {
        let handle = SignalHandle::new();
        let buffer = SignalBuffer::new(&handle, "x", &SamplerConfig::live(1000), 1);
        let view = buffer.view();

        let reader = std::thread::spawn(move || {
            let mut max_seen = 0;
            for _ in 0..100 {
                let snap = view.snapshot();
                assert_eq!(snap.rows(), 2);
                max_seen = max_seen.max(snap.cols());
            }
            max_seen
        });
        ramp(&handle, 0..500);
        let max_seen = reader.join().unwrap();
        assert!(max_seen <= 500);
        assert_eq!(buffer.len(), 500);
    }

    proptest! {
        #[test]
        fn test_overwrite_keeps_last_capacity_samples(
            capacity in 1usize..32,
            count in 0usize..128,
        ) {
            let handle = SignalHandle::new();
            let buffer = SignalBuffer::new(&handle, "p", &SamplerConfig::live(capacity), 1);
            ramp(&handle, 0..count);

            let kept = buffer.samples();
            prop_assert_eq!(kept.len(), count.min(capacity));
            let first = count.saturating_sub(capacity);
            for (offset, sample) in kept.iter().enumerate() {
                prop_assert_eq!(sample.timestamp, (first + offset) as f64);
            }
        }

        #[test]
        fn test_reject_newest_never_exceeds_capacity(
            capacity in 1usize..32,
            count in 0usize..128,
        ) {
            let handle = SignalHandle::new();
            let config = SamplerConfig::new(capacity, false, true);
            let buffer = SignalBuffer::new(&handle, "p", &config, 1);
            let mut overflow_reports = 0;
            for i in 0..count {
                let report = handle.commit_sample(Sample::scalar(i as f64, 0.0));
                overflow_reports += report.overflow_count();
                prop_assert!(buffer.len() <= capacity);
            }
            let expected_rejects = count.saturating_sub(capacity);
            prop_assert_eq!(overflow_reports, expected_rejects);
            prop_assert_eq!(buffer.overflow_count() as usize, expected_rejects);
            prop_assert_eq!(buffer.len(), count.min(capacity));
        }
    }
}
