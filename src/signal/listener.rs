//! Listener abstraction for the signal graph.
//!
//! A listener has two capability slots: `on_commit`, which every listener
//! implements, and an optional `on_clear`, advertised through
//! [`Listener::handles_clear`]. Handles skip the clear slot for listeners
//! that do not advertise it.

use crate::error::{MonitorError, Result};
use crate::signal::id::ListenerId;
use crate::types::Sample;

/// A consumer registered on a [`SignalHandle`](crate::signal::SignalHandle).
pub trait Listener: Send + Sync {
    /// Human-readable name, used in logs and failure reports.
    fn name(&self) -> &str {
        "listener"
    }

    /// Called with every committed batch, in subscription order.
    fn on_commit(&self, samples: &[Sample]) -> Result<()>;

    /// Whether this listener has a clear capability.
    fn handles_clear(&self) -> bool {
        false
    }

    /// Called on clear when [`handles_clear`](Listener::handles_clear) is true.
    fn on_clear(&self) -> Result<()> {
        Ok(())
    }
}

type CommitFn = dyn Fn(&[Sample]) -> Result<()> + Send + Sync;
type ClearFn = dyn Fn() -> Result<()> + Send + Sync;

/// Closure-backed listener.
pub struct FnListener {
    name: String,
    on_commit: Box<CommitFn>,
    on_clear: Option<Box<ClearFn>>,
}

impl FnListener {
    pub fn new<C>(name: impl Into<String>, on_commit: C) -> Self
    where
        C: Fn(&[Sample]) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            on_commit: Box::new(on_commit),
            on_clear: None,
        }
    }

    /// Attach a clear callback
    pub fn with_clear<F>(mut self, on_clear: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.on_clear = Some(Box::new(on_clear));
        self
    }
}

impl Listener for FnListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_commit(&self, samples: &[Sample]) -> Result<()> {
        (self.on_commit)(samples)
    }

    fn handles_clear(&self) -> bool {
        self.on_clear.is_some()
    }

    fn on_clear(&self) -> Result<()> {
        match &self.on_clear {
            Some(f) => f(),
            None => Ok(()),
        }
    }
}

/// A single listener failure captured during fan-out.
#[derive(Debug)]
pub struct ListenerFailure {
    pub id: ListenerId,
    pub listener: String,
    pub error: MonitorError,
}

/// Outcome of one `commit` or `clear` fan-out.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// Listeners that ran successfully
    pub delivered: usize,
    /// Listeners skipped (no clear capability, or already dropped)
    pub skipped: usize,
    /// Listeners that failed; their siblings still ran
    pub failures: Vec<ListenerFailure>,
}

impl DeliveryReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of failures that were buffer overflows
    pub fn overflow_count(&self) -> usize {
        self.failures.iter().filter(|f| f.error.is_overflow()).count()
    }

    /// Merge another report into this one
    pub fn absorb(&mut self, other: DeliveryReport) {
        self.delivered += other.delivered;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }

    /// Collapse into a `Result`. On failure the first error is returned,
    /// wrapped with the failure count when more than one listener failed.
    pub fn into_result(self) -> Result<usize> {
        let total = self.failures.len();
        match self.failures.into_iter().next() {
            None => Ok(self.delivered),
            Some(first) if total == 1 => Err(first.error),
            Some(first) => Err(first.error.with_context(format!(
                "{} listeners failed, first was '{}'",
                total, first.listener
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_listener_capabilities() {
        let plain = FnListener::new("plain", |_| Ok(()));
        assert!(!plain.handles_clear());
        assert!(plain.on_clear().is_ok());
        assert_eq!(plain.name(), "plain");

        let with_clear = FnListener::new("clearing", |_| Ok(())).with_clear(|| Ok(()));
        assert!(with_clear.handles_clear());
    }

    #[test]
    fn test_report_into_result() {
        let ok = DeliveryReport {
            delivered: 2,
            ..Default::default()
        };
        assert_eq!(ok.into_result().unwrap(), 2);

        let mut failed = DeliveryReport::default();
        for _ in 0..2 {
            failed.failures.push(ListenerFailure {
                id: ListenerId(1),
                listener: "record".into(),
                error: MonitorError::BufferOverflow {
                    buffer: "x".into(),
                    capacity: 1,
                    rejected: 1,
                },
            });
        }
        assert_eq!(failed.overflow_count(), 2);
        let err = failed.into_result().unwrap_err();
        assert!(err.is_overflow());
        assert!(err.to_string().contains("2 listeners failed"));
    }
}
