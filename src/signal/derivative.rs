//! Streaming finite-difference node.
//!
//! A `DerivativeSignalHandle` listens to one upstream handle and
//! re-broadcasts `[t; dv1/dt; dv2/dt; ...]` on its own handle. The previous
//! sample is carried across commits, so a batch boundary does not restart
//! the difference. After construction or a clear the previous sample is
//! unknown and the first derivative is NaN.

use crate::error::Result;
use crate::signal::handle::{SignalHandle, Subscription};
use crate::signal::id::ListenerId;
use crate::signal::listener::Listener;
use crate::types::Sample;
use std::sync::{Arc, Mutex, PoisonError};

struct DerivativeState {
    name: String,
    output: SignalHandle,
    previous: Mutex<Option<Sample>>,
}

impl Listener for DerivativeState {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_commit(&self, samples: &[Sample]) -> Result<()> {
        let derived = {
            let mut previous = self.previous.lock().unwrap_or_else(PoisonError::into_inner);
            let derived = differentiate(previous.as_ref(), samples);
            if let Some(last) = samples.last() {
                *previous = Some(last.clone());
            }
            derived
        };
        self.output.commit(&derived).into_result().map(|_| ())
    }

    fn handles_clear(&self) -> bool {
        true
    }

    fn on_clear(&self) -> Result<()> {
        let report = self.output.clear();
        *self.previous.lock().unwrap_or_else(PoisonError::into_inner) = None;
        report.into_result().map(|_| ())
    }
}

/// Difference `samples` against `previous` (or a NaN sentinel) pairwise.
///
/// Timestamps pass through unchanged. A value component missing from the
/// previous sample differences against NaN. Equal timestamps give IEEE
/// Inf/NaN.
pub fn differentiate(previous: Option<&Sample>, samples: &[Sample]) -> Vec<Sample> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };
    let sentinel = Sample::nan(first.width());
    let mut prev = previous.unwrap_or(&sentinel);

    let mut out = Vec::with_capacity(samples.len());
    for sample in samples {
        let dt = sample.timestamp - prev.timestamp;
        let values = sample
            .values
            .iter()
            .enumerate()
            .map(|(k, v)| (v - prev.values.get(k).copied().unwrap_or(f64::NAN)) / dt)
            .collect();
        out.push(Sample::new(sample.timestamp, values));
        prev = sample;
    }
    out
}

/// Handle that publishes the time derivative of an upstream handle.
pub struct DerivativeSignalHandle {
    handle: SignalHandle,
    state: Arc<DerivativeState>,
    subscription: Subscription,
}

impl DerivativeSignalHandle {
    /// Subscribe to `upstream` and start publishing its derivative
    pub fn new(upstream: &SignalHandle) -> Self {
        let name = if upstream.name().is_empty() {
            "derivative".to_string()
        } else {
            format!("d/dt {}", upstream.name())
        };
        let handle = SignalHandle::with_name(name.clone());
        let state = Arc::new(DerivativeState {
            name,
            output: handle.clone(),
            previous: Mutex::new(None),
        });
        let subscription = upstream.subscribe(state.clone());
        Self {
            handle,
            state,
            subscription,
        }
    }

    /// Handle carrying the derivative stream; subscribe downstream consumers here
    pub fn handle(&self) -> &SignalHandle {
        &self.handle
    }

    /// Last upstream sample seen, if any
    pub fn previous_sample(&self) -> Option<Sample> {
        self.state
            .previous
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget the previous sample without clearing downstream. The next
    /// commit starts again from the NaN sentinel.
    pub fn reset_state(&self) {
        *self.state.previous.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Listener ID of this node on the upstream handle
    pub fn upstream_listener_id(&self) -> ListenerId {
        self.subscription.id()
    }

    /// Stop listening to upstream. Returns true if a registration was removed.
    pub fn detach(&mut self) -> bool {
        self.subscription.detach()
    }
}

impl std::fmt::Debug for DerivativeSignalHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivativeSignalHandle")
            .field("handle", &self.handle)
            .field("upstream_listener", &self.subscription.id())
            .finish()
    }
}
