//! Fan-out broadcast node.
//!
//! A `SignalHandle` has no storage of its own. It keeps an ordered registry
//! of weakly-held listeners and forwards every committed batch (and every
//! clear) to them synchronously, on the caller's thread, in subscription
//! order.
//!
//! Ownership of a listener stays with its [`Subscription`] guard. Dropping
//! the guard unsubscribes the listener, and a listener whose owner vanished
//! without unsubscribing is skipped and pruned on the next fan-out, so a
//! handle never calls into a dead object.

use crate::error::{MonitorError, Result};
use crate::signal::id::ListenerId;
use crate::signal::listener::{DeliveryReport, FnListener, Listener, ListenerFailure};
use crate::types::Sample;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, Weak};

struct ListenerEntry {
    id: ListenerId,
    listener: Weak<dyn Listener>,
}

struct HandleInner {
    name: String,
    listeners: RwLock<Vec<ListenerEntry>>,
}

impl HandleInner {
    fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|entry| entry.id != id);
        listeners.len() != before
    }
}

/// Fan-out node of the distribution graph. Cloning yields another reference
/// to the same node.
#[derive(Clone)]
pub struct SignalHandle {
    inner: Arc<HandleInner>,
}

impl Default for SignalHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SignalHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalHandle")
            .field("name", &self.inner.name)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl SignalHandle {
    pub fn new() -> Self {
        Self::with_name("")
    }

    /// Create a handle with a name used in log output
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                name: name.into(),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Append a listener. The returned guard owns the listener; dropping it
    /// unsubscribes.
    pub fn subscribe(&self, listener: Arc<dyn Listener>) -> Subscription {
        let id = ListenerId::next();
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ListenerEntry {
                id,
                listener: Arc::downgrade(&listener),
            });
        tracing::trace!(
            "Handle '{}' subscribed {} ({:?})",
            self.inner.name,
            listener.name(),
            id
        );
        Subscription {
            id,
            handle: Some(Arc::downgrade(&self.inner)),
            listener,
        }
    }

    /// Subscribe a pair of closures
    pub fn subscribe_fn<C, F>(&self, name: &str, on_commit: C, on_clear: Option<F>) -> Subscription
    where
        C: Fn(&[Sample]) -> Result<()> + Send + Sync + 'static,
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        let mut listener = FnListener::new(name, on_commit);
        if let Some(on_clear) = on_clear {
            listener = listener.with_clear(on_clear);
        }
        self.subscribe(Arc::new(listener))
    }

    /// Remove a listener by ID. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.remove(id)
    }

    /// Number of registered listeners, including ones whose owner has been
    /// dropped but not yet pruned.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Registered listener IDs in fan-out order
    pub fn listener_ids(&self) -> Vec<ListenerId> {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|entry| entry.id)
            .collect()
    }

    /// Broadcast a batch to every listener in subscription order.
    pub fn commit(&self, samples: &[Sample]) -> DeliveryReport {
        if samples.is_empty() {
            return DeliveryReport::default();
        }
        self.fan_out(|listener| Some(listener.on_commit(samples)))
    }

    /// Broadcast a single sample
    pub fn commit_sample(&self, sample: Sample) -> DeliveryReport {
        self.commit(std::slice::from_ref(&sample))
    }

    /// Broadcast a clear to every listener with a clear capability.
    pub fn clear(&self) -> DeliveryReport {
        self.fan_out(|listener| {
            if listener.handles_clear() {
                Some(listener.on_clear())
            } else {
                None
            }
        })
    }

    fn fan_out<F>(&self, deliver: F) -> DeliveryReport
    where
        F: Fn(&dyn Listener) -> Option<Result<()>>,
    {
        // Listeners run without the registry lock held, so they may
        // subscribe or unsubscribe from within a callback.
        let (targets, stale) = {
            let listeners = self
                .inner
                .listeners
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            let targets: Vec<(ListenerId, Option<Arc<dyn Listener>>)> = listeners
                .iter()
                .map(|entry| (entry.id, entry.listener.upgrade()))
                .collect();
            let stale = targets.iter().any(|(_, l)| l.is_none());
            (targets, stale)
        };

        let mut report = DeliveryReport::default();
        for (id, listener) in targets {
            let Some(listener) = listener else {
                report.skipped += 1;
                continue;
            };

            let outcome = catch_unwind(AssertUnwindSafe(|| deliver(listener.as_ref())))
                .unwrap_or_else(|_| {
                    Some(Err(MonitorError::Listener(format!(
                        "{} panicked during delivery",
                        listener.name()
                    ))))
                });

            match outcome {
                None => report.skipped += 1,
                Some(Ok(())) => report.delivered += 1,
                Some(Err(error)) => {
                    tracing::warn!(
                        "Handle '{}': listener {} ({:?}) failed: {}",
                        self.inner.name,
                        listener.name(),
                        id,
                        error
                    );
                    report.failures.push(ListenerFailure {
                        id,
                        listener: listener.name().to_string(),
                        error,
                    });
                }
            }
        }

        if stale {
            self.prune();
        }
        report
    }

    fn prune(&self) {
        let mut listeners = self
            .inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|entry| entry.listener.strong_count() > 0);
        tracing::debug!(
            "Handle '{}' pruned {} stale listener(s)",
            self.inner.name,
            before - listeners.len()
        );
    }
}

/// Ownership guard for a subscribed listener.
///
/// Holds the only strong reference the graph needs; the handle itself keeps
/// a weak one. Dropping the guard removes the registry entry.
pub struct Subscription {
    id: ListenerId,
    handle: Option<Weak<HandleInner>>,
    listener: Arc<dyn Listener>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn listener(&self) -> &Arc<dyn Listener> {
        &self.listener
    }

    /// Whether the subscription is still registered on a live handle
    pub fn is_attached(&self) -> bool {
        self.handle
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| {
                inner
                    .listeners
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .iter()
                    .any(|entry| entry.id == self.id)
            })
            .unwrap_or(false)
    }

    /// Remove the registry entry now. Returns true if an entry was removed.
    pub fn detach(&mut self) -> bool {
        match self.handle.take().and_then(|weak| weak.upgrade()) {
            Some(inner) => inner.remove(self.id),
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("listener", &self.listener.name())
            .finish()
    }
}
