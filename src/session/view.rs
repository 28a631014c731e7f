//! Snapshot reader driven by a refresh cadence.
//!
//! `RefreshView` stands in for the plotting side: on each refresh it copies
//! the current contents of one sampler's buffers into [`Trace`]s. Freezing
//! the view keeps the last traces and stops reading; acquisition and
//! recording carry on untouched.

use crate::sampler::BufferView;
use crate::session::monitor::Monitor;
use std::time::Instant;

/// Which sampler the view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Panel {
    #[default]
    Live,
    Record,
}

/// Plot-ready copy of one buffer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trace {
    pub name: String,
    pub timestamps: Vec<f64>,
    /// One vector per value component
    pub values: Vec<Vec<f64>>,
}

impl Trace {
    pub fn from_view(view: &BufferView) -> Self {
        let snapshot = view.snapshot();
        let mut rows = snapshot.iter_rows().map(<[f64]>::to_vec);
        let timestamps = rows.next().unwrap_or_default();
        Self {
            name: view.name().to_string(),
            timestamps,
            values: rows.collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// `[t, v]` pairs of one component, NaN points dropped
    pub fn as_plot_points(&self, component: usize) -> Vec<[f64; 2]> {
        let Some(values) = self.values.get(component) else {
            return Vec::new();
        };
        self.timestamps
            .iter()
            .zip(values)
            .filter(|(t, v)| !t.is_nan() && !v.is_nan())
            .map(|(t, v)| [*t, *v])
            .collect()
    }

    /// Latest timestamp in the trace
    pub fn last_time(&self) -> Option<f64> {
        self.timestamps.last().copied()
    }
}

/// Snapshot reader for the live and record panels
#[derive(Debug, Default)]
pub struct RefreshView {
    live: Vec<BufferView>,
    record: Vec<BufferView>,
    panel: Panel,
    frozen: bool,
    traces: Vec<Trace>,
    refreshes: u64,
    last_refresh: Option<Instant>,
}

impl RefreshView {
    pub fn new(live: Vec<BufferView>, record: Vec<BufferView>) -> Self {
        Self {
            live,
            record,
            ..Default::default()
        }
    }

    pub fn from_monitor(monitor: &Monitor) -> Self {
        Self::new(monitor.live_views(), monitor.record_views())
    }

    /// Point the view at new buffers, e.g. after a monitor reset. Frozen
    /// traces are kept until the next unfrozen refresh.
    pub fn rebind(&mut self, live: Vec<BufferView>, record: Vec<BufferView>) {
        self.live = live;
        self.record = record;
    }

    pub fn panel(&self) -> Panel {
        self.panel
    }

    pub fn show(&mut self, panel: Panel) {
        self.panel = panel;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn unfreeze(&mut self) {
        self.frozen = false;
    }

    /// Re-read the shown panel's buffers unless frozen
    pub fn refresh(&mut self) -> &[Trace] {
        if !self.frozen {
            let views = match self.panel {
                Panel::Live => &self.live,
                Panel::Record => &self.record,
            };
            self.traces = views.iter().map(Trace::from_view).collect();
            self.refreshes += 1;
            self.last_refresh = Some(Instant::now());
        }
        &self.traces
    }

    /// Traces from the last refresh
    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn refresh_count(&self) -> u64 {
        self.refreshes
    }

    pub fn last_refresh(&self) -> Option<Instant> {
        self.last_refresh
    }
}
