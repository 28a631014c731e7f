//! # DataMon-RS: Telemetry Core for Real-Time Signal Monitoring
//!
//! Routes timestamped samples from data sources through a publish/subscribe
//! signal graph into bounded time-series buffers, and merges those buffers
//! into CSV exports.
//!
//! ## Architecture
//!
//! - **Signal graph** ([`signal`]): fan-out handles, listeners and streaming
//!   derivatives
//! - **Sampling** ([`sampler`]): per-signal ring buffers grouped into
//!   samplers with shared capacity, overflow policy and enabled state
//! - **Export** ([`sampler::export`]): column-block merge and CSV output
//! - **Session** ([`session`]): the monitor with live and record samplers,
//!   a refresh view and a worker thread driven over crossbeam channels
//!
//! ## Example
//!
//! ```ignore
//! use datamon_rs::{SamplerConfig, Sampler, Sample, SignalHandle};
//!
//! let speed = SignalHandle::with_name("speed");
//! let mut live = Sampler::new(SamplerConfig::live(2000));
//! live.add_signal(&speed, "speed");
//!
//! speed.commit_sample(Sample::scalar(0.0, 12.5));
//! let table = live.export();
//! ```

pub mod config;
pub mod error;
pub mod sampler;
pub mod session;
pub mod signal;
pub mod types;

// Re-export commonly used types
pub use config::{ExportSettings, MonitorConfig, NanMarker, SamplerConfig};
pub use error::{MonitorError, Result};
pub use sampler::{BufferView, ExportSummary, Sampler, SignalBuffer};
pub use session::{Monitor, MonitorWorker, PatternSource, RefreshView, SampleSource};
pub use signal::{DerivativeSignalHandle, Listener, SignalHandle, Subscription};
pub use types::{Matrix, Sample};
