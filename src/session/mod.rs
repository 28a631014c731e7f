//! Monitoring session built on the signal graph.
//!
//! # Components
//!
//! - [`Monitor`] - Variables, their sources, and the live/record samplers
//! - [`SampleSource`] - What the monitor polls each tick ([`PatternSource`]
//!   generates synthetic data)
//! - [`RefreshView`] - Reads buffer snapshots on a refresh cadence, with
//!   freeze and live/record panels
//! - [`MonitorWorker`] - Runs a monitor on its own thread, controlled over
//!   channels
//!
//! # Example
//!
//! ```ignore
//! use datamon_rs::config::MonitorConfig;
//! use datamon_rs::session::{Monitor, Pattern, PatternSource};
//!
//! let mut monitor = Monitor::new(MonitorConfig::default())?;
//! let pos = monitor.add_variable("pos", PatternSource::new(Pattern::default(), 0.0, 0.01));
//! monitor.add_derivative(pos, "vel")?;
//!
//! monitor.start_recording();
//! for _ in 0..100 {
//!     monitor.tick();
//! }
//! monitor.save("runs/sample.csv")?;
//! ```

pub mod monitor;
pub mod source;
pub mod view;
pub mod worker;

pub use monitor::{Monitor, MonitorStats, TickReport};
pub use source::{now_seconds, FnSource, Pattern, PatternSource, Reading, SampleSource};
pub use view::{Panel, RefreshView, Trace};
pub use worker::{MonitorWorker, WorkerCommand, WorkerHandle, WorkerMessage};
