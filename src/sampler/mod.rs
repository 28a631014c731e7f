//! Storage side of the signal graph.
//!
//! A [`Sampler`] owns one [`SignalBuffer`] per registered signal. All
//! buffers of a sampler share its capacity, overflow policy and enabled
//! state. The monitor keeps two of them: a live sampler that always runs in
//! overwrite mode, and a record sampler that is only enabled while a
//! recording is in progress.
//!
//! [`export`] merges a sampler's buffers into one table and writes it as CSV.

pub mod buffer;
pub mod export;
pub mod group;

pub use buffer::{BufferView, PushOutcome, RingStore, SignalBuffer};
pub use export::{ExportSummary, ExportTable, TIME_COLUMN};
pub use group::Sampler;
