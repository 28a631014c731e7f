//! Signal distribution graph.
//!
//! Samples flow from a source into a [`SignalHandle`], which fans them out
//! to its listeners in subscription order. Listeners are buffers, other
//! handles, or [`DerivativeSignalHandle`]s that publish a derived stream.
//!
//! # Architecture
//!
//! ```text
//! source ──► [SignalHandle] ──► SignalBuffer (live sampler)
//!                          ├──► SignalBuffer (record sampler)
//!                          └──► [DerivativeSignalHandle] ──► SignalBuffer ...
//! ```
//!
//! # Design
//!
//! - **Weak registry**: handles hold `Weak<dyn Listener>`; the
//!   [`Subscription`] guard owns the listener and unsubscribes on drop.
//! - **Isolated fan-out**: a failing or panicking listener is logged and
//!   reported in the [`DeliveryReport`]; its siblings still run.
//! - **No lock across callbacks**: the registry lock is released before any
//!   listener runs.

pub mod derivative;
pub mod handle;
pub mod id;
pub mod listener;

pub use derivative::{differentiate, DerivativeSignalHandle};
pub use handle::{SignalHandle, Subscription};
pub use id::{BufferId, ListenerId, VariableId};
pub use listener::{DeliveryReport, FnListener, Listener, ListenerFailure};
