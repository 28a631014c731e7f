//! Identity types for the signal graph.
//!
//! Listener IDs are allocated from a global counter so that an ID is never
//! reused, even across handles. Buffer and variable IDs are plain indices
//! into their owner's ordered storage.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_LISTENER_ID: AtomicU32 = AtomicU32::new(1);

/// Stable identifier of a listener registered on a `SignalHandle`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u32);

impl ListenerId {
    pub const INVALID: ListenerId = ListenerId(u32::MAX);

    /// Allocate a fresh, never-before-used ID
    pub(crate) fn next() -> Self {
        ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "ListenerId(INVALID)")
        } else {
            write!(f, "ListenerId({})", self.0)
        }
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Index into `Sampler::buffers`. Also the buffer's export column block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferId(pub u32);

impl BufferId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BufferId({})", self.0)
    }
}

/// Index into `Monitor`'s variable list.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VariableId(pub u32);

impl VariableId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VariableId({})", self.0)
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
