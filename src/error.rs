//! Error handling for DataMon-RS
//!
//! This module defines the crate-wide error type and a Result alias used by
//! the signal graph, the samplers and the export routines.

use thiserror::Error;

/// Main error type for DataMon-RS operations
#[derive(Error, Debug)]
pub enum MonitorError {
    /// A buffer with overwrite disabled received samples past its capacity.
    /// The rejected samples were dropped; stored data is unchanged.
    #[error("Buffer '{buffer}' overflow: {rejected} sample(s) rejected at capacity {capacity}")]
    BufferOverflow {
        buffer: String,
        capacity: usize,
        rejected: usize,
    },

    /// A sample's value width did not match the receiving buffer
    #[error("Buffer '{buffer}' expects {expected} value(s) per sample, got {actual}")]
    ShapeMismatch {
        buffer: String,
        expected: usize,
        actual: usize,
    },

    /// A variable ID that the monitor does not know
    #[error("Unknown variable {0}")]
    UnknownVariable(u32),

    /// A listener failed while handling a commit or clear
    #[error("Listener error: {0}")]
    Listener(String),

    /// Invalid or unreadable monitor configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker command or message channel closed
    #[error("Worker channel error: {0}")]
    Channel(String),

    /// File system failure while loading config or exporting
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding/decoding errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Config could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Any of the above, wrapped with what was being attempted
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MonitorError>,
    },
}

impl MonitorError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MonitorError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) is a buffer overflow
    pub fn is_overflow(&self) -> bool {
        match self {
            MonitorError::BufferOverflow { .. } => true,
            MonitorError::WithContext { source, .. } => source.is_overflow(),
            _ => false,
        }
    }
}

/// Result type alias for DataMon-RS operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| MonitorError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| MonitorError::from(e).with_context(f()))
    }
}
