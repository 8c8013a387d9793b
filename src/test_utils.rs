//! Test utilities.
//!
//! Helpers for asserting advice order and error propagation without console
//! output: a shared call recorder and a plain error type.

use std::sync::Arc;

use parking_lot::Mutex;

/// Shared, cloneable record of labelled events in the order they happened.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, label: impl Into<String>) {
        self.entries.lock().push(label.into());
    }

    /// Snapshot of everything recorded so far.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// How many times `label` was recorded.
    pub fn count(&self, label: &str) -> usize {
        self.entries.lock().iter().filter(|entry| *entry == label).count()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Error raised on purpose by test handlers and method bodies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("boom: {message}")]
pub struct Boom {
    pub message: String,
}

impl Boom {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
