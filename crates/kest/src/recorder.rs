//! The append-only event log.
//!
//! One recorder per scenario. Recording never fails and never blocks beyond
//! the inner lock; [`Recorder::events`] hands back a snapshot, so later
//! appends do not mutate previously returned views.

use std::sync::{Arc, Mutex, PoisonError};

use kest_types::Event;

/// Shared handle to a scenario's event log. Cloning is cheap and all clones
/// append to the same log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one event in program order.
    pub fn record(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// A snapshot of the log, in insertion order.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
