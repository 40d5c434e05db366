//! The reverting stack.
//!
//! Every successful mutating action pushes a revert callback; scenario
//! finalization drains them in reverse registration order, so the last
//! thing created is the first thing destroyed. A callback that fails is
//! restored onto the stack — a later [`Reverting::revert`] call resumes
//! from it — and the error is re-raised after the cleanup bracket closes.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use kest_types::Event;
use tracing::{debug, warn};

use crate::error::Result;
use crate::recorder::Recorder;

/// A revert callback. Reusable so a failed drain can restore it.
pub type RevertFn = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Per-scenario LIFO stack of revert callbacks.
#[derive(Clone)]
pub struct Reverting {
    stack: Arc<Mutex<Vec<RevertFn>>>,
    recorder: Recorder,
}

impl Reverting {
    pub fn new(recorder: Recorder) -> Self {
        Self {
            stack: Arc::new(Mutex::new(Vec::new())),
            recorder,
        }
    }

    /// Registers a callback. The most recently added runs first.
    pub fn add<F>(&self, revert: F)
    where
        F: Fn() -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        self.lock().push(Arc::new(revert));
    }

    /// Number of callbacks waiting to run.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drains the stack, newest first, awaiting each callback.
    ///
    /// On failure the callback is pushed back (so the stack still owns the
    /// undone work), `RevertingsEnd` is still recorded, and the error is
    /// re-raised.
    pub async fn revert(&self) -> Result<()> {
        self.recorder.record(Event::RevertingsStart);
        loop {
            let Some(callback) = self.lock().pop() else {
                break;
            };
            debug!(remaining = self.len(), "running revert callback");
            if let Err(err) = callback().await {
                warn!(error = %err, "revert callback failed; restoring it");
                self.lock().push(callback);
                self.recorder.record(Event::RevertingsEnd);
                return Err(err);
            }
        }
        self.recorder.record(Event::RevertingsEnd);
        Ok(())
    }

    /// Suppresses cleanup: records `RevertingsSkipped` and runs nothing.
    pub fn skip(&self) {
        debug!(pending = self.len(), "skipping revert callbacks");
        self.recorder.record(Event::RevertingsSkipped);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RevertFn>> {
        self.stack.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
