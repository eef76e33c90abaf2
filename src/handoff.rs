//! Result hand-off between the analysis worker and the waiting controller.
//!
//! The worker publishes either the backend result or an error message into
//! the local store; the controller polls until one of them shows up, the wait is
//! cancelled, or the timeout passes. Taking a value removes it.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use crate::{
    analysis_api::AnalysisResult,
    local_store::{ANALYSIS_ERROR_KEY, CURRENT_RESULTS_KEY, LocalStore, StoreError},
};

/// Default delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Default overall wait before giving up.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(120);

/// What a finished wait produced.
#[derive(Clone, Debug, PartialEq)]
pub enum HandoffOutcome {
    Results(AnalysisResult),
    Error(String),
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    #[error("Analysis timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Transient result/error slots.
#[derive(Clone, Debug)]
pub struct Handoff {
    store: LocalStore,
}

impl Handoff {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Publish a finished analysis, replacing any stale error.
    pub fn publish_results(&self, result: &AnalysisResult) -> Result<(), StoreError> {
        self.store.remove(ANALYSIS_ERROR_KEY)?;
        self.store.set(CURRENT_RESULTS_KEY, result)
    }

    /// Publish a failure message, replacing any stale results.
    pub fn publish_error(&self, message: &str) -> Result<(), StoreError> {
        self.store.remove(CURRENT_RESULTS_KEY)?;
        self.store.set(ANALYSIS_ERROR_KEY, message)
    }

    pub fn take_results(&self) -> Result<Option<AnalysisResult>, StoreError> {
        let results = self.store.get(CURRENT_RESULTS_KEY)?;
        if results.is_some() {
            self.store.remove(CURRENT_RESULTS_KEY)?;
        }
        Ok(results)
    }

    pub fn take_error(&self) -> Result<Option<String>, StoreError> {
        let message = self.store.get(ANALYSIS_ERROR_KEY)?;
        if message.is_some() {
            self.store.remove(ANALYSIS_ERROR_KEY)?;
        }
        Ok(message)
    }

    /// Drop anything left over from an earlier analysis.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(CURRENT_RESULTS_KEY)?;
        self.store.remove(ANALYSIS_ERROR_KEY)
    }

    /// Poll every `interval` until results or an error are published.
    ///
    /// Results win when both are present. The first check happens
    /// immediately.
    pub fn wait_for_outcome(
        &self,
        interval: Duration,
        timeout: Duration,
        cancel: &AtomicBool,
    ) -> Result<HandoffOutcome, HandoffError> {
        let started = Instant::now();
        loop {
            if cancel.load(Ordering::Relaxed) {
                return Ok(HandoffOutcome::Cancelled);
            }
            if let Some(result) = self.take_results()? {
                return Ok(HandoffOutcome::Results(result));
            }
            if let Some(message) = self.take_error()? {
                return Ok(HandoffOutcome::Error(message));
            }
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                tracing::warn!("Gave up waiting for analysis after {:?}", elapsed);
                return Err(HandoffError::Timeout(timeout));
            }
            thread::sleep(interval.min(timeout - elapsed));
        }
    }
}
