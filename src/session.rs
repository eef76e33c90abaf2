//! Page-level flow: home, analyzing, results and history.
//!
//! Starting an analysis spawns a worker thread that calls the backend and
//! publishes its result through the [`Handoff`]. The controller polls the
//! hand-off until something arrives or the wait times out, then derives the
//! display keyframes. Only one analysis may be in flight at a time.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    analysis_api::{AnalysisClient, AnalysisOptions, AnalysisResult, VideoFile},
    config::AppConfig,
    handoff::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT, Handoff, HandoffError, HandoffOutcome},
    history::{HistoryEntry, HistoryLog},
    keyframes::{Keyframe, TransformOptions, convert_to_keyframes},
    local_store::{LocalStore, StoreError},
};

/// Message shown when the hand-off wait runs out.
pub const TIMEOUT_MESSAGE: &str = "Analysis timed out. Please try again.";

/// Anything that can turn two videos into an [`AnalysisResult`].
///
/// Implementations must not fail: errors are reported through
/// [`AnalysisResult::error`].
pub trait Analyzer: Send + Sync {
    fn analyze(
        &self,
        original: &VideoFile,
        user: &VideoFile,
        options: &AnalysisOptions,
    ) -> AnalysisResult;
}

impl Analyzer for AnalysisClient {
    fn analyze(
        &self,
        original: &VideoFile,
        user: &VideoFile,
        options: &AnalysisOptions,
    ) -> AnalysisResult {
        AnalysisClient::analyze(self, original, user, options)
    }
}

/// Screen the session is on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Home,
    Analyzing,
    Results,
    History,
}

/// How a finished analysis ended.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionOutcome {
    Completed(HistoryEntry),
    Failed(String),
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("An analysis is already in progress")]
    AlreadyAnalyzing,
    #[error("No analysis is in progress")]
    NotAnalyzing,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Timing and presentation knobs for a session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionSettings {
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub transform: TransformOptions,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            transform: TransformOptions::default(),
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.polling.interval(),
            poll_timeout: config.polling.timeout(),
            transform: config.display.transform_options(),
        }
    }
}

pub struct SessionController {
    analyzer: Arc<dyn Analyzer>,
    handoff: Handoff,
    history: HistoryLog,
    settings: SessionSettings,
    view: View,
    worker: Option<JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
    result: Option<AnalysisResult>,
    keyframes: Vec<Keyframe>,
    last_error: Option<String>,
}

impl SessionController {
    pub fn new(analyzer: Arc<dyn Analyzer>, store: LocalStore, settings: SessionSettings) -> Self {
        Self {
            analyzer,
            handoff: Handoff::new(store.clone()),
            history: HistoryLog::new(store),
            settings,
            view: View::Home,
            worker: None,
            cancel: Arc::new(AtomicBool::new(false)),
            result: None,
            keyframes: Vec::new(),
            last_error: None,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn is_analyzing(&self) -> bool {
        self.view == View::Analyzing
    }

    /// Backend result of the analysis that just completed. Reopened history
    /// entries have none.
    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Keyframes of the most recent completed analysis.
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Flag that aborts the current wait when set.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Kick off an analysis on a worker thread.
    pub fn start_analysis(
        &mut self,
        original: VideoFile,
        user: VideoFile,
        options: AnalysisOptions,
    ) -> Result<(), SessionError> {
        if self.is_analyzing() {
            return Err(SessionError::AlreadyAnalyzing);
        }
        self.handoff.clear()?;
        self.result = None;
        self.last_error = None;
        self.cancel = Arc::new(AtomicBool::new(false));
        self.view = View::Analyzing;

        let analyzer = Arc::clone(&self.analyzer);
        let handoff = self.handoff.clone();
        let cancel = Arc::clone(&self.cancel);
        tracing::info!(
            "Starting analysis of {} against {}",
            user.file_name(),
            original.file_name()
        );
        self.worker = Some(thread::spawn(move || {
            let result = analyzer.analyze(&original, &user, &options);
            if cancel.load(Ordering::Relaxed) {
                tracing::debug!("Discarding analysis result after cancellation");
                return;
            }
            let published = match result.error.as_deref() {
                Some(message) => handoff.publish_error(message),
                None => handoff.publish_results(&result),
            };
            if let Err(err) = published {
                tracing::error!("Failed to publish analysis outcome: {err}");
            }
        }));
        Ok(())
    }

    /// Block until the running analysis publishes, fails, or times out.
    pub fn await_outcome(&mut self) -> Result<SessionOutcome, SessionError> {
        if !self.is_analyzing() {
            return Err(SessionError::NotAnalyzing);
        }
        let waited = self.handoff.wait_for_outcome(
            self.settings.poll_interval,
            self.settings.poll_timeout,
            &self.cancel,
        );
        match waited {
            Ok(HandoffOutcome::Results(result)) => {
                self.join_worker();
                let keyframes = convert_to_keyframes(&result, self.settings.transform);
                let entry = match self.history.record(keyframes.clone()) {
                    Ok(entry) => entry,
                    Err(err) => {
                        self.view = View::Home;
                        return Err(err.into());
                    }
                };
                self.result = Some(result);
                self.keyframes = keyframes;
                self.view = View::Results;
                Ok(SessionOutcome::Completed(entry))
            }
            Ok(HandoffOutcome::Error(message)) => {
                self.join_worker();
                Ok(self.fail(message))
            }
            Ok(HandoffOutcome::Cancelled) => {
                self.detach_worker();
                self.view = View::Home;
                Ok(SessionOutcome::Cancelled)
            }
            Err(HandoffError::Timeout(after)) => {
                tracing::warn!("No analysis outcome after {:?}", after);
                self.detach_worker();
                Ok(self.fail(TIMEOUT_MESSAGE.to_string()))
            }
            Err(HandoffError::Store(err)) => {
                self.detach_worker();
                self.view = View::Home;
                Err(err.into())
            }
        }
    }

    /// Start an analysis and wait for it.
    pub fn run_analysis(
        &mut self,
        original: VideoFile,
        user: VideoFile,
        options: AnalysisOptions,
    ) -> Result<SessionOutcome, SessionError> {
        self.start_analysis(original, user, options)?;
        self.await_outcome()
    }

    /// Switch to the history view and return its entries.
    pub fn show_history(&mut self) -> Result<Vec<HistoryEntry>, SessionError> {
        if self.is_analyzing() {
            return Err(SessionError::AlreadyAnalyzing);
        }
        self.view = View::History;
        Ok(self.history.entries())
    }

    /// Open a past analysis in the results view.
    pub fn open_history_entry(&mut self, id: &str) -> Result<Option<HistoryEntry>, SessionError> {
        if self.is_analyzing() {
            return Err(SessionError::AlreadyAnalyzing);
        }
        let entry = self.history.find(id);
        if let Some(entry) = &entry {
            self.result = None;
            self.keyframes = entry.keyframes.clone();
            self.view = View::Results;
        }
        Ok(entry)
    }

    pub fn go_home(&mut self) -> Result<(), SessionError> {
        if self.is_analyzing() {
            return Err(SessionError::AlreadyAnalyzing);
        }
        self.view = View::Home;
        Ok(())
    }

    fn fail(&mut self, message: String) -> SessionOutcome {
        tracing::warn!("Analysis failed: {message}");
        self.last_error = Some(message.clone());
        self.view = View::Home;
        SessionOutcome::Failed(message)
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("Analysis worker panicked");
            }
        }
    }

    /// Leave a still-running worker behind; it will see the cancel flag.
    fn detach_worker(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        self.worker = None;
    }
}
