//! Dance coaching client: sends a reference video and an attempt to the
//! analysis backend and turns its per-frame joint deviations into scored
//! keyframes with a persisted history.

/// Backend wire model and HTTP client.
pub mod analysis_api;
/// Per-user application directories.
pub mod app_dirs;
/// TOML settings.
pub mod config;
mod fs_ops;
/// Worker-to-controller result hand-off.
pub mod handoff;
/// Past analyses.
pub mod history;
/// Shared HTTP agent.
pub mod http_client;
/// Score and pose synthesis for display keyframes.
pub mod keyframes;
/// JSON key/value storage.
pub mod local_store;
/// Tracing setup.
pub mod logging;
/// Skeleton model.
pub mod pose;
/// Text rendering for the CLI.
pub mod report;
/// Analysis flow controller.
pub mod session;
