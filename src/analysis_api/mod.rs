//! Client and wire model for the external pose-analysis backend.
//!
//! The backend receives two videos and returns per-frame joint-angle
//! deviations. Everything here is about getting that payload across the wire
//! and into a shape the rest of the crate can trust: lenient decoding,
//! identical-video detection, clamping and a fallback result on failure.

mod client;
mod lenient;
mod multipart;
mod normalize;
mod types;

use std::path::PathBuf;

pub use client::{AnalysisClient, DEFAULT_BASE_URL, DEFAULT_MAX_RESPONSE_BYTES};
pub use normalize::{FALLBACK_AVERAGE_ERROR, fallback_result, normalize_result};
pub use types::{
    AnalysisOptions, AnalysisResult, DEFAULT_FPS, Difficulty, FrameResult,
    GENERAL_SUGGESTION_PART, JointIssue, Suggestion, VideoFile,
};

/// Errors raised while talking to the analysis backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The configured base URL does not parse.
    #[error("Invalid API base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    /// The base URL uses a scheme other than http(s).
    #[error("Unsupported API URL scheme '{0}'")]
    UnsupportedScheme(String),
    /// A video could not be read from disk.
    #[error("Failed to read video {path}: {source}")]
    Video {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Server { status: u16, message: String },
    /// The request never completed.
    #[error("HTTP error: {0}")]
    Transport(String),
    /// The response body was missing, too large or not the expected JSON.
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}
