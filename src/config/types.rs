use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{analysis_api::Difficulty, http_client::HttpTimeouts, keyframes::TransformOptions};

use super::defaults::{
    clamp_fps, default_base_url, default_connect_timeout_secs, default_fps,
    default_max_response_bytes, default_poll_interval_ms, default_poll_timeout_secs,
    default_request_timeout_secs, default_true, non_zero_or,
};

/// Settings persisted in `config.toml`.
///
/// Config tables (TOML): `api`, `analysis`, `polling`, `display`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub analysis: AnalysisPreferences,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub display: DisplaySettings,
}

impl AppConfig {
    pub(crate) fn normalized(self) -> Self {
        Self {
            api: self.api.normalized(),
            analysis: self.analysis.normalized(),
            polling: self.polling.normalized(),
            display: self.display,
        }
    }
}

/// Where the analysis backend lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Read/write timeout for a single request, including the upload.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

impl ApiSettings {
    fn normalized(self) -> Self {
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        Self {
            base_url: if base_url.is_empty() {
                default_base_url()
            } else {
                base_url
            },
            connect_timeout_secs: non_zero_or(
                self.connect_timeout_secs,
                default_connect_timeout_secs(),
            ),
            request_timeout_secs: non_zero_or(
                self.request_timeout_secs,
                default_request_timeout_secs(),
            ),
            max_response_bytes: if self.max_response_bytes == 0 {
                default_max_response_bytes()
            } else {
                self.max_response_bytes
            },
        }
    }

    pub fn timeouts(&self) -> HttpTimeouts {
        let request = Duration::from_secs(self.request_timeout_secs);
        HttpTimeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            read: request,
            write: request,
        }
    }
}

/// Defaults applied to new analyses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPreferences {
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_fps")]
    pub fps: f32,
}

impl Default for AnalysisPreferences {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            fps: default_fps(),
        }
    }
}

impl AnalysisPreferences {
    fn normalized(self) -> Self {
        Self {
            difficulty: self.difficulty,
            fps: clamp_fps(self.fps),
        }
    }
}

/// How the controller waits for a handed-off analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_poll_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl PollingSettings {
    fn normalized(self) -> Self {
        Self {
            interval_ms: non_zero_or(self.interval_ms, default_poll_interval_ms()),
            timeout_secs: non_zero_or(self.timeout_secs, default_poll_timeout_secs()),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Keyframe presentation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Add random offsets to near-identical user poses so the overlay shows
    /// two skeletons. These offsets are not measurements.
    #[serde(default = "default_true")]
    pub cosmetic_pose_offsets: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            cosmetic_pose_offsets: true,
        }
    }
}

impl DisplaySettings {
    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            cosmetic_offsets: self.cosmetic_pose_offsets,
        }
    }
}
