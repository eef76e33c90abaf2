use crate::analysis_api::{DEFAULT_BASE_URL, DEFAULT_FPS, DEFAULT_MAX_RESPONSE_BYTES};

pub(super) fn default_true() -> bool {
    true
}

pub(super) fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

pub(super) fn default_connect_timeout_secs() -> u64 {
    10
}

pub(super) fn default_request_timeout_secs() -> u64 {
    300
}

pub(super) fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

pub(super) fn default_fps() -> f32 {
    DEFAULT_FPS
}

pub(super) fn default_poll_interval_ms() -> u64 {
    1_000
}

pub(super) fn default_poll_timeout_secs() -> u64 {
    120
}

pub(super) fn clamp_fps(fps: f32) -> f32 {
    if fps.is_finite() && fps > 0.0 {
        fps.min(120.0)
    } else {
        default_fps()
    }
}

pub(super) fn non_zero_or(value: u64, fallback: u64) -> u64 {
    if value == 0 { fallback } else { value }
}
