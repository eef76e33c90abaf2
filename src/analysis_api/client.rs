//! Blocking client for the dance analysis backend.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{config::ApiSettings, http_client};

use super::{
    ApiError,
    multipart::MultipartForm,
    normalize::{fallback_result, normalize_result},
    types::{AnalysisOptions, AnalysisResult, Difficulty, VideoFile},
};

/// Base URL used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5001/api";
/// Default cap for response bodies.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;
const MAX_SMALL_RESPONSE_BYTES: usize = 64 * 1024;

/// Talks to `/analyze`, `/difficulty` and `/health` under one base URL.
#[derive(Clone, Debug)]
pub struct AnalysisClient {
    base_url: String,
    agent: ureq::Agent,
    max_response_bytes: usize,
}

#[derive(Serialize)]
struct DifficultyRequest<'a> {
    difficulty: &'a str,
}

#[derive(Deserialize)]
struct HealthResponse {
    #[serde(default)]
    status: String,
}

impl AnalysisClient {
    /// Client with default timeouts and response limits.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_agent(
            base_url,
            http_client::agent().clone(),
            DEFAULT_MAX_RESPONSE_BYTES,
        )
    }

    /// Client configured from the `[api]` settings table.
    pub fn from_settings(settings: &ApiSettings) -> Result<Self, ApiError> {
        Self::with_agent(
            &settings.base_url,
            http_client::build_agent(settings.timeouts()),
            settings.max_response_bytes,
        )
    }

    pub fn with_agent(
        base_url: &str,
        agent: ureq::Agent,
        max_response_bytes: usize,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: validate_base_url(base_url)?,
            agent,
            max_response_bytes,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// True when `/health` answers with `{"status": "ok"}`.
    pub fn check_health(&self) -> bool {
        match self.fetch_health() {
            Ok(status) => status == "ok",
            Err(err) => {
                tracing::warn!("API health check failed: {err}");
                false
            }
        }
    }

    fn fetch_health(&self) -> Result<String, ApiError> {
        let response = self.call(self.agent.get(&self.endpoint("health")), None)?;
        let body = read_body(response, MAX_SMALL_RESPONSE_BYTES)?;
        let parsed: HealthResponse = serde_json::from_str(body.trim())
            .map_err(|err| ApiError::InvalidResponse(err.to_string()))?;
        Ok(parsed.status)
    }

    /// Analyze a pair of videos; failures become a renderable fallback result.
    pub fn analyze(
        &self,
        original: &VideoFile,
        user: &VideoFile,
        options: &AnalysisOptions,
    ) -> AnalysisResult {
        match self.try_analyze(original, user, options) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!("Error analyzing dance: {err}");
                fallback_result(err.to_string())
            }
        }
    }

    /// Analyze a pair of videos, reporting failures to the caller.
    pub fn try_analyze(
        &self,
        original: &VideoFile,
        user: &VideoFile,
        options: &AnalysisOptions,
    ) -> Result<AnalysisResult, ApiError> {
        let mut form = MultipartForm::new();
        form.file(
            "original",
            original.file_name(),
            original.content_type(),
            &original.read_bytes()?,
        );
        form.file(
            "user",
            user.file_name(),
            user.content_type(),
            &user.read_bytes()?,
        );
        if let Some(difficulty) = options.difficulty {
            form.text("difficulty", difficulty.api_name());
        }
        form.text("fps", &options.fps_field());
        let content_type = form.content_type();
        let body = form.finish();

        tracing::info!(
            original = original.file_name(),
            user = user.file_name(),
            bytes = body.len(),
            "Uploading videos for analysis"
        );
        let request = self
            .agent
            .post(&self.endpoint("analyze"))
            .set("Accept", "application/json")
            .set("Content-Type", &content_type);
        let response = self.call(request, Some(&body))?;
        let text = read_body(response, self.max_response_bytes)?;
        let result = parse_analysis_response(&text)?;
        tracing::info!(
            frames = result.results.len(),
            average_error = result.average_error,
            "Analysis response received"
        );
        Ok(normalize_result(result, original.is_same_video(user)))
    }

    /// Persist the difficulty preference on the backend.
    pub fn update_difficulty(&self, difficulty: Difficulty) -> Result<serde_json::Value, ApiError> {
        let request = self
            .agent
            .post(&self.endpoint("difficulty"))
            .set("Accept", "application/json");
        let response = match request.send_json(DifficultyRequest {
            difficulty: difficulty.display_name(),
        }) {
            Ok(response) => response,
            Err(err) => return Err(map_ureq_error(err, MAX_SMALL_RESPONSE_BYTES)),
        };
        let body = read_body(response, MAX_SMALL_RESPONSE_BYTES)?;
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(body.trim()).map_err(|err| ApiError::InvalidResponse(err.to_string()))
    }

    fn call(&self, request: ureq::Request, body: Option<&[u8]>) -> Result<ureq::Response, ApiError> {
        let result = match body {
            Some(bytes) => request.send_bytes(bytes),
            None => request.call(),
        };
        result.map_err(|err| map_ureq_error(err, MAX_SMALL_RESPONSE_BYTES))
    }
}

fn validate_base_url(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|source| ApiError::InvalidBaseUrl {
        url: raw.to_string(),
        source,
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(ApiError::UnsupportedScheme(other.to_string())),
    }
}

fn map_ureq_error(err: ureq::Error, max_bytes: usize) -> ApiError {
    match err {
        ureq::Error::Status(code, response) => {
            let status_text = response.status_text().to_string();
            let body = http_client::read_response_text(response, max_bytes).unwrap_or_default();
            status_error(code, &status_text, &body)
        }
        ureq::Error::Transport(err) => ApiError::Transport(err.to_string()),
    }
}

fn status_error(code: u16, status_text: &str, body: &str) -> ApiError {
    let reported = serde_json::from_str::<serde_json::Value>(body.trim())
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.as_str())
                .map(str::to_string)
        })
        .filter(|message| !message.trim().is_empty());
    let message = reported.unwrap_or_else(|| {
        if status_text.is_empty() {
            format!("Server responded with {code}")
        } else {
            format!("Server responded with {code}: {status_text}")
        }
    });
    ApiError::Server {
        status: code,
        message,
    }
}

fn read_body(response: ureq::Response, max_bytes: usize) -> Result<String, ApiError> {
    http_client::read_response_text(response, max_bytes)
        .map_err(|err| ApiError::InvalidResponse(err.to_string()))
}

fn parse_analysis_response(body: &str) -> Result<AnalysisResult, ApiError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidResponse("Empty response body".to_string()));
    }
    let value: serde_json::Value = serde_json::from_str(trimmed)
        .map_err(|err| ApiError::InvalidResponse(err.to_string()))?;
    if !value.is_object() {
        return Err(ApiError::InvalidResponse(
            "Invalid response format from server".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|err| ApiError::InvalidResponse(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::test_server::{json_response, serve_once};
    use std::time::Duration;
    use tempfile::tempdir;

    fn write_video(dir: &std::path::Path, name: &str, contents: &[u8]) -> VideoFile {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        VideoFile::open(path).unwrap()
    }

    const ANALYSIS_BODY: &str = r#"{
        "difficulty": "intermediate",
        "difficulty_name": "Intermediate",
        "threshold": 10,
        "fps": 10,
        "frames_analyzed": 2,
        "problematic_frames": 1,
        "total_error": 30.5,
        "average_error": 1.7,
        "results": [
            {"frame_id": "f1", "timestamp": 0.0, "score": 0.25,
             "joint_issues": [{"joint": "left_elbow", "delta_angle": 20, "suggestion": ""}],
             "suggestions": []},
            {"frame_id": "f2", "timestamp": 0.1, "score": 0.0, "joint_issues": [], "suggestions": []}
        ]
    }"#;

    #[test]
    fn rejects_non_http_base_urls() {
        assert!(matches!(
            AnalysisClient::new("ftp://example.com/api"),
            Err(ApiError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            AnalysisClient::new("not a url"),
            Err(ApiError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn trailing_slashes_are_trimmed() {
        let client = AnalysisClient::new("http://localhost:5001/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5001/api");
        assert_eq!(client.endpoint("health"), "http://localhost:5001/api/health");
    }

    #[test]
    fn health_check_reads_status_field() {
        let (url, rx) = serve_once(json_response("200 OK", r#"{"status":"ok"}"#));
        let client = AnalysisClient::new(&format!("{url}/api")).unwrap();
        assert!(client.check_health());
        let request = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(request.starts_with("GET /api/health "));
    }

    #[test]
    fn health_check_is_false_when_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = AnalysisClient::new(&format!("http://{addr}/api")).unwrap();
        assert!(!client.check_health());
    }

    #[test]
    fn analyze_uploads_form_and_normalizes_response() {
        let dir = tempdir().unwrap();
        let original = write_video(dir.path(), "original.mp4", b"reference");
        let user = write_video(dir.path(), "cover.webm", b"attempt");
        let (url, rx) = serve_once(json_response("200 OK", ANALYSIS_BODY));
        let client = AnalysisClient::new(&format!("{url}/api")).unwrap();
        let options = AnalysisOptions {
            difficulty: Some(Difficulty::Intermediate),
            fps: None,
        };

        let result = client.try_analyze(&original, &user, &options).unwrap();
        assert_eq!(result.average_error, 1.0);
        assert_eq!(result.results.len(), 2);
        assert_eq!(
            result.results[0].suggestions[0].text,
            "Fix alignment of your left_elbow (20.0° difference)"
        );

        let request = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(request.starts_with("POST /api/analyze "));
        assert!(request.contains("name=\"original\"; filename=\"original.mp4\""));
        assert!(request.contains("name=\"user\"; filename=\"cover.webm\""));
        assert!(request.contains("Content-Type: video/webm"));
        assert!(request.contains("name=\"difficulty\"\r\n\r\nintermediate\r\n"));
        assert!(request.contains("name=\"fps\"\r\n\r\n10.0\r\n"));
    }

    #[test]
    fn identical_uploads_override_backend_errors() {
        let dir = tempdir().unwrap();
        let video = write_video(dir.path(), "same.mp4", b"identical");
        let (url, _rx) = serve_once(json_response("200 OK", ANALYSIS_BODY));
        let client = AnalysisClient::new(&format!("{url}/api")).unwrap();

        let result = client
            .try_analyze(&video, &video.clone(), &AnalysisOptions::default())
            .unwrap();
        assert_eq!(result.average_error, 0.0);
        assert!(result.results.iter().all(|frame| frame.joint_issues.is_empty()));
        assert!(result.results.iter().all(|frame| frame.suggestions.is_empty()));
    }

    #[test]
    fn server_error_message_is_surfaced() {
        let dir = tempdir().unwrap();
        let original = write_video(dir.path(), "a.mp4", b"a");
        let user = write_video(dir.path(), "b.mp4", b"b");
        let (url, _rx) = serve_once(json_response(
            "500 Internal Server Error",
            r#"{"error": "No poses detected in original video"}"#,
        ));
        let client = AnalysisClient::new(&format!("{url}/api")).unwrap();

        let err = client
            .try_analyze(&original, &user, &AnalysisOptions::default())
            .unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 500, .. }));
        assert!(err.to_string().contains("No poses detected"));
    }

    #[test]
    fn analyze_falls_back_on_failure() {
        let dir = tempdir().unwrap();
        let original = write_video(dir.path(), "a.mp4", b"a");
        let user = write_video(dir.path(), "b.mp4", b"b");
        let (url, _rx) = serve_once(json_response("502 Bad Gateway", "upstream down"));
        let client = AnalysisClient::new(&format!("{url}/api")).unwrap();

        let result = client.analyze(&original, &user, &AnalysisOptions::default());
        let message = result.error.expect("fallback carries the error");
        assert!(message.contains("Server responded with 502"));
        assert_eq!(result.average_error, 0.2);
        assert!(result.results.is_empty());
    }

    #[test]
    fn non_object_payload_is_invalid() {
        assert!(matches!(
            parse_analysis_response("[1, 2]"),
            Err(ApiError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_analysis_response("   "),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn update_difficulty_posts_display_name() {
        let (url, rx) = serve_once(json_response("200 OK", r#"{"difficulty":"Advanced"}"#));
        let client = AnalysisClient::new(&format!("{url}/api")).unwrap();
        let reply = client.update_difficulty(Difficulty::Advanced).unwrap();
        assert_eq!(reply["difficulty"], "Advanced");
        let request = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(request.starts_with("POST /api/difficulty "));
        assert!(request.contains(r#"{"difficulty":"Advanced"}"#));
    }
}
