//! Post-processing applied to every backend response before it is displayed.

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use super::types::{AnalysisResult, Difficulty, DEFAULT_FPS, FrameResult, JointIssue, Suggestion};

/// Error ratio reported by the fallback result.
pub const FALLBACK_AVERAGE_ERROR: f64 = 0.2;

/// Clean up a decoded response.
///
/// When both uploads are the same video the backend's numbers are discarded
/// and every frame is reported as a perfect match. Otherwise error ratios are
/// clamped to `[0, 1]` and frames that only carry joint issues get
/// suggestions derived from them.
pub fn normalize_result(mut result: AnalysisResult, identical_videos: bool) -> AnalysisResult {
    if identical_videos {
        tracing::info!("Identical videos detected; reporting a perfect match");
        result.average_error = 0.0;
        for frame in &mut result.results {
            frame.score = 0.0;
            frame.joint_issues.clear();
            frame.suggestions.clear();
        }
        return result;
    }

    result.average_error = clamp_unit(result.average_error);
    for frame in &mut result.results {
        normalize_frame(frame);
    }
    result
}

fn normalize_frame(frame: &mut FrameResult) {
    frame.score = clamp_unit(frame.score);
    if !frame.joint_issues.is_empty() && frame.suggestions.is_empty() {
        frame.suggestions = frame.joint_issues.iter().map(alignment_suggestion).collect();
    }
}

fn alignment_suggestion(issue: &JointIssue) -> Suggestion {
    let text = if issue.suggestion.trim().is_empty() {
        format!(
            "Fix alignment of your {} ({:.1}° difference)",
            issue.joint, issue.delta_angle
        )
    } else {
        issue.suggestion.clone()
    };
    Suggestion {
        part: issue.joint.clone(),
        text,
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Renderable result used when the backend call fails for any reason.
pub fn fallback_result(message: impl Into<String>) -> AnalysisResult {
    fallback_result_at(message, OffsetDateTime::now_utc())
}

pub(crate) fn fallback_result_at(message: impl Into<String>, now: OffsetDateTime) -> AnalysisResult {
    let difficulty = Difficulty::Beginner;
    AnalysisResult {
        difficulty: difficulty.api_name().to_string(),
        difficulty_name: difficulty.display_name().to_string(),
        threshold: difficulty.threshold_degrees(),
        fps: f64::from(DEFAULT_FPS),
        frames_analyzed: 0,
        problematic_frames: 0,
        total_error: 0.0,
        average_error: FALLBACK_AVERAGE_ERROR,
        results: Vec::new(),
        suggestions: Vec::new(),
        error: Some(message.into()),
        timestamp: now.format(&Rfc3339).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(joint: &str, delta: f64, suggestion: &str) -> JointIssue {
        JointIssue {
            joint: joint.to_string(),
            delta_angle: delta,
            suggestion: suggestion.to_string(),
        }
    }

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            average_error: 3.5,
            results: vec![
                FrameResult {
                    frame_id: "1".into(),
                    timestamp: Some(0.5),
                    score: 1.8,
                    joint_issues: vec![
                        issue("left_knee", 18.34, ""),
                        issue("right_wrist", -9.0, "Relax the wrist"),
                    ],
                    suggestions: Vec::new(),
                },
                FrameResult {
                    frame_id: "2".into(),
                    timestamp: Some(1.0),
                    score: -0.2,
                    joint_issues: vec![issue("nose", 4.0, "")],
                    suggestions: vec![Suggestion {
                        part: "general".into(),
                        text: "Keep the beat".into(),
                    }],
                },
            ],
            ..AnalysisResult::default()
        }
    }

    #[test]
    fn identical_videos_are_a_perfect_match() {
        let result = normalize_result(sample_result(), true);
        assert_eq!(result.average_error, 0.0);
        for frame in &result.results {
            assert_eq!(frame.score, 0.0);
            assert!(frame.joint_issues.is_empty());
            assert!(frame.suggestions.is_empty());
        }
    }

    #[test]
    fn errors_are_clamped_to_unit_range() {
        let result = normalize_result(sample_result(), false);
        assert_eq!(result.average_error, 1.0);
        assert_eq!(result.results[0].score, 1.0);
        assert_eq!(result.results[1].score, 0.0);
    }

    #[test]
    fn suggestions_are_derived_from_issues_when_missing() {
        let result = normalize_result(sample_result(), false);
        let derived = &result.results[0].suggestions;
        assert_eq!(derived.len(), 2);
        assert_eq!(derived[0].part, "left_knee");
        assert_eq!(derived[0].text, "Fix alignment of your left_knee (18.3° difference)");
        assert_eq!(derived[1].text, "Relax the wrist");
        assert_eq!(result.results[1].suggestions[0].text, "Keep the beat");
    }

    #[test]
    fn fallback_carries_error_and_default_shape() {
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let result = fallback_result_at("connection refused", now);
        assert_eq!(result.error.as_deref(), Some("connection refused"));
        assert_eq!(result.average_error, FALLBACK_AVERAGE_ERROR);
        assert_eq!(result.difficulty, "beginner");
        assert_eq!(result.threshold, 15.0);
        assert_eq!(result.fps, 10.0);
        assert!(result.results.is_empty());
        assert_eq!(result.timestamp.as_deref(), Some("2023-11-14T22:13:20Z"));
    }
}
