//! Plain-text rendering for the CLI views.

use std::fmt::Write as _;

use crate::{
    analysis_api::AnalysisResult,
    history::HistoryEntry,
    keyframes::{Keyframe, overall_score},
};

/// Shown instead of keyframes when an analysis produced none.
pub const NO_RESULTS_MESSAGE: &str = "No analysis results available.";
pub const NO_ISSUES_MESSAGE: &str = "No issues detected for this keyframe. Great job!";
pub const EMPTY_HISTORY_MESSAGE: &str = "Your analysis history will appear here.";
pub const EMPTY_HISTORY_HINT: &str = "Complete an analysis to get started!";

/// Coarse rating used to label scores.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreTone {
    Good,
    Fair,
    Poor,
}

impl ScoreTone {
    /// Rating of a single keyframe score.
    pub fn for_keyframe(score: u8) -> Self {
        Self::banded(score, 90, 80)
    }

    /// Rating of a history entry's overall score.
    pub fn for_history(score: u8) -> Self {
        Self::banded(score, 85, 70)
    }

    fn banded(score: u8, good_above: u8, fair_above: u8) -> Self {
        if score > good_above {
            Self::Good
        } else if score > fair_above {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "needs work",
        }
    }
}

/// Backend summary block for a finished analysis.
pub fn render_summary(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let difficulty = if result.difficulty_name.is_empty() {
        result.difficulty.as_str()
    } else {
        result.difficulty_name.as_str()
    };
    let _ = writeln!(out, "Difficulty:         {difficulty} ({}° threshold)", result.threshold);
    let _ = writeln!(out, "Frames analyzed:    {}", result.frames_analyzed);
    let _ = writeln!(out, "Problematic frames: {}", result.problematic_frames);
    let _ = writeln!(out, "Average error:      {:.1}%", result.average_error * 100.0);
    let _ = writeln!(out, "Frame rate:         {} fps", result.fps);
    if let Some(error) = &result.error {
        let _ = writeln!(out, "Error:              {error}");
    }
    if !result.suggestions.is_empty() {
        let _ = writeln!(out, "Suggestions:");
        for suggestion in &result.suggestions {
            let _ = writeln!(out, "  - {suggestion}");
        }
    }
    out
}

/// Keyframe list with the overall score on top.
pub fn render_keyframes(keyframes: &[Keyframe]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Overall score: {}", overall_score(keyframes));
    if keyframes.is_empty() {
        let _ = writeln!(out, "{NO_RESULTS_MESSAGE}");
        return out;
    }
    let _ = writeln!(out, "Keyframes");
    for keyframe in keyframes {
        let tone = ScoreTone::for_keyframe(keyframe.score);
        let plural = if keyframe.issues == 1 { "" } else { "s" };
        let _ = writeln!(
            out,
            "  #{:<3} {:>6.1}s  {:>3}% ({})  {} issue{plural} detected",
            keyframe.id,
            keyframe.time,
            keyframe.score,
            tone.label(),
            keyframe.issues,
        );
        if keyframe.suggestions.is_empty() {
            let _ = writeln!(out, "        {NO_ISSUES_MESSAGE}");
        }
        for suggestion in &keyframe.suggestions {
            let _ = writeln!(out, "        {}: {}", suggestion.part, suggestion.text);
        }
        if keyframe.synthetic_offsets {
            let _ = writeln!(out, "        (user pose offsets are illustrative)");
        }
    }
    out
}

/// Past analyses, newest first.
pub fn render_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return format!("{EMPTY_HISTORY_MESSAGE}\n{EMPTY_HISTORY_HINT}\n");
    }
    let mut out = String::from("Previous Analyses\n");
    for entry in entries {
        let _ = writeln!(
            out,
            "  {:>3} ({})  Analysis from {}  {} keyframes analyzed  [{}]",
            entry.overall_score,
            ScoreTone::for_history(entry.overall_score).label(),
            entry.date,
            entry.keyframes.len(),
            entry.id,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis_api::{FrameResult, JointIssue, fallback_result};
    use crate::keyframes::{TransformOptions, convert_to_keyframes_with_rng};
    use rand::{SeedableRng, rngs::StdRng};

    fn keyframes() -> Vec<Keyframe> {
        let result = AnalysisResult {
            results: vec![
                FrameResult {
                    timestamp: Some(2.5),
                    joint_issues: vec![JointIssue {
                        joint: "right_elbow".into(),
                        delta_angle: -15.0,
                        suggestion: "Raise your right arm".into(),
                    }],
                    ..FrameResult::default()
                },
                FrameResult {
                    timestamp: Some(5.1),
                    ..FrameResult::default()
                },
            ],
            ..AnalysisResult::default()
        };
        convert_to_keyframes_with_rng(&result, TransformOptions::default(), &mut StdRng::seed_from_u64(5))
    }

    #[test]
    fn tones_follow_their_bands() {
        assert_eq!(ScoreTone::for_keyframe(91), ScoreTone::Good);
        assert_eq!(ScoreTone::for_keyframe(90), ScoreTone::Fair);
        assert_eq!(ScoreTone::for_keyframe(80), ScoreTone::Poor);
        assert_eq!(ScoreTone::for_history(86), ScoreTone::Good);
        assert_eq!(ScoreTone::for_history(71), ScoreTone::Fair);
        assert_eq!(ScoreTone::for_history(70), ScoreTone::Poor);
    }

    #[test]
    fn empty_keyframes_still_show_overall_score() {
        assert_eq!(
            render_keyframes(&[]),
            "Overall score: 0\nNo analysis results available.\n"
        );
    }

    #[test]
    fn keyframes_list_scores_and_suggestions() {
        let text = render_keyframes(&keyframes());
        assert!(text.starts_with("Overall score: "));
        assert!(text.contains("2.5s"));
        assert!(text.contains("1 issue detected"));
        assert!(text.contains("right_elbow: Raise your right arm"));
        assert!(text.contains("0 issues detected"));
        assert!(text.contains(NO_ISSUES_MESSAGE));
        assert!(text.contains("illustrative"));
    }

    #[test]
    fn summary_includes_error_of_fallback() {
        let text = render_summary(&fallback_result("Server responded with 500"));
        assert!(text.contains("Difficulty:         Beginner (15° threshold)"));
        assert!(text.contains("Average error:      20.0%"));
        assert!(text.contains("Error:              Server responded with 500"));
    }

    #[test]
    fn empty_history_renders_hint() {
        let text = render_history(&[]);
        assert!(text.contains(EMPTY_HISTORY_MESSAGE));
        assert!(text.contains(EMPTY_HISTORY_HINT));
    }

    #[test]
    fn history_lines_show_date_and_count() {
        let entry = HistoryEntry {
            id: "abc".into(),
            date: "June 20, 2025, 04:30 PM".into(),
            overall_score: 92,
            keyframes: keyframes(),
        };
        let text = render_history(&[entry]);
        assert!(text.starts_with("Previous Analyses\n"));
        assert!(text.contains(" 92 (good)  Analysis from June 20, 2025, 04:30 PM  2 keyframes analyzed  [abc]"));
    }
}
