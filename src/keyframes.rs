//! Turns backend frame results into display keyframes.
//!
//! Each [`FrameResult`] becomes a [`Keyframe`] with a 0-100 score and two
//! skeletons for the overlay. The backend sends no coordinates, so both poses
//! are synthesized: the original is a fixed reference and the user pose is a
//! second reference bent by the reported joint-angle deltas.
//!
//! The score blends a weighted angle-error score with an arm-slope score and
//! then lifts low scores with a leniency curve. The constants are tuned by
//! eye and have no derivation; keep them as they are.
//!
//! When a frame has no issues, or scores above 95, the two skeletons would
//! be nearly indistinguishable, so the user pose gets random offsets. Those
//! offsets are cosmetic, not measured; such keyframes carry
//! `synthetic_offsets = true` and the behavior can be disabled through
//! [`TransformOptions`].

use std::f64::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    analysis_api::{AnalysisResult, FrameResult, JointIssue, Suggestion},
    pose::{JointName, Pose},
};

/// Weight applied to elbow and wrist deltas.
pub const ARM_JOINT_WEIGHT: f64 = 0.7;
/// Weight applied to every other joint, including unrecognized labels.
pub const DEFAULT_JOINT_WEIGHT: f64 = 1.0;
/// Shoulder-to-elbow slope difference that maps to an arm score of zero.
pub const MAX_SLOPE_DIFFERENCE: f64 = 2.0;
/// Weighted angle error in degrees that maps to an angle score of zero.
pub const MAX_ANGLE_ERROR: f64 = 120.0;
pub const ANGLE_SCORE_WEIGHT: f64 = 0.7;
pub const ARM_SLOPE_SCORE_WEIGHT: f64 = 0.3;
/// Scores below this are pulled up by the leniency curve.
pub const LENIENCY_THRESHOLD: f64 = 70.0;
/// Fraction of the distance below the threshold that is kept.
pub const LENIENCY_FACTOR: f64 = 0.7;
/// Pixels of displacement per degree of joint-angle delta.
pub const DISPLACEMENT_PER_DEGREE: f64 = 2.5;
pub const MAX_DISPLACEMENT: f64 = 60.0;
/// Confidence assigned to joints moved by a reported issue.
pub const PERTURBED_CONFIDENCE: f64 = 0.85;
/// Above this score the poses get cosmetic offsets.
pub const NEAR_PERFECT_SCORE: u8 = 95;
/// Seconds between keyframes when the backend omits timestamps.
pub const FALLBACK_FRAME_INTERVAL: f64 = 2.5;

const LIMB_OFFSET_JOINTS: [JointName; 6] = [
    JointName::LeftElbow,
    JointName::RightElbow,
    JointName::LeftWrist,
    JointName::RightWrist,
    JointName::LeftKnee,
    JointName::RightKnee,
];
const CORE_OFFSET_JOINTS: [JointName; 6] = [
    JointName::LeftShoulder,
    JointName::RightShoulder,
    JointName::LeftHip,
    JointName::RightHip,
    JointName::LeftAnkle,
    JointName::RightAnkle,
];
const LIMB_OFFSET_PX: (f64, f64) = (40.0, 65.0);
const CORE_OFFSET_PX: (f64, f64) = (15.0, 30.0);

const ARMS: [(JointName, JointName); 2] = [
    (JointName::LeftShoulder, JointName::LeftElbow),
    (JointName::RightShoulder, JointName::RightElbow),
];

/// Display data for one analyzed instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe {
    /// 1-based position in the result list.
    pub id: usize,
    /// Seconds from the start of the video.
    pub time: f64,
    pub score: u8,
    /// Number of joint issues the backend reported.
    pub issues: usize,
    pub suggestions: Vec<Suggestion>,
    pub original_pose: Pose,
    pub user_pose: Pose,
    /// True when `user_pose` carries random offsets that do not come from data.
    #[serde(default)]
    pub synthetic_offsets: bool,
}

/// Knobs for the keyframe transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransformOptions {
    pub cosmetic_offsets: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            cosmetic_offsets: true,
        }
    }
}

/// Intermediate values of the score computation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreBreakdown {
    pub weighted_error: f64,
    pub angle_score: f64,
    pub arm_slope_score: f64,
    pub score: u8,
}

/// Derive keyframes for every frame of a result using the thread RNG.
pub fn convert_to_keyframes(result: &AnalysisResult, options: TransformOptions) -> Vec<Keyframe> {
    convert_to_keyframes_with_rng(result, options, &mut rand::rng())
}

pub fn convert_to_keyframes_with_rng<R: Rng + ?Sized>(
    result: &AnalysisResult,
    options: TransformOptions,
    rng: &mut R,
) -> Vec<Keyframe> {
    result
        .results
        .iter()
        .enumerate()
        .map(|(index, frame)| build_keyframe(frame, index, options, rng))
        .collect()
}

/// Rounded mean keyframe score; zero when there are no keyframes.
pub fn overall_score(keyframes: &[Keyframe]) -> u8 {
    if keyframes.is_empty() {
        return 0;
    }
    let total: f64 = keyframes.iter().map(|kf| f64::from(kf.score)).sum();
    (total / keyframes.len() as f64).round().clamp(0.0, 100.0) as u8
}

pub fn build_keyframe<R: Rng + ?Sized>(
    frame: &FrameResult,
    index: usize,
    options: TransformOptions,
    rng: &mut R,
) -> Keyframe {
    let original_pose = Pose::reference_original();
    let breakdown = score_joint_issues(&frame.joint_issues);

    let mut user_pose = Pose::reference_user();
    perturb_pose(&mut user_pose, &frame.joint_issues);

    let needs_offsets =
        frame.joint_issues.is_empty() || breakdown.score > NEAR_PERFECT_SCORE;
    let synthetic_offsets = options.cosmetic_offsets && needs_offsets;
    if synthetic_offsets {
        apply_cosmetic_offsets(&mut user_pose, rng);
    }

    Keyframe {
        id: index + 1,
        time: frame
            .timestamp
            .unwrap_or(index as f64 * FALLBACK_FRAME_INTERVAL),
        score: breakdown.score,
        issues: frame.joint_issues.len(),
        suggestions: frame.joint_issues.iter().map(issue_suggestion).collect(),
        original_pose,
        user_pose,
        synthetic_offsets,
    }
}

/// Score a frame from its joint issues.
///
/// The arm-slope term compares the reference pose with the same pose bent by
/// the issues, so it only reacts to reported deltas.
pub fn score_joint_issues(issues: &[JointIssue]) -> ScoreBreakdown {
    let original = Pose::reference_original();
    let mut measured = original.clone();
    perturb_pose(&mut measured, issues);

    let weighted_error = weighted_angle_error(issues);
    let angle_score = angle_score(weighted_error);
    let arm_slope_score = arm_slope_score(&original, &measured);
    ScoreBreakdown {
        weighted_error,
        angle_score,
        arm_slope_score,
        score: blend_scores(angle_score, arm_slope_score),
    }
}

pub fn joint_weight(label: &str) -> f64 {
    match JointName::parse(label) {
        Some(joint) if joint.is_arm() => ARM_JOINT_WEIGHT,
        _ => DEFAULT_JOINT_WEIGHT,
    }
}

/// Sum of absolute, weighted angle deltas in degrees.
pub fn weighted_angle_error(issues: &[JointIssue]) -> f64 {
    issues
        .iter()
        .map(|issue| finite_or_zero(issue.delta_angle).abs() * joint_weight(&issue.joint))
        .sum()
}

/// Linear falloff of the weighted error against [`MAX_ANGLE_ERROR`].
pub fn angle_score(weighted_error: f64) -> f64 {
    let score = (100.0 - weighted_error / MAX_ANGLE_ERROR * 100.0).round();
    finite_or_zero(score).clamp(0.0, 100.0)
}

/// Mean of the per-arm shoulder-to-elbow slope scores.
pub fn arm_slope_score(original: &Pose, user: &Pose) -> f64 {
    let total: f64 = ARMS
        .iter()
        .map(|&(shoulder, elbow)| {
            let difference =
                (original.segment_slope(shoulder, elbow) - user.segment_slope(shoulder, elbow)).abs();
            let score = 100.0 - difference / MAX_SLOPE_DIFFERENCE * 100.0;
            finite_or_zero(score).max(0.0)
        })
        .sum();
    total / ARMS.len() as f64
}

/// Blend the two partial scores, apply leniency and clamp to `0..=100`.
pub fn blend_scores(angle_score: f64, arm_slope_score: f64) -> u8 {
    let blended =
        (angle_score * ANGLE_SCORE_WEIGHT + arm_slope_score * ARM_SLOPE_SCORE_WEIGHT).round();
    let lenient = apply_leniency(finite_or_zero(blended));
    lenient.clamp(0.0, 100.0) as u8
}

/// Compress scores below [`LENIENCY_THRESHOLD`] towards it.
pub fn apply_leniency(score: f64) -> f64 {
    if score < LENIENCY_THRESHOLD {
        (LENIENCY_THRESHOLD - (LENIENCY_THRESHOLD - score) * LENIENCY_FACTOR).round()
    } else {
        score
    }
}

/// Move every joint named by an issue along the direction of its delta.
pub fn perturb_pose(pose: &mut Pose, issues: &[JointIssue]) {
    for issue in issues {
        let Some(joint) = JointName::parse(&issue.joint) else {
            tracing::debug!("Ignoring issue for unknown joint '{}'", issue.joint);
            continue;
        };
        let delta = finite_or_zero(issue.delta_angle);
        let angle = delta.to_radians();
        let magnitude = (delta.abs() * DISPLACEMENT_PER_DEGREE).min(MAX_DISPLACEMENT);
        pose.displace(
            joint,
            angle.cos() * magnitude,
            angle.sin() * magnitude,
            PERTURBED_CONFIDENCE,
        );
    }
}

fn apply_cosmetic_offsets<R: Rng + ?Sized>(pose: &mut Pose, rng: &mut R) {
    let groups = [
        (&LIMB_OFFSET_JOINTS, LIMB_OFFSET_PX),
        (&CORE_OFFSET_JOINTS, CORE_OFFSET_PX),
    ];
    for (joints, (min_px, max_px)) in groups {
        for &name in joints.iter() {
            let magnitude = rng.random_range(min_px..=max_px);
            let angle = rng.random_range(0.0..TAU);
            let joint = pose.joint_mut(name);
            joint.x += angle.cos() * magnitude;
            joint.y += angle.sin() * magnitude;
        }
    }
}

fn issue_suggestion(issue: &JointIssue) -> Suggestion {
    let text = if issue.suggestion.trim().is_empty() {
        format!(
            "Adjust your {} by {}°",
            issue.joint.replace('_', " "),
            finite_or_zero(issue.delta_angle).round() as i64
        )
    } else {
        issue.suggestion.clone()
    };
    Suggestion {
        part: issue.joint.clone(),
        text,
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
