//! Seventeen-joint 2-D skeleton used for side-by-side pose overlays.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The anatomical joints of a pose, in keypoint order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

/// Number of joints in every pose.
pub const JOINT_COUNT: usize = 17;

impl JointName {
    pub const ALL: [JointName; JOINT_COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }

    /// Parse a backend joint label such as `left_elbow`, `Left Elbow` or `left-elbow`.
    pub fn parse(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .chars()
            .map(|ch| match ch {
                ' ' | '-' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();
        Self::ALL
            .into_iter()
            .find(|joint| joint.as_str() == normalized)
    }

    /// Elbows and wrists.
    pub fn is_arm(self) -> bool {
        matches!(
            self,
            Self::LeftElbow | Self::RightElbow | Self::LeftWrist | Self::RightWrist
        )
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One keypoint with its detection confidence in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub name: JointName,
    pub x: f64,
    pub y: f64,
    pub score: f64,
}

/// A full skeleton; always holds every joint exactly once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<JointName, Joint>",
    into = "BTreeMap<JointName, Joint>"
)]
pub struct Pose {
    joints: [Joint; JOINT_COUNT],
}

/// Smallest |Δx| used when computing a segment slope.
pub const MIN_SLOPE_DENOMINATOR: f64 = 1e-3;

impl Pose {
    /// Build a pose from `(x, y, confidence)` triples in [`JointName::ALL`] order.
    pub fn from_coords(coords: [(f64, f64, f64); JOINT_COUNT]) -> Self {
        let joints = std::array::from_fn(|idx| {
            let (x, y, score) = coords[idx];
            Joint {
                name: JointName::ALL[idx],
                x,
                y,
                score: score.clamp(0.0, 1.0),
            }
        });
        Self { joints }
    }

    /// Canonical reference skeleton drawn for the original performance.
    pub fn reference_original() -> Self {
        Self::from_coords([
            (320.0, 80.0, 0.95),
            (310.0, 70.0, 0.92),
            (330.0, 70.0, 0.92),
            (298.0, 76.0, 0.85),
            (342.0, 76.0, 0.85),
            (280.0, 130.0, 0.93),
            (360.0, 130.0, 0.93),
            (240.0, 180.0, 0.9),
            (400.0, 180.0, 0.9),
            (210.0, 230.0, 0.88),
            (430.0, 230.0, 0.88),
            (295.0, 260.0, 0.9),
            (345.0, 260.0, 0.9),
            (290.0, 340.0, 0.87),
            (350.0, 340.0, 0.87),
            (285.0, 420.0, 0.85),
            (355.0, 420.0, 0.85),
        ])
    }

    /// Starting skeleton for the user, slightly displaced from the original
    /// so both remain visible when overlaid.
    pub fn reference_user() -> Self {
        Self::from_coords([
            (326.0, 84.0, 0.92),
            (316.0, 74.0, 0.9),
            (336.0, 74.0, 0.9),
            (304.0, 80.0, 0.82),
            (348.0, 80.0, 0.82),
            (284.0, 134.0, 0.9),
            (366.0, 132.0, 0.9),
            (236.0, 172.0, 0.88),
            (408.0, 190.0, 0.88),
            (200.0, 214.0, 0.85),
            (444.0, 246.0, 0.85),
            (298.0, 262.0, 0.88),
            (350.0, 264.0, 0.88),
            (288.0, 344.0, 0.85),
            (358.0, 338.0, 0.85),
            (280.0, 424.0, 0.82),
            (362.0, 418.0, 0.82),
        ])
    }

    pub fn joint(&self, name: JointName) -> &Joint {
        &self.joints[name.index()]
    }

    pub fn joint_mut(&mut self, name: JointName) -> &mut Joint {
        &mut self.joints[name.index()]
    }

    pub fn joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints.iter()
    }

    /// Move a joint by `(dx, dy)` and replace its confidence.
    pub fn displace(&mut self, name: JointName, dx: f64, dy: f64, confidence: f64) {
        let joint = self.joint_mut(name);
        joint.x += dx;
        joint.y += dy;
        joint.score = confidence.clamp(0.0, 1.0);
    }

    /// Slope Δy/Δx of the segment `from -> to`, with |Δx| floored at
    /// [`MIN_SLOPE_DENOMINATOR`].
    pub fn segment_slope(&self, from: JointName, to: JointName) -> f64 {
        let start = self.joint(from);
        let end = self.joint(to);
        let dy = end.y - start.y;
        let dx = end.x - start.x;
        let dx = if dx.abs() < MIN_SLOPE_DENOMINATOR {
            MIN_SLOPE_DENOMINATOR.copysign(dx)
        } else {
            dx
        };
        dy / dx
    }
}

impl From<Pose> for BTreeMap<JointName, Joint> {
    fn from(pose: Pose) -> Self {
        pose.joints.into_iter().map(|joint| (joint.name, joint)).collect()
    }
}

impl TryFrom<BTreeMap<JointName, Joint>> for Pose {
    type Error = String;

    fn try_from(mut map: BTreeMap<JointName, Joint>) -> Result<Self, Self::Error> {
        let mut coords = [(0.0, 0.0, 0.0); JOINT_COUNT];
        for name in JointName::ALL {
            let joint = map
                .remove(&name)
                .ok_or_else(|| format!("pose is missing joint '{}'", name.as_str()))?;
            coords[name.index()] = (joint.x, joint.y, joint.score);
        }
        Ok(Self::from_coords(coords))
    }
}
