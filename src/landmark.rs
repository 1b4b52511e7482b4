//! Canonical body landmarks and their anatomical topology.
//!
//! The detector produces 33 landmarks per frame in a fixed order. Joint
//! identity is a closed enumeration whose discriminant is the landmark's
//! index in that order, so "fixed cardinality, canonical order" is checked
//! against [`Joint::ALL`] rather than against free-form names.

use crate::{constants::NUM_LANDMARKS, Error, Result};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Canonical joint identity, in detector order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(usize)]
pub enum Joint {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl Joint {
    pub const COUNT: usize = NUM_LANDMARKS;

    /// Every joint in canonical order
    pub const ALL: [Joint; NUM_LANDMARKS] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    /// Position of the joint in a frame's landmark list
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Detector name, e.g. `LEFT_ELBOW`
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nose => "NOSE",
            Self::LeftEyeInner => "LEFT_EYE_INNER",
            Self::LeftEye => "LEFT_EYE",
            Self::LeftEyeOuter => "LEFT_EYE_OUTER",
            Self::RightEyeInner => "RIGHT_EYE_INNER",
            Self::RightEye => "RIGHT_EYE",
            Self::RightEyeOuter => "RIGHT_EYE_OUTER",
            Self::LeftEar => "LEFT_EAR",
            Self::RightEar => "RIGHT_EAR",
            Self::MouthLeft => "MOUTH_LEFT",
            Self::MouthRight => "MOUTH_RIGHT",
            Self::LeftShoulder => "LEFT_SHOULDER",
            Self::RightShoulder => "RIGHT_SHOULDER",
            Self::LeftElbow => "LEFT_ELBOW",
            Self::RightElbow => "RIGHT_ELBOW",
            Self::LeftWrist => "LEFT_WRIST",
            Self::RightWrist => "RIGHT_WRIST",
            Self::LeftPinky => "LEFT_PINKY",
            Self::RightPinky => "RIGHT_PINKY",
            Self::LeftIndex => "LEFT_INDEX",
            Self::RightIndex => "RIGHT_INDEX",
            Self::LeftThumb => "LEFT_THUMB",
            Self::RightThumb => "RIGHT_THUMB",
            Self::LeftHip => "LEFT_HIP",
            Self::RightHip => "RIGHT_HIP",
            Self::LeftKnee => "LEFT_KNEE",
            Self::RightKnee => "RIGHT_KNEE",
            Self::LeftAnkle => "LEFT_ANKLE",
            Self::RightAnkle => "RIGHT_ANKLE",
            Self::LeftHeel => "LEFT_HEEL",
            Self::RightHeel => "RIGHT_HEEL",
            Self::LeftFootIndex => "LEFT_FOOT_INDEX",
            Self::RightFootIndex => "RIGHT_FOOT_INDEX",
        }
    }

    /// The segment this joint drives when it is mapped to a rig bone.
    ///
    /// Returns `None` for face, finger and heel landmarks, which have no
    /// anatomical child in the canonical topology.
    #[must_use]
    pub fn segment(self) -> Option<Segment> {
        use Joint::*;

        let (from, to) = match self {
            Nose => (Anchor::Midpoint(LeftShoulder, RightShoulder), Anchor::Joint(Nose)),
            LeftShoulder => (Anchor::Joint(LeftShoulder), Anchor::Joint(LeftElbow)),
            LeftElbow => (Anchor::Joint(LeftElbow), Anchor::Joint(LeftWrist)),
            LeftWrist => (Anchor::Joint(LeftWrist), Anchor::Joint(LeftIndex)),
            RightShoulder => (Anchor::Joint(RightShoulder), Anchor::Joint(RightElbow)),
            RightElbow => (Anchor::Joint(RightElbow), Anchor::Joint(RightWrist)),
            RightWrist => (Anchor::Joint(RightWrist), Anchor::Joint(RightIndex)),
            LeftHip => (Anchor::Joint(LeftHip), Anchor::Joint(LeftKnee)),
            LeftKnee => (Anchor::Joint(LeftKnee), Anchor::Joint(LeftAnkle)),
            LeftAnkle => (Anchor::Joint(LeftAnkle), Anchor::Joint(LeftFootIndex)),
            RightHip => (Anchor::Joint(RightHip), Anchor::Joint(RightKnee)),
            RightKnee => (Anchor::Joint(RightKnee), Anchor::Joint(RightAnkle)),
            RightAnkle => (Anchor::Joint(RightAnkle), Anchor::Joint(RightFootIndex)),
            _ => return None,
        };

        Some(Segment { from, to })
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Joint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|joint| joint.name() == upper)
            .ok_or_else(|| Error::Configuration(format!("'{s}' is not a canonical joint name")))
    }
}

/// Coordinate axis of a landmark channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Self::X, Self::Y, Self::Z];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        })
    }
}

/// One end of a segment: either a landmark or the midpoint of two landmarks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Joint(Joint),
    Midpoint(Joint, Joint),
}

impl Anchor {
    /// Resolve the anchor against a position lookup
    pub fn resolve<F>(self, position: F) -> Vector3<f64>
    where
        F: Fn(Joint) -> Vector3<f64>,
    {
        match self {
            Self::Joint(joint) => position(joint),
            Self::Midpoint(a, b) => (position(a) + position(b)) * 0.5,
        }
    }

    fn push_joints(self, out: &mut Vec<Joint>) {
        match self {
            Self::Joint(joint) => out.push(joint),
            Self::Midpoint(a, b) => {
                out.push(a);
                out.push(b);
            }
        }
    }
}

/// Directed parent-to-child segment of the canonical topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub from: Anchor,
    pub to: Anchor,
}

impl Segment {
    /// Every landmark the segment depends on
    #[must_use]
    pub fn joints(&self) -> Vec<Joint> {
        let mut joints = Vec::with_capacity(4);
        self.from.push_joints(&mut joints);
        self.to.push_joints(&mut joints);
        joints
    }
}

/// A single joint sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub joint: Joint,
    /// Detector pixel/depth coordinates
    pub position: Vector3<f64>,
    /// Visibility/confidence in [0, 1]
    pub visibility: f64,
}

impl Landmark {
    #[must_use]
    pub fn new(joint: Joint, x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self {
            joint,
            position: Vector3::new(x, y, z),
            visibility,
        }
    }

    /// Whether the sample is a placeholder for a missed detection
    #[must_use]
    pub fn is_missing(&self, threshold: f64) -> bool {
        self.visibility < threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_index_round_trip() {
        for (i, joint) in Joint::ALL.iter().enumerate() {
            assert_eq!(joint.index(), i);
            assert_eq!(Joint::from_index(i), Some(*joint));
        }
        assert_eq!(Joint::from_index(Joint::COUNT), None);
    }

    #[test]
    fn test_joint_from_str() {
        assert_eq!("LEFT_ELBOW".parse::<Joint>().unwrap(), Joint::LeftElbow);
        assert_eq!("right_foot_index".parse::<Joint>().unwrap(), Joint::RightFootIndex);
        assert!("LEFT_TAIL".parse::<Joint>().is_err());
    }

    #[test]
    fn test_segment_dependencies() {
        let head = Joint::Nose.segment().unwrap();
        assert_eq!(
            head.joints(),
            vec![Joint::LeftShoulder, Joint::RightShoulder, Joint::Nose]
        );

        let forearm = Joint::LeftElbow.segment().unwrap();
        assert_eq!(forearm.joints(), vec![Joint::LeftElbow, Joint::LeftWrist]);

        assert!(Joint::LeftEye.segment().is_none());
        assert!(Joint::RightHeel.segment().is_none());
    }

    #[test]
    fn test_anchor_midpoint() {
        let anchor = Anchor::Midpoint(Joint::LeftHip, Joint::RightHip);
        let p = anchor.resolve(|joint| match joint {
            Joint::LeftHip => Vector3::new(2.0, 0.0, 0.0),
            _ => Vector3::new(0.0, 4.0, 0.0),
        });
        assert_eq!(p, Vector3::new(1.0, 2.0, 0.0));
    }
}
