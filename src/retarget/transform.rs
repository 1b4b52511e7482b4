//! Animation output types

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Local transform of one bone in one frame.
///
/// Serializes translation and scale as `[x, y, z]` and rotation as a unit
/// quaternion `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneTransform {
    pub translation: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub scale: Vector3<f64>,
    /// Minimum visibility of the landmarks the bone depends on
    pub visibility: f64,
    /// Lowest rig-space height of the bone's head and tail
    #[serde(skip)]
    pub(crate) lowest_point: f64,
}

impl BoneTransform {
    /// Rest transform with the given visibility
    #[must_use]
    pub fn identity(visibility: f64) -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::repeat(1.0),
            visibility,
            lowest_point: 0.0,
        }
    }

    /// Lowest world-space height reached by the bone in rig units
    #[must_use]
    pub fn lowest_point(&self) -> f64 {
        self.lowest_point
    }

    /// True when every component differs from `other` by less than `tolerance`
    /// (rotation compared by angle in radians). A zero tolerance never matches.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (self.translation - other.translation).norm() < tolerance
            && (self.scale - other.scale).norm() < tolerance
            && (self.visibility - other.visibility).abs() < tolerance
            && self.rotation.angle_to(&other.rotation) < tolerance
    }
}

/// Keyed bones of one output frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneTransformFrame {
    pub frame_index: usize,
    pub timestamp: f64,
    pub bones: BTreeMap<String, BoneTransform>,
}

/// Retargeted animation, one frame per input frame in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneTransformSequence {
    /// Name of the rig profile the animation was retargeted onto
    pub rig: String,
    pub frame_rate: f64,
    pub frames: Vec<BoneTransformFrame>,
}

impl BoneTransformSequence {
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Every bone keyed in at least one frame
    #[must_use]
    pub fn bone_names(&self) -> BTreeSet<&str> {
        self.frames
            .iter()
            .flat_map(|frame| frame.bones.keys().map(String::as_str))
            .collect()
    }

    /// Keys of one bone as `(frame_index, transform)`
    pub fn track<'a>(&'a self, bone: &'a str) -> impl Iterator<Item = (usize, &'a BoneTransform)> + 'a {
        self.frames
            .iter()
            .filter_map(move |frame| frame.bones.get(bone).map(|transform| (frame.frame_index, transform)))
    }

    /// Total number of bone keys across all frames
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.frames.iter().map(|frame| frame.bones.len()).sum()
    }
}
