//! Per-bone sequential scans.
//!
//! Each track reads only the sequence and its own previous output, so tracks
//! are solved independently of each other.

use super::transform::BoneTransform;
use crate::{
    config::RetargetConfig,
    constants::EPSILON,
    landmark::{Joint, Segment},
    rig::RestBone,
    sequence::PoseSequence,
};
use nalgebra::{Unit, UnitQuaternion, Vector3};
use std::f64::consts::PI;

/// What drives one output bone
#[derive(Debug, Clone)]
pub(crate) enum TrackSource {
    /// Hip midpoint translation and hip axis rotation
    Root,
    /// Rotation of a canonical segment against its rest direction
    Segment { segment: Segment, rest: RestBone },
}

#[derive(Debug, Clone)]
pub(crate) struct BoneTrack {
    pub bone: String,
    pub source: TrackSource,
}

impl BoneTrack {
    pub(crate) fn root(bone: &str) -> Self {
        Self {
            bone: bone.to_string(),
            source: TrackSource::Root,
        }
    }

    pub(crate) fn segment(bone: &str, segment: Segment, rest: RestBone) -> Self {
        Self {
            bone: bone.to_string(),
            source: TrackSource::Segment { segment, rest },
        }
    }

    /// Scan every frame in order, holding the last accepted pose through
    /// frames where the bone's landmarks are not visible enough
    pub(crate) fn solve(&self, sequence: &PoseSequence, config: &RetargetConfig) -> Vec<BoneTransform> {
        let mut held = BoneTransform::identity(0.0);
        let mut keys = Vec::with_capacity(sequence.frame_count());

        for f in 0..sequence.frame_count() {
            let position = |joint: Joint| to_rig_space(sequence.position(f, joint), config.world_scale);
            let key = match &self.source {
                TrackSource::Root => solve_root(sequence, f, &position, config, &held),
                TrackSource::Segment { segment, rest } => solve_segment(sequence, f, &position, config, segment, rest, &held),
            };
            held = key;
            keys.push(key);
        }

        keys
    }
}

fn solve_root<F>(
    sequence: &PoseSequence,
    f: usize,
    position: &F,
    config: &RetargetConfig,
    held: &BoneTransform,
) -> BoneTransform
where
    F: Fn(Joint) -> Vector3<f64>,
{
    let left = position(Joint::LeftHip);
    let right = position(Joint::RightHip);
    let visibility = sequence.visibility(f, Joint::LeftHip).min(sequence.visibility(f, Joint::RightHip));
    let center = (left + right) * 0.5;
    let axis = left - right;
    let width = axis.norm();

    let mut key = *held;
    key.visibility = visibility;

    if visibility <= config.min_visibility || !(width.is_finite() && width > EPSILON) || !is_finite(&center) {
        key.lowest_point = held.translation.y;
        return key;
    }

    key.translation = center;
    key.rotation = shortest_arc(&RestBone::root().direction, &(axis / width));
    key.scale = Vector3::repeat(1.0);
    key.lowest_point = center.y;
    key
}

fn solve_segment<F>(
    sequence: &PoseSequence,
    f: usize,
    position: &F,
    config: &RetargetConfig,
    segment: &Segment,
    rest: &RestBone,
    held: &BoneTransform,
) -> BoneTransform
where
    F: Fn(Joint) -> Vector3<f64>,
{
    let head = segment.from.resolve(position);
    let tail = segment.to.resolve(position);
    let visibility = segment
        .joints()
        .iter()
        .map(|&joint| sequence.visibility(f, joint))
        .fold(f64::INFINITY, f64::min);

    let direction = tail - head;
    let length = direction.norm();

    let mut key = *held;
    key.visibility = visibility;
    key.lowest_point = head.y.min(tail.y);

    if visibility <= config.min_visibility || !(length.is_finite() && length > EPSILON) {
        return key;
    }

    key.rotation = shortest_arc(&rest.direction, &(direction / length));
    key.scale = if config.stretch.enabled {
        let ratio = (length / rest.length).clamp(config.stretch.min_scale, config.stretch.max_scale);
        Vector3::new(1.0, ratio, 1.0)
    } else {
        Vector3::repeat(1.0)
    };
    key
}

/// Detector space (x right, y down, z away from camera negative) to rig
/// space (x right, y up, z forward)
#[must_use]
pub fn to_rig_space(point: Vector3<f64>, world_scale: f64) -> Vector3<f64> {
    Vector3::new(point.x, -point.y, -point.z) * world_scale
}

/// Shortest-arc rotation taking unit vector `from` onto unit vector `to`
#[must_use]
pub fn shortest_arc(from: &Vector3<f64>, to: &Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::rotation_between(from, to).unwrap_or_else(|| {
        if from.dot(to) > 0.0 {
            return UnitQuaternion::identity();
        }
        // Antiparallel: half turn about any perpendicular axis
        let mut axis = from.cross(&Vector3::x());
        if axis.norm() < 1e-6 {
            axis = from.cross(&Vector3::y());
        }
        UnitQuaternion::from_axis_angle(&Unit::new_normalize(axis), PI)
    })
}

fn is_finite(v: &Vector3<f64>) -> bool {
    v.iter().all(|c| c.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortest_arc() {
        let cases = [
            (Vector3::x(), Vector3::y()),
            (Vector3::x(), Vector3::x()),
            (Vector3::x(), -Vector3::x()),
            (-Vector3::y(), Vector3::new(0.6, -0.8, 0.0)),
            (Vector3::z(), -Vector3::z()),
        ];
        for (from, to) in cases {
            let rotation = shortest_arc(&from, &to);
            assert!((rotation * from - to).norm() < 1e-9, "{from:?} -> {to:?}");
        }
        assert!(shortest_arc(&Vector3::y(), &Vector3::y()).angle() < 1e-12);
    }

    #[test]
    fn test_to_rig_space() {
        let p = to_rig_space(Vector3::new(1.0, 2.0, 3.0), 0.5);
        assert_eq!(p, Vector3::new(0.5, -1.0, -1.5));
    }
}
