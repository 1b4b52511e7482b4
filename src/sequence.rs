//! Pose sequence buffer.
//!
//! A [`PoseSequence`] is built once from detector frames and never mutated.
//! Landmarks are stored as a contiguous channel grid indexed by
//! `(joint, axis, frame)`, so every coordinate channel is one slice that a
//! filter can scan independently of the others.

use crate::{
    constants::NUM_AXES,
    filters::Sample,
    landmark::{Axis, Joint, Landmark},
    Error, Result,
};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Landmarks of one video frame, in canonical joint order
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Zero-based frame index
    pub index: usize,
    /// Seconds since the start of the video
    pub timestamp: f64,
    pub landmarks: Vec<Landmark>,
}

impl Frame {
    /// Build a frame, deriving its timestamp from the frame rate
    #[must_use]
    pub fn new(index: usize, frame_rate: f64, landmarks: Vec<Landmark>) -> Self {
        Self {
            index,
            timestamp: index as f64 / frame_rate,
            landmarks,
        }
    }

    /// Landmark of a joint, if the frame has canonical shape
    #[must_use]
    pub fn landmark(&self, joint: Joint) -> Option<&Landmark> {
        self.landmarks.get(joint.index()).filter(|lm| lm.joint == joint)
    }
}

/// Sequence-level metadata
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequenceMetadata {
    pub frame_rate: f64,
    pub image_width: u32,
    pub image_height: u32,
}

impl SequenceMetadata {
    #[must_use]
    pub fn new(frame_rate: f64, image_width: u32, image_height: u32) -> Self {
        Self {
            frame_rate,
            image_width,
            image_height,
        }
    }
}

/// Immutable, validated sequence of pose frames
#[derive(Debug, Clone, PartialEq)]
pub struct PoseSequence {
    metadata: SequenceMetadata,
    frame_count: usize,
    /// `[joint][axis][frame]`
    positions: Vec<f64>,
    /// `[joint][frame]`
    visibility: Vec<f64>,
}

impl PoseSequence {
    /// Validate detector frames and pack them into the channel grid.
    ///
    /// # Errors
    ///
    /// Returns `Error::DataShape` if the frame rate is not positive, a frame
    /// does not hold exactly one landmark per canonical joint in canonical
    /// order, or frame indices are not `0, 1, 2, ...`.
    pub fn from_frames(metadata: SequenceMetadata, frames: &[Frame]) -> Result<Self> {
        if !(metadata.frame_rate.is_finite() && metadata.frame_rate > 0.0) {
            return Err(Error::DataShape(format!(
                "Frame rate must be positive, got {}",
                metadata.frame_rate
            )));
        }

        let frame_count = frames.len();
        let mut positions = vec![0.0; Joint::COUNT * NUM_AXES * frame_count];
        let mut visibility = vec![0.0; Joint::COUNT * frame_count];

        for (f, frame) in frames.iter().enumerate() {
            if frame.index != f {
                return Err(Error::DataShape(format!(
                    "Frame indices must be zero-based and contiguous: expected {}, got {}",
                    f, frame.index
                )));
            }
            if frame.landmarks.len() != Joint::COUNT {
                return Err(Error::DataShape(format!(
                    "Frame {} has {} landmarks, expected {}",
                    frame.index,
                    frame.landmarks.len(),
                    Joint::COUNT
                )));
            }

            for (landmark, joint) in frame.landmarks.iter().zip(Joint::ALL) {
                if landmark.joint != joint {
                    return Err(Error::DataShape(format!(
                        "Frame {} has {} where {} was expected",
                        frame.index, landmark.joint, joint
                    )));
                }
                for axis in Axis::ALL {
                    positions[channel_offset(joint, axis, frame_count) + f] = landmark.position[axis.index()];
                }
                visibility[joint.index() * frame_count + f] = landmark.visibility;
            }
        }

        Ok(Self {
            metadata,
            frame_count,
            positions,
            visibility,
        })
    }

    /// A sequence of the same shape with replaced channel data
    pub(crate) fn with_channels(&self, positions: Vec<f64>, visibility: Vec<f64>) -> Self {
        debug_assert_eq!(positions.len(), self.positions.len());
        debug_assert_eq!(visibility.len(), self.visibility.len());
        Self {
            metadata: self.metadata,
            frame_count: self.frame_count,
            positions,
            visibility,
        }
    }

    #[must_use]
    pub fn metadata(&self) -> &SequenceMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn frame_rate(&self) -> f64 {
        self.metadata.frame_rate
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    /// Index of the `f`-th frame; sequences are zero-based
    #[must_use]
    pub fn frame_index(&self, f: usize) -> usize {
        f
    }

    #[must_use]
    pub fn timestamp(&self, f: usize) -> f64 {
        self.frame_index(f) as f64 / self.metadata.frame_rate
    }

    /// One coordinate channel across all frames
    #[must_use]
    pub fn channel(&self, joint: Joint, axis: Axis) -> &[f64] {
        let start = channel_offset(joint, axis, self.frame_count);
        &self.positions[start..start + self.frame_count]
    }

    /// Visibility of a joint across all frames
    #[must_use]
    pub fn visibility_channel(&self, joint: Joint) -> &[f64] {
        let start = joint.index() * self.frame_count;
        &self.visibility[start..start + self.frame_count]
    }

    /// Channel values paired with the joint's visibility
    #[must_use]
    pub fn samples(&self, joint: Joint, axis: Axis) -> Vec<Sample> {
        self.channel(joint, axis)
            .iter()
            .zip(self.visibility_channel(joint))
            .map(|(&value, &confidence)| Sample { value, confidence })
            .collect()
    }

    /// Raw channel grid, `[joint][axis][frame]`
    #[must_use]
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Raw visibility grid, `[joint][frame]`
    #[must_use]
    pub fn visibilities(&self) -> &[f64] {
        &self.visibility
    }

    /// # Panics
    ///
    /// Panics if `f` is out of range
    #[must_use]
    pub fn position(&self, f: usize, joint: Joint) -> Vector3<f64> {
        assert!(f < self.frame_count, "Frame {f} out of range");
        let x = self.positions[channel_offset(joint, Axis::X, self.frame_count) + f];
        let y = self.positions[channel_offset(joint, Axis::Y, self.frame_count) + f];
        let z = self.positions[channel_offset(joint, Axis::Z, self.frame_count) + f];
        Vector3::new(x, y, z)
    }

    /// # Panics
    ///
    /// Panics if `f` is out of range
    #[must_use]
    pub fn visibility(&self, f: usize, joint: Joint) -> f64 {
        assert!(f < self.frame_count, "Frame {f} out of range");
        self.visibility[joint.index() * self.frame_count + f]
    }

    #[must_use]
    pub fn landmark(&self, f: usize, joint: Joint) -> Landmark {
        Landmark {
            joint,
            position: self.position(f, joint),
            visibility: self.visibility(f, joint),
        }
    }

    /// Reassemble the `f`-th frame
    #[must_use]
    pub fn frame(&self, f: usize) -> Option<Frame> {
        (f < self.frame_count).then(|| Frame {
            index: self.frame_index(f),
            timestamp: self.timestamp(f),
            landmarks: Joint::ALL.iter().map(|&joint| self.landmark(f, joint)).collect(),
        })
    }

    pub fn frames(&self) -> impl Iterator<Item = Frame> + '_ {
        (0..self.frame_count).filter_map(move |f| self.frame(f))
    }
}

/// Start of a channel in the `[joint][axis][frame]` grid
pub(crate) fn channel_offset(joint: Joint, axis: Axis, frame_count: usize) -> usize {
    (joint.index() * NUM_AXES + axis.index()) * frame_count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: usize, offset: f64) -> Frame {
        let landmarks = Joint::ALL
            .iter()
            .map(|&joint| {
                let base = joint.index() as f64;
                Landmark::new(joint, base + offset, base * 2.0 + offset, -base, 0.9)
            })
            .collect();
        Frame::new(index, 30.0, landmarks)
    }

    fn metadata() -> SequenceMetadata {
        SequenceMetadata::new(30.0, 1920, 1080)
    }

    #[test]
    fn test_build_and_read_back() {
        let frames = vec![frame(0, 0.0), frame(1, 0.5), frame(2, 1.0)];
        let sequence = PoseSequence::from_frames(metadata(), &frames).unwrap();

        assert_eq!(sequence.frame_count(), 3);
        assert_eq!(sequence.channel(Joint::LeftElbow, Axis::X), &[13.0, 13.5, 14.0]);
        assert_eq!(sequence.channel(Joint::LeftElbow, Axis::Z), &[-13.0, -13.0, -13.0]);
        assert_eq!(sequence.visibility_channel(Joint::Nose), &[0.9, 0.9, 0.9]);
        assert_eq!(sequence.frame(1).unwrap(), frames[1]);
        assert_eq!(sequence.frames().count(), 3);
        assert!((sequence.timestamp(2) - 2.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_sequence() {
        let sequence = PoseSequence::from_frames(metadata(), &[]).unwrap();
        assert!(sequence.is_empty());
        assert!(sequence.frame(0).is_none());
        assert!(sequence.channel(Joint::Nose, Axis::Y).is_empty());
    }

    #[test]
    fn test_rejects_cardinality_mismatch() {
        let mut bad = frame(1, 0.0);
        bad.landmarks.pop();
        let result = PoseSequence::from_frames(metadata(), &[frame(0, 0.0), bad]);
        assert!(matches!(result, Err(Error::DataShape(_))));
    }

    #[test]
    fn test_rejects_joint_order_mismatch() {
        let mut bad = frame(0, 0.0);
        bad.landmarks.swap(1, 2);
        let result = PoseSequence::from_frames(metadata(), &[bad]);
        assert!(matches!(result, Err(Error::DataShape(_))));
    }

    #[test]
    fn test_rejects_non_contiguous_indices() {
        let result = PoseSequence::from_frames(metadata(), &[frame(0, 0.0), frame(2, 0.0)]);
        assert!(matches!(result, Err(Error::DataShape(_))));

        let result = PoseSequence::from_frames(metadata(), &[frame(1, 0.0), frame(0, 0.0)]);
        assert!(matches!(result, Err(Error::DataShape(_))));
    }

    #[test]
    fn test_rejects_offset_first_index() {
        let result = PoseSequence::from_frames(metadata(), &[frame(5, 0.0), frame(6, 0.0)]);
        assert!(matches!(result, Err(Error::DataShape(_))));
    }

    #[test]
    fn test_rejects_bad_frame_rate() {
        let result = PoseSequence::from_frames(SequenceMetadata::new(0.0, 1, 1), &[frame(0, 0.0)]);
        assert!(matches!(result, Err(Error::DataShape(_))));
    }
}
