//! Summary statistics of a pose sequence.
//!
//! Used to judge detection quality before and after smoothing.

use crate::{
    landmark::{Axis, Joint},
    sequence::PoseSequence,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Statistical summary of one series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    /// Mean value of the data
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Range (max - min) of the data
    pub range: f64,
}

impl Statistics {
    /// Summarize a series; `None` when it is empty
    #[must_use]
    pub fn of(data: &[f64]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }

        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        let min = data.iter().copied().fold(f64::INFINITY, f64::min);
        let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
            range: max - min,
        })
    }
}

/// Per-joint detection quality and motion summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointStats {
    pub visibility: Statistics,
    /// Fraction of frames at or above the confidence threshold
    pub detection_rate: f64,
    pub x: Statistics,
    pub y: Statistics,
    pub z: Statistics,
    /// Distance travelled between consecutive frames
    pub path_length: f64,
}

/// Sequence-level summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceStats {
    pub total_frames: usize,
    /// Seconds
    pub duration: f64,
    pub joints: BTreeMap<Joint, JointStats>,
}

impl SequenceStats {
    /// Summarize a sequence; joints are omitted when it is empty
    #[must_use]
    pub fn compute(sequence: &PoseSequence, confidence_threshold: f64) -> Self {
        let total_frames = sequence.frame_count();
        let joints = Joint::ALL
            .iter()
            .filter_map(|&joint| joint_stats(sequence, joint, confidence_threshold).map(|stats| (joint, stats)))
            .collect();

        Self {
            total_frames,
            duration: total_frames as f64 / sequence.frame_rate(),
            joints,
        }
    }

    /// Mean detection rate over all joints
    #[must_use]
    pub fn mean_detection_rate(&self) -> f64 {
        if self.joints.is_empty() {
            return 0.0;
        }
        self.joints.values().map(|stats| stats.detection_rate).sum::<f64>() / self.joints.len() as f64
    }
}

fn joint_stats(sequence: &PoseSequence, joint: Joint, threshold: f64) -> Option<JointStats> {
    let visibility = sequence.visibility_channel(joint);
    let detected = visibility.iter().filter(|&&v| v >= threshold).count();

    let path_length = (1..sequence.frame_count())
        .map(|f| (sequence.position(f, joint) - sequence.position(f - 1, joint)).norm())
        .sum();

    Some(JointStats {
        visibility: Statistics::of(visibility)?,
        detection_rate: detected as f64 / visibility.len() as f64,
        x: Statistics::of(sequence.channel(joint, Axis::X))?,
        y: Statistics::of(sequence.channel(joint, Axis::Y))?,
        z: Statistics::of(sequence.channel(joint, Axis::Z))?,
        path_length,
    })
}
