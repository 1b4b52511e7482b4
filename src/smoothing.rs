//! Smoothing orchestrator: runs the selected channel filter over every
//! `(joint, axis)` channel of a pose sequence and reassembles the result.

use crate::{
    config::SmoothingConfig,
    filters::{create_filter, ChannelFilter, ChannelOutput},
    landmark::{Axis, Joint},
    sequence::PoseSequence,
    Error, Result, Warning,
};
use log::{debug, info, warn};
use rayon::prelude::*;

/// Smoothed copy of a sequence plus the channels that could not be trusted
#[derive(Debug, Clone)]
pub struct SmoothedSequence {
    pub sequence: PoseSequence,
    pub warnings: Vec<Warning>,
}

/// Applies one smoothing configuration to whole pose sequences
pub struct PoseSmoother {
    config: SmoothingConfig,
    filter: Box<dyn ChannelFilter>,
}

impl PoseSmoother {
    /// Create a smoother for a configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the filter parameters are invalid
    pub fn new(config: SmoothingConfig) -> Result<Self> {
        let filter = create_filter(&config)?;
        Ok(Self { config, filter })
    }

    #[must_use]
    pub fn config(&self) -> &SmoothingConfig {
        &self.config
    }

    /// Name of the channel filter in use
    #[must_use]
    pub fn filter_name(&self) -> &str {
        self.filter.name()
    }

    /// Smooth every channel of `sequence` into a new sequence of identical shape.
    ///
    /// Visibility passes through unchanged, except that a joint gets zero
    /// visibility on every frame where any of its channels is unreliable.
    ///
    /// # Errors
    ///
    /// Returns `Error::DataGap` if the Savitzky-Golay filter alone is given a
    /// channel with missing samples, or `Error::FilterError` on numerical failure
    pub fn smooth(&self, sequence: &PoseSequence) -> Result<SmoothedSequence> {
        info!(
            "Smoothing {} frames with {} (threshold {}, max gap {})",
            sequence.frame_count(),
            self.filter.name(),
            self.config.confidence_threshold,
            self.config.max_gap
        );

        if sequence.is_empty() {
            return Ok(SmoothedSequence {
                sequence: sequence.clone(),
                warnings: Vec::new(),
            });
        }

        // Grid order: joint-major, then axis
        let channels: Vec<(Joint, Axis)> = Joint::ALL
            .iter()
            .flat_map(|&joint| Axis::ALL.iter().map(move |&axis| (joint, axis)))
            .collect();

        let outputs = channels
            .par_iter()
            .map(|&(joint, axis)| {
                self.filter
                    .apply(&sequence.samples(joint, axis))
                    .map_err(|e| with_channel_context(e, joint, axis))
            })
            .collect::<Result<Vec<ChannelOutput>>>()?;

        let frame_count = sequence.frame_count();
        let mut positions = Vec::with_capacity(sequence.positions().len());
        let mut visibility = sequence.visibilities().to_vec();
        let mut warnings = Vec::new();

        for (&(joint, axis), output) in channels.iter().zip(&outputs) {
            if output.values.len() != frame_count {
                return Err(Error::FilterError(format!(
                    "{} returned {} values for {joint}.{axis}, expected {frame_count}",
                    self.filter.name(),
                    output.values.len()
                )));
            }
            positions.extend_from_slice(&output.values);

            let start = joint.index() * frame_count;
            for (f, &unreliable) in output.unreliable.iter().enumerate() {
                if unreliable {
                    visibility[start + f] = 0.0;
                }
            }

            if output.is_unreliable() {
                let warning = Warning::UnreliableChannel { joint, axis };
                warn!("{warning}");
                warnings.push(warning);
            } else {
                let flagged = output.unreliable.iter().filter(|&&u| u).count();
                if flagged > 0 {
                    debug!("{joint}.{axis}: {flagged} frames beyond the gap limit");
                }
            }
        }

        Ok(SmoothedSequence {
            sequence: sequence.with_channels(positions, visibility),
            warnings,
        })
    }
}

fn with_channel_context(error: Error, joint: Joint, axis: Axis) -> Error {
    match error {
        Error::DataGap(msg) => Error::DataGap(format!("{joint}.{axis}: {msg}")),
        Error::FilterError(msg) => Error::FilterError(format!("{joint}.{axis}: {msg}")),
        other => other,
    }
}
