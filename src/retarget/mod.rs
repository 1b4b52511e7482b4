//! Retargeting engine: smoothed landmarks plus a rig profile in, bone
//! transform animation out.
//!
//! Every mapped bone is an independent track. Tracks are solved in
//! parallel, each as a left-to-right scan over the frames, then the
//! whole-animation passes (ground contact, keyframe reduction) run and the
//! tracks are transposed into output frames.

mod passes;
mod solver;

/// Animation output types
pub mod transform;

pub use solver::{shortest_arc, to_rig_space};
pub use transform::{BoneTransform, BoneTransformFrame, BoneTransformSequence};

use crate::{config::RetargetConfig, rig::RigProfile, sequence::PoseSequence, Result, Warning};
use log::{debug, info, warn};
use passes::Track;
use rayon::prelude::*;
use solver::{BoneTrack, TrackSource};
use std::collections::BTreeMap;

/// Animation plus the bones that had to be left out
#[derive(Debug, Clone)]
pub struct RetargetOutput {
    pub animation: BoneTransformSequence,
    pub warnings: Vec<Warning>,
}

/// Converts pose sequences into bone animation for one rig profile
#[derive(Debug, Clone)]
pub struct Retargeter {
    profile: RigProfile,
    config: RetargetConfig,
    tracks: Vec<BoneTrack>,
    warnings: Vec<Warning>,
}

impl Retargeter {
    /// Create a retargeter, planning one track per bone the profile can drive
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the retargeting parameters are invalid
    pub fn new(profile: &RigProfile, config: RetargetConfig) -> Result<Self> {
        config.validate()?;

        let mut tracks = Vec::with_capacity(profile.mapping().len() + 1);
        let mut warnings = Vec::new();

        if let Some(root) = profile.root_bone() {
            tracks.push(BoneTrack::root(root));
        }

        for (&joint, bone) in profile.mapping() {
            match joint.segment() {
                Some(segment) => tracks.push(BoneTrack::segment(bone, segment, profile.rest_bone(joint))),
                None => {
                    let warning = Warning::SkippedBone {
                        joint,
                        bone: bone.clone(),
                    };
                    warn!("{warning}");
                    warnings.push(warning);
                }
            }
        }

        Ok(Self {
            profile: profile.clone(),
            config,
            tracks,
            warnings,
        })
    }

    #[must_use]
    pub fn profile(&self) -> &RigProfile {
        &self.profile
    }

    #[must_use]
    pub fn config(&self) -> &RetargetConfig {
        &self.config
    }

    /// Bones that will appear in the output
    pub fn bones(&self) -> impl Iterator<Item = &str> {
        self.tracks.iter().map(|track| track.bone.as_str())
    }

    /// Retarget a sequence; an empty sequence gives an empty animation
    #[must_use]
    pub fn retarget(&self, sequence: &PoseSequence) -> RetargetOutput {
        info!(
            "Retargeting {} frames onto '{}' ({} bones)",
            sequence.frame_count(),
            self.profile.name(),
            self.tracks.len()
        );

        let mut solved: Vec<Track> = self
            .tracks
            .par_iter()
            .map(|track| track.solve(sequence, &self.config))
            .collect();

        if self.config.ground_contact.enabled && !sequence.is_empty() {
            self.ground_contact(&mut solved);
        }

        let keys: Vec<Vec<Option<BoneTransform>>> = match self.config.keyframe_tolerance {
            Some(tolerance) => solved
                .par_iter()
                .map(|track| passes::reduce_keyframes(track, tolerance))
                .collect(),
            None => solved
                .into_iter()
                .map(|track| track.into_iter().map(Some).collect())
                .collect(),
        };

        let frames = (0..sequence.frame_count())
            .map(|f| {
                let bones: BTreeMap<String, BoneTransform> = self
                    .tracks
                    .iter()
                    .zip(&keys)
                    .filter_map(|(track, keys)| keys[f].map(|key| (track.bone.clone(), key)))
                    .collect();
                BoneTransformFrame {
                    frame_index: sequence.frame_index(f),
                    timestamp: sequence.timestamp(f),
                    bones,
                }
            })
            .collect();

        let animation = BoneTransformSequence {
            rig: self.profile.name().to_string(),
            frame_rate: sequence.frame_rate(),
            frames,
        };
        debug!("Emitted {} bone keys", animation.key_count());

        RetargetOutput {
            animation,
            warnings: self.warnings.clone(),
        }
    }

    fn ground_contact(&self, solved: &mut [Track]) {
        let has_root = matches!(self.tracks.first().map(|t| &t.source), Some(TrackSource::Root));
        if !has_root {
            warn!("Ground contact needs a root bone; '{}' has none", self.profile.name());
            return;
        }

        let contact_bones = if self.config.ground_contact.bones.is_empty() {
            self.profile.foot_bones()
        } else {
            self.config.ground_contact.bones.clone()
        };

        // Indices into the non-root tracks
        let contacts: Vec<usize> = contact_bones
            .iter()
            .filter_map(|bone| {
                let index = self.tracks[1..].iter().position(|track| &track.bone == bone);
                if index.is_none() {
                    debug!("Contact bone '{bone}' is not driven by this profile");
                }
                index
            })
            .collect();

        if contacts.is_empty() {
            warn!("No contact bones available for ground contact");
            return;
        }

        if let Some((root, rest)) = solved.split_first_mut() {
            let mut others: Vec<&mut Track> = rest.iter_mut().collect();
            passes::apply_ground_contact(
                root,
                &mut others,
                &contacts,
                self.config.ground_contact.plane_height,
                self.config.min_visibility,
            );
        }
    }
}
