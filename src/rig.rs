//! Rig profiles: canonical joint to target bone mappings.
//!
//! A [`RigProfile`] is an immutable value validated once by
//! [`RigProfileBuilder::build`]; a profile that exists is always one-to-one
//! and keyed by canonical joints only. [`RigProfileTable`] holds the built-in
//! families plus any caller-registered profile.

use crate::{
    constants::{
        EPSILON, REST_FOOT_LENGTH, REST_FOREARM_LENGTH, REST_HAND_LENGTH, REST_NECK_LENGTH, REST_SHIN_LENGTH,
        REST_THIGH_LENGTH, REST_UPPER_ARM_LENGTH,
    },
    landmark::Joint,
    Error, Result,
};
use log::debug;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    str::FromStr,
};

/// Named bone naming convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RigFamily {
    Mixamo,
    Rigify,
    Ue4,
    Generic,
    Custom,
}

impl RigFamily {
    /// Families with a built-in profile
    pub const BUILT_IN: [RigFamily; 4] = [Self::Mixamo, Self::Rigify, Self::Ue4, Self::Generic];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mixamo => "mixamo",
            Self::Rigify => "rigify",
            Self::Ue4 => "ue4",
            Self::Generic => "generic",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for RigFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RigFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mixamo" => Ok(Self::Mixamo),
            "rigify" => Ok(Self::Rigify),
            "ue4" | "unreal" => Ok(Self::Ue4),
            "generic" => Ok(Self::Generic),
            "custom" => Ok(Self::Custom),
            _ => Err(Error::Configuration(format!("Unknown rig family: {s}"))),
        }
    }
}

/// Bind-pose reference of one bone, in rig space (x right, y up, z forward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RestBone {
    /// Direction from the bone's head to its tail
    pub direction: Vector3<f64>,
    /// Bone length in rig units
    pub length: f64,
}

impl RestBone {
    #[must_use]
    pub fn new(direction: Vector3<f64>, length: f64) -> Self {
        Self { direction, length }
    }

    /// Canonical T-pose reference for the segment a joint drives.
    ///
    /// The subject faces the camera, so the character's left is image right.
    #[must_use]
    pub fn t_pose(joint: Joint) -> Self {
        use Joint::*;

        let left = Vector3::x();
        let right = -Vector3::x();
        let up = Vector3::y();
        let down = -Vector3::y();
        let forward = Vector3::z();

        match joint {
            Nose => Self::new(up, REST_NECK_LENGTH),
            LeftShoulder => Self::new(left, REST_UPPER_ARM_LENGTH),
            LeftElbow => Self::new(left, REST_FOREARM_LENGTH),
            LeftWrist => Self::new(left, REST_HAND_LENGTH),
            RightShoulder => Self::new(right, REST_UPPER_ARM_LENGTH),
            RightElbow => Self::new(right, REST_FOREARM_LENGTH),
            RightWrist => Self::new(right, REST_HAND_LENGTH),
            LeftHip | RightHip => Self::new(down, REST_THIGH_LENGTH),
            LeftKnee | RightKnee => Self::new(down, REST_SHIN_LENGTH),
            LeftAnkle | RightAnkle => Self::new(forward, REST_FOOT_LENGTH),
            _ => Self::new(up, 1.0),
        }
    }

    /// Rest axis of the root bone: right hip towards left hip
    #[must_use]
    pub fn root() -> Self {
        Self::new(Vector3::x(), 1.0)
    }

    fn validate(&self, joint: Joint) -> Result<()> {
        let finite = self.direction.iter().all(|c| c.is_finite()) && self.length.is_finite();
        if !finite || self.direction.norm() < EPSILON || self.length <= 0.0 {
            return Err(Error::Configuration(format!(
                "Rest pose for {joint} needs a non-zero direction and a positive length"
            )));
        }
        Ok(())
    }
}

/// Validated mapping from canonical joints to target bones
#[derive(Debug, Clone, PartialEq)]
pub struct RigProfile {
    name: String,
    family: RigFamily,
    root_bone: Option<String>,
    mapping: BTreeMap<Joint, String>,
    rest_pose: BTreeMap<Joint, RestBone>,
}

impl RigProfile {
    /// Start building a profile
    #[must_use]
    pub fn builder(name: &str, family: RigFamily) -> RigProfileBuilder {
        RigProfileBuilder {
            name: name.to_string(),
            family,
            root_bone: None,
            entries: Vec::new(),
            rest_entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn family(&self) -> RigFamily {
        self.family
    }

    /// Bone that receives the hip translation
    #[must_use]
    pub fn root_bone(&self) -> Option<&str> {
        self.root_bone.as_deref()
    }

    #[must_use]
    pub fn mapping(&self) -> &BTreeMap<Joint, String> {
        &self.mapping
    }

    #[must_use]
    pub fn bone_for(&self, joint: Joint) -> Option<&str> {
        self.mapping.get(&joint).map(String::as_str)
    }

    /// Whether the profile carries its own rest pose data
    #[must_use]
    pub fn has_rest_pose(&self) -> bool {
        !self.rest_pose.is_empty()
    }

    /// Rest reference of a joint's bone, falling back to the canonical T-pose
    #[must_use]
    pub fn rest_bone(&self, joint: Joint) -> RestBone {
        self.rest_pose
            .get(&joint)
            .map_or_else(|| RestBone::t_pose(joint), |rest| RestBone::new(rest.direction.normalize(), rest.length))
    }

    /// Every target bone name, root included
    pub fn target_bones(&self) -> impl Iterator<Item = &str> {
        self.root_bone.as_deref().into_iter().chain(self.mapping.values().map(String::as_str))
    }

    /// Default contact bones: the bones driven by the ankles
    #[must_use]
    pub fn foot_bones(&self) -> Vec<String> {
        [Joint::LeftAnkle, Joint::RightAnkle]
            .iter()
            .filter_map(|&joint| self.bone_for(joint).map(str::to_string))
            .collect()
    }
}

/// Builder that performs every profile check at construction time
#[derive(Debug, Clone)]
pub struct RigProfileBuilder {
    name: String,
    family: RigFamily,
    root_bone: Option<String>,
    entries: Vec<(String, String)>,
    rest_entries: Vec<(String, RestBone)>,
}

impl RigProfileBuilder {
    #[must_use]
    pub fn root_bone(mut self, bone: &str) -> Self {
        self.root_bone = Some(bone.to_string());
        self
    }

    /// Map a canonical joint to a target bone
    #[must_use]
    pub fn map(mut self, joint: Joint, bone: &str) -> Self {
        self.entries.push((joint.name().to_string(), bone.to_string()));
        self
    }

    /// Map a joint given by name; the name is checked in [`Self::build`]
    #[must_use]
    pub fn map_named(mut self, joint: &str, bone: &str) -> Self {
        self.entries.push((joint.to_string(), bone.to_string()));
        self
    }

    #[must_use]
    pub fn rest_bone(mut self, joint: Joint, rest: RestBone) -> Self {
        self.rest_entries.push((joint.name().to_string(), rest));
        self
    }

    #[must_use]
    pub fn rest_bone_named(mut self, joint: &str, rest: RestBone) -> Self {
        self.rest_entries.push((joint.to_string(), rest));
        self
    }

    /// Validate and freeze the profile
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if a key is not a canonical joint, a
    /// joint is mapped twice, a bone name is empty, two entries (root
    /// included) target the same bone, or a rest pose entry is degenerate
    pub fn build(self) -> Result<RigProfile> {
        let mut mapping = BTreeMap::new();
        let mut sources: HashMap<&str, String> = HashMap::new();

        if let Some(root) = &self.root_bone {
            if root.trim().is_empty() {
                return Err(Error::Configuration("Root bone name must not be empty".to_string()));
            }
            sources.insert(root.as_str(), "root".to_string());
        }

        for (key, bone) in &self.entries {
            let joint: Joint = key.parse()?;
            if bone.trim().is_empty() {
                return Err(Error::Configuration(format!("Bone name for {joint} must not be empty")));
            }
            if mapping.contains_key(&joint) {
                return Err(Error::Configuration(format!("{joint} is mapped more than once")));
            }
            if let Some(previous) = sources.insert(bone.as_str(), joint.name().to_string()) {
                return Err(Error::Configuration(format!(
                    "Bone '{bone}' is mapped from both {previous} and {joint}; mappings must be one-to-one"
                )));
            }
            mapping.insert(joint, bone.clone());
        }

        let mut rest_pose = BTreeMap::new();
        for (key, rest) in &self.rest_entries {
            let joint: Joint = key.parse()?;
            rest.validate(joint)?;
            rest_pose.insert(joint, *rest);
        }

        Ok(RigProfile {
            name: self.name,
            family: self.family,
            root_bone: self.root_bone,
            mapping,
            rest_pose,
        })
    }
}

/// Registry of rig profiles by family
#[derive(Debug, Clone, Default)]
pub struct RigProfileTable {
    profiles: BTreeMap<RigFamily, RigProfile>,
}

impl RigProfileTable {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding every built-in family
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut table = Self::new();
        for family in RigFamily::BUILT_IN {
            if let Some(profile) = builtin_profile(family) {
                table.register(profile);
            }
        }
        table
    }

    /// Register a profile, replacing any profile of the same family
    pub fn register(&mut self, profile: RigProfile) {
        debug!("Registering {} rig profile '{}'", profile.family(), profile.name());
        self.profiles.insert(profile.family(), profile);
    }

    /// Build and register a custom profile from a joint-name mapping
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the mapping is invalid; the table is left unchanged
    pub fn register_custom<'a, I>(&mut self, name: &str, root_bone: Option<&str>, mapping: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut builder = RigProfile::builder(name, RigFamily::Custom);
        if let Some(root) = root_bone {
            builder = builder.root_bone(root);
        }
        for (joint, bone) in mapping {
            builder = builder.map_named(joint, bone);
        }
        self.register(builder.build()?);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, family: RigFamily) -> Option<&RigProfile> {
        self.profiles.get(&family)
    }

    pub fn families(&self) -> impl Iterator<Item = RigFamily> + '_ {
        self.profiles.keys().copied()
    }

    /// Fraction of a profile's target bones present in a skeleton
    #[must_use]
    pub fn score(&self, family: RigFamily, bone_names: &[String]) -> f64 {
        let Some(profile) = self.get(family) else {
            return 0.0;
        };

        let present: HashSet<&str> = bone_names.iter().map(|name| strip_namespace(name)).collect();
        let (total, hits) = profile
            .target_bones()
            .fold((0usize, 0usize), |(total, hits), bone| (total + 1, hits + usize::from(present.contains(bone))));

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Guess the rig family of a skeleton from its bone names.
    ///
    /// Returns the best-scoring registered family whose score reaches
    /// `threshold`, else [`RigFamily::Generic`].
    #[must_use]
    pub fn detect_family(&self, bone_names: &[String], threshold: f64) -> RigFamily {
        let best = self
            .families()
            .map(|family| (family, self.score(family, bone_names)))
            .fold(None::<(RigFamily, f64)>, |best, (family, score)| match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((family, score)),
            });

        match best {
            Some((family, score)) if score >= threshold && score > 0.0 => {
                debug!("Detected {family} rig (score {score:.2})");
                family
            }
            _ => RigFamily::Generic,
        }
    }
}

/// `mixamorig:Hips` -> `Hips`
fn strip_namespace(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, bone)| bone)
}

/// Built-in profile for a family
#[must_use]
pub fn builtin_profile(family: RigFamily) -> Option<RigProfile> {
    use Joint::*;

    let (root, bones): (&str, [(Joint, &str); 13]) = match family {
        RigFamily::Mixamo => (
            "Hips",
            [
                (Nose, "Neck"),
                (LeftShoulder, "LeftArm"),
                (LeftElbow, "LeftForeArm"),
                (LeftWrist, "LeftHand"),
                (RightShoulder, "RightArm"),
                (RightElbow, "RightForeArm"),
                (RightWrist, "RightHand"),
                (LeftHip, "LeftUpLeg"),
                (LeftKnee, "LeftLeg"),
                (LeftAnkle, "LeftFoot"),
                (RightHip, "RightUpLeg"),
                (RightKnee, "RightLeg"),
                (RightAnkle, "RightFoot"),
            ],
        ),
        RigFamily::Rigify => (
            "spine",
            [
                (Nose, "neck"),
                (LeftShoulder, "upper_arm.L"),
                (LeftElbow, "forearm.L"),
                (LeftWrist, "hand.L"),
                (RightShoulder, "upper_arm.R"),
                (RightElbow, "forearm.R"),
                (RightWrist, "hand.R"),
                (LeftHip, "thigh.L"),
                (LeftKnee, "shin.L"),
                (LeftAnkle, "foot.L"),
                (RightHip, "thigh.R"),
                (RightKnee, "shin.R"),
                (RightAnkle, "foot.R"),
            ],
        ),
        RigFamily::Ue4 => (
            "pelvis",
            [
                (Nose, "neck_01"),
                (LeftShoulder, "upperarm_l"),
                (LeftElbow, "lowerarm_l"),
                (LeftWrist, "hand_l"),
                (RightShoulder, "upperarm_r"),
                (RightElbow, "lowerarm_r"),
                (RightWrist, "hand_r"),
                (LeftHip, "thigh_l"),
                (LeftKnee, "calf_l"),
                (LeftAnkle, "foot_l"),
                (RightHip, "thigh_r"),
                (RightKnee, "calf_r"),
                (RightAnkle, "foot_r"),
            ],
        ),
        RigFamily::Generic => (
            "Hips",
            [
                (Nose, "Neck"),
                (LeftShoulder, "Left_Upper_Arm"),
                (LeftElbow, "Left_Lower_Arm"),
                (LeftWrist, "Left_Hand"),
                (RightShoulder, "Right_Upper_Arm"),
                (RightElbow, "Right_Lower_Arm"),
                (RightWrist, "Right_Hand"),
                (LeftHip, "Left_Upper_Leg"),
                (LeftKnee, "Left_Lower_Leg"),
                (LeftAnkle, "Left_Foot"),
                (RightHip, "Right_Upper_Leg"),
                (RightKnee, "Right_Lower_Leg"),
                (RightAnkle, "Right_Foot"),
            ],
        ),
        RigFamily::Custom => return None,
    };

    let builder = bones
        .iter()
        .fold(RigProfile::builder(family.name(), family).root_bone(root), |builder, &(joint, bone)| {
            builder.map(joint, bone)
        });

    builder.build().ok()
}
