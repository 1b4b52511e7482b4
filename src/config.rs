//! Configuration management for smoothing and retargeting

use crate::{
    constants::{
        DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_DETECTION_THRESHOLD, DEFAULT_MAX_GAP, DEFAULT_MAX_STRETCH,
        DEFAULT_MEASUREMENT_NOISE, DEFAULT_MIN_STRETCH, DEFAULT_PROCESS_NOISE, DEFAULT_SAVGOL_POLYORDER,
        DEFAULT_SAVGOL_WINDOW,
    },
    filters::SmoothingMethod,
    rig::{RestBone, RigFamily, RigProfile, RigProfileTable},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};

/// Pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Smoothing configuration
    pub smoothing: SmoothingConfig,

    /// Rig selection configuration
    pub rig: RigConfig,

    /// Retargeting configuration
    pub retarget: RetargetConfig,
}

/// Smoothing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Smoothing method
    pub method: SmoothingMethod,

    /// Samples with lower confidence are treated as missing (0.0-1.0)
    pub confidence_threshold: f64,

    /// Longest gap, in frames, that is held rather than marked unreliable
    pub max_gap: usize,

    /// Kalman filter parameters
    pub kalman: KalmanConfig,

    /// Savitzky-Golay filter parameters
    pub savgol: SavgolConfig,
}

/// Kalman filter parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanConfig {
    /// Process noise variance
    pub process_noise: f64,

    /// Measurement noise variance at full confidence
    pub measurement_noise: f64,
}

/// Savitzky-Golay filter parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavgolConfig {
    /// Window length in frames (odd)
    pub window_length: usize,

    /// Polynomial order
    pub polyorder: usize,
}

/// Rig selection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// Rig family; detected from `skeleton_bones` when absent
    pub family: Option<RigFamily>,

    /// Custom joint name to bone name mapping; overrides `family` when non-empty
    pub custom_mapping: BTreeMap<String, String>,

    /// Root bone of the custom rig
    pub custom_root_bone: Option<String>,

    /// Rest pose of the custom rig, keyed by joint name
    pub custom_rest_pose: BTreeMap<String, RestBone>,

    /// Bone names of the target skeleton, used for family detection
    pub skeleton_bones: Vec<String>,

    /// Minimum fraction of a profile's bones that must be present (0.0-1.0)
    pub detection_threshold: f64,
}

/// Retargeting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetargetConfig {
    /// Rig units per detector unit
    pub world_scale: f64,

    /// Bones whose joints' minimum visibility is at or below this hold their previous value
    pub min_visibility: f64,

    /// Ground contact correction
    pub ground_contact: GroundContactConfig,

    /// Redundant keyframe elimination tolerance; disabled when absent
    pub keyframe_tolerance: Option<f64>,

    /// Stretchy rig scaling
    pub stretch: StretchConfig,
}

/// Ground contact correction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundContactConfig {
    /// Enable ground contact correction
    pub enabled: bool,

    /// Height of the ground plane in rig units
    pub plane_height: f64,

    /// Contact bone names; the profile's foot bones when empty
    pub bones: Vec<String>,
}

/// Stretchy rig scaling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StretchConfig {
    /// Scale bones by observed over rest length
    pub enabled: bool,

    /// Lower clamp for the length ratio
    pub min_scale: f64,

    /// Upper clamp for the length ratio
    pub max_scale: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            method: SmoothingMethod::Combined,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_gap: DEFAULT_MAX_GAP,
            kalman: KalmanConfig::default(),
            savgol: SavgolConfig::default(),
        }
    }
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            process_noise: DEFAULT_PROCESS_NOISE,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
        }
    }
}

impl Default for SavgolConfig {
    fn default() -> Self {
        Self {
            window_length: DEFAULT_SAVGOL_WINDOW,
            polyorder: DEFAULT_SAVGOL_POLYORDER,
        }
    }
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            family: None,
            custom_mapping: BTreeMap::new(),
            custom_root_bone: None,
            custom_rest_pose: BTreeMap::new(),
            skeleton_bones: Vec::new(),
            detection_threshold: DEFAULT_DETECTION_THRESHOLD,
        }
    }
}

impl Default for RetargetConfig {
    fn default() -> Self {
        Self {
            world_scale: 1.0,
            min_visibility: 0.0,
            ground_contact: GroundContactConfig::default(),
            keyframe_tolerance: None,
            stretch: StretchConfig::default(),
        }
    }
}

impl Default for GroundContactConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            plane_height: 0.0,
            bones: Vec::new(),
        }
    }
}

impl Default for StretchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_scale: DEFAULT_MIN_STRETCH,
            max_scale: DEFAULT_MAX_STRETCH,
        }
    }
}

impl SmoothingConfig {
    /// Validate smoothing parameters
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` describing the first invalid parameter
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::Configuration(
                "Confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(self.kalman.process_noise.is_finite() && self.kalman.process_noise > 0.0) {
            return Err(Error::Configuration("Kalman process noise must be positive".to_string()));
        }
        if !(self.kalman.measurement_noise.is_finite() && self.kalman.measurement_noise > 0.0) {
            return Err(Error::Configuration("Kalman measurement noise must be positive".to_string()));
        }
        if self.savgol.window_length % 2 == 0 {
            return Err(Error::Configuration(format!(
                "Savitzky-Golay window length must be odd, got {}",
                self.savgol.window_length
            )));
        }
        if self.savgol.window_length < self.savgol.polyorder + 2 {
            return Err(Error::Configuration(format!(
                "Savitzky-Golay window length {} must be at least polynomial order + 2 ({})",
                self.savgol.window_length,
                self.savgol.polyorder + 2
            )));
        }

        Ok(())
    }
}

impl RigConfig {
    /// Validate rig selection parameters
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the detection threshold is out of
    /// range or the custom family is selected without a custom mapping
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.detection_threshold) {
            return Err(Error::Configuration(
                "Detection threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.family == Some(RigFamily::Custom) && self.custom_mapping.is_empty() {
            return Err(Error::Configuration(
                "Rig family 'custom' requires a non-empty custom_mapping".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the rig profile this configuration selects.
    ///
    /// A non-empty custom mapping builds and registers a custom profile.
    /// Otherwise the configured family is used, or detected from
    /// `skeleton_bones`, falling back to the generic profile.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the custom profile is invalid or the
    /// selected family has no profile
    pub fn resolve_profile(&self, table: &mut RigProfileTable) -> Result<RigProfile> {
        self.validate()?;

        if !self.custom_mapping.is_empty() {
            let mut builder = RigProfile::builder("custom", RigFamily::Custom);
            if let Some(root) = &self.custom_root_bone {
                builder = builder.root_bone(root);
            }
            for (joint, bone) in &self.custom_mapping {
                builder = builder.map_named(joint, bone);
            }
            for (joint, rest) in &self.custom_rest_pose {
                builder = builder.rest_bone_named(joint, *rest);
            }
            let profile = builder.build()?;
            table.register(profile.clone());
            return Ok(profile);
        }

        let family = match self.family {
            Some(family) => family,
            None if !self.skeleton_bones.is_empty() => table.detect_family(&self.skeleton_bones, self.detection_threshold),
            None => RigFamily::Generic,
        };

        table
            .get(family)
            .cloned()
            .ok_or_else(|| Error::Configuration(format!("No rig profile registered for family '{family}'")))
    }
}

impl RetargetConfig {
    /// Validate retargeting parameters
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` describing the first invalid parameter
    pub fn validate(&self) -> Result<()> {
        if !(self.world_scale.is_finite() && self.world_scale > 0.0) {
            return Err(Error::Configuration("World scale must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.min_visibility) {
            return Err(Error::Configuration(
                "Minimum visibility must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !self.ground_contact.plane_height.is_finite() {
            return Err(Error::Configuration("Ground plane height must be finite".to_string()));
        }
        if let Some(tolerance) = self.keyframe_tolerance {
            if !(tolerance.is_finite() && tolerance >= 0.0) {
                return Err(Error::Configuration(
                    "Keyframe tolerance must be non-negative".to_string(),
                ));
            }
        }
        if !(self.stretch.min_scale.is_finite() && self.stretch.min_scale > 0.0) {
            return Err(Error::Configuration("Minimum stretch scale must be positive".to_string()));
        }
        if !(self.stretch.max_scale.is_finite() && self.stretch.max_scale >= self.stretch.min_scale) {
            return Err(Error::Configuration(
                "Maximum stretch scale must not be below the minimum".to_string(),
            ));
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read or `Error::Configuration` if it cannot be parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::Configuration(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if serialization fails or `Error::Io` if the file cannot be written
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` describing the first invalid parameter
    pub fn validate(&self) -> Result<()> {
        self.smoothing.validate()?;
        self.rig.validate()?;
        self.retarget.validate()
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Motion retargeting configuration

# Landmark smoothing
smoothing:
  method: "combined"          # none, kalman, savgol, combined
  confidence_threshold: 0.5
  max_gap: 10
  kalman:
    process_noise: 0.001
    measurement_noise: 0.1
  savgol:
    window_length: 5
    polyorder: 3

# Target rig
rig:
  family: "mixamo"            # mixamo, rigify, ue4, generic, custom
  custom_mapping: {}
  custom_root_bone: null
  custom_rest_pose: {}
  skeleton_bones: []
  detection_threshold: 0.5

# Retargeting
retarget:
  world_scale: 1.0
  min_visibility: 0.0
  ground_contact:
    enabled: true
    plane_height: 0.0
    bones: []
  keyframe_tolerance: 0.0001
  stretch:
    enabled: false
    min_scale: 0.5
    max_scale: 2.0
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config.smoothing.method, SmoothingMethod::Combined);
        assert_eq!(config.rig.family, Some(RigFamily::Mixamo));
        assert!(config.retarget.ground_contact.enabled);
        assert_eq!(config.retarget.keyframe_tolerance, Some(0.0001));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("smoothing:\n  method: kalman\n").unwrap();
        assert_eq!(config.smoothing.method, SmoothingMethod::Kalman);
        assert_eq!(config.smoothing.max_gap, DEFAULT_MAX_GAP);
        assert_eq!(config.retarget, RetargetConfig::default());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.smoothing.savgol.window_length = 3;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let mut config = Config::default();
        config.smoothing.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retarget.stretch.min_scale = 3.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retarget.keyframe_tolerance = Some(-1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_profile() {
        let mut table = RigProfileTable::with_builtin();

        let rig = RigConfig {
            family: Some(RigFamily::Ue4),
            ..RigConfig::default()
        };
        assert_eq!(rig.resolve_profile(&mut table).unwrap().family(), RigFamily::Ue4);

        let rig = RigConfig {
            skeleton_bones: ["pelvis", "thigh_l", "calf_l", "foot_l", "upperarm_l", "lowerarm_l", "hand_l", "neck_01"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..RigConfig::default()
        };
        assert_eq!(rig.resolve_profile(&mut table).unwrap().family(), RigFamily::Ue4);

        assert_eq!(
            RigConfig::default().resolve_profile(&mut table).unwrap().family(),
            RigFamily::Generic
        );
    }

    #[test]
    fn test_resolve_custom_profile() {
        let mut table = RigProfileTable::with_builtin();
        let mut rig = RigConfig::default();
        rig.custom_mapping.insert("LEFT_ELBOW".to_string(), "forearm".to_string());
        rig.custom_mapping.insert("LEFT_KNEE".to_string(), "forearm".to_string());
        assert!(matches!(rig.resolve_profile(&mut table), Err(Error::Configuration(_))));

        rig.custom_mapping.insert("LEFT_KNEE".to_string(), "shin".to_string());
        let profile = rig.resolve_profile(&mut table).unwrap();
        assert_eq!(profile.family(), RigFamily::Custom);
        assert!(table.get(RigFamily::Custom).is_some());

        rig.family = Some(RigFamily::Custom);
        assert_eq!(rig.resolve_profile(&mut table).unwrap().family(), RigFamily::Custom);
    }

    #[test]
    fn test_custom_family_requires_mapping() {
        let rig = RigConfig {
            family: Some(RigFamily::Custom),
            ..RigConfig::default()
        };
        assert!(matches!(rig.validate(), Err(Error::Configuration(_))));
    }
}
