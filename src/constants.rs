//! Constants used throughout the library

/// Number of canonical body landmarks per frame
pub const NUM_LANDMARKS: usize = 33;

/// Coordinate axes per landmark
pub const NUM_AXES: usize = 3;

/// Default frames per second assumption
pub const DEFAULT_FPS: f64 = 30.0;

/// Pose document format version written by `PoseSequence::to_document`
pub const DOCUMENT_FORMAT_VERSION: &str = "1.0";

/// Samples below this confidence are treated as missing
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Longest run of missing samples that is held rather than marked unreliable
pub const DEFAULT_MAX_GAP: usize = 10;

/// Default Kalman parameters, tuned for human motion
pub const DEFAULT_PROCESS_NOISE: f64 = 1e-3;
pub const DEFAULT_MEASUREMENT_NOISE: f64 = 1e-1;

/// Floor for per-sample confidence when scaling measurement noise
pub const MIN_MEASUREMENT_CONFIDENCE: f64 = 1e-3;

/// Default Savitzky-Golay parameters (cubic over five frames)
pub const DEFAULT_SAVGOL_WINDOW: usize = 5;
pub const DEFAULT_SAVGOL_POLYORDER: usize = 3;

/// Minimum fraction of a profile's bones that must be present for detection
pub const DEFAULT_DETECTION_THRESHOLD: f64 = 0.5;

/// Default clamp range for stretchy-rig scaling
pub const DEFAULT_MIN_STRETCH: f64 = 0.5;
pub const DEFAULT_MAX_STRETCH: f64 = 2.0;

/// Canonical T-pose bone lengths in rig units
pub const REST_UPPER_ARM_LENGTH: f64 = 0.28;
pub const REST_FOREARM_LENGTH: f64 = 0.26;
pub const REST_HAND_LENGTH: f64 = 0.08;
pub const REST_THIGH_LENGTH: f64 = 0.45;
pub const REST_SHIN_LENGTH: f64 = 0.42;
pub const REST_FOOT_LENGTH: f64 = 0.15;
pub const REST_NECK_LENGTH: f64 = 0.25;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
