//! Error types for the motion retargeting library.

use crate::landmark::{Axis, Joint};
use std::fmt;
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid rig profile, filter parameters or other configuration.
    /// Always raised before any processing starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Frame cardinality mismatch, joint order mismatch or non-contiguous frame indices
    #[error("Data shape error: {0}")]
    DataShape(String),

    /// A filter that requires a dense channel was given missing samples
    #[error("Data gap error: {0}")]
    DataGap(String),

    /// Numerical failure inside a channel filter
    #[error("Filter error: {0}")]
    FilterError(String),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON document could not be read or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal conditions reported next to a successful result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The channel never met the confidence threshold; every output
    /// landmark of the joint carries zero visibility.
    UnreliableChannel { joint: Joint, axis: Axis },

    /// The profile maps a joint that owns no segment in the canonical
    /// topology, so the bone is left out of the animation.
    SkippedBone { joint: Joint, bone: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnreliableChannel { joint, axis } => {
                write!(f, "channel {joint}.{axis} never met the confidence threshold")
            }
            Self::SkippedBone { joint, bone } => {
                write!(f, "bone '{bone}' skipped: {joint} has no segment in the canonical topology")
            }
        }
    }
}
