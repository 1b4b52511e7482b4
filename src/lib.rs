//! Motion retargeting library: smoothed landmark tracks to rig animation.
//!
//! This library turns per-frame body landmarks from a pose detector into
//! bone transform animation for an arbitrary character rig:
//! - Per-channel Kalman and Savitzky-Golay smoothing with gap handling
//! - Rig profiles for common bone naming conventions, plus custom mappings
//! - Direction-based retargeting with ground contact and keyframe reduction
//!
//! The pipeline consists of:
//! 1. Building a [`sequence::PoseSequence`] from detector frames or a pose document
//! 2. Smoothing every `(joint, axis)` channel with [`smoothing::PoseSmoother`]
//! 3. Selecting a [`rig::RigProfile`] from the [`rig::RigProfileTable`]
//! 4. Retargeting with [`retarget::Retargeter`]
//!
//! # Examples
//!
//! ```no_run
//! use motion_retarget::{
//!     config::Config,
//!     document::{load_pose_sequence, write_json},
//!     retarget::Retargeter,
//!     rig::RigProfileTable,
//!     smoothing::PoseSmoother,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let sequence = load_pose_sequence("poses.json")?;
//!
//! let smoothed = PoseSmoother::new(config.smoothing.clone())?.smooth(&sequence)?;
//! for warning in &smoothed.warnings {
//!     println!("{warning}");
//! }
//!
//! let mut table = RigProfileTable::with_builtin();
//! let profile = config.rig.resolve_profile(&mut table)?;
//! let output = Retargeter::new(&profile, config.retarget.clone())?.retarget(&smoothed.sequence);
//!
//! write_json("animation.json", &output.animation)?;
//! # Ok(())
//! # }
//! ```

/// Error types and result handling
pub mod error;

/// Constants used throughout the library
pub mod constants;

/// Canonical joints, axes and topology
pub mod landmark;

/// Immutable pose sequence buffer
pub mod sequence;

/// Pose document serialization
pub mod document;

/// Channel filters for smoothing landmark coordinates
pub mod filters;

/// Smoothing orchestrator
pub mod smoothing;

/// Rig profiles and rig family detection
pub mod rig;

/// Retargeting engine
pub mod retarget;

/// Summary statistics
pub mod stats;

/// Configuration management
pub mod config;

pub use error::{Error, Result, Warning};
