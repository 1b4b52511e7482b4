//! Serializable pose documents and JSON file helpers.
//!
//! The same document shape is read from the detector side and written back
//! out for callers that want smoothed joints without retargeting.

use crate::{
    constants::{DEFAULT_FPS, DOCUMENT_FORMAT_VERSION},
    landmark::{Joint, Landmark},
    sequence::{Frame, PoseSequence, SequenceMetadata},
    Error, Result,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fs, path::Path};

/// Document-level metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    #[serde(default)]
    pub image_width: u32,
    #[serde(default)]
    pub image_height: u32,
    #[serde(default)]
    pub total_frames: usize,
    #[serde(default)]
    pub landmark_count: usize,
}

/// One landmark row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkRecord {
    pub name: Joint,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub visibility: f64,
}

/// One frame of landmarks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_index: usize,
    #[serde(default)]
    pub timestamp: Option<f64>,
    pub landmarks: Vec<LandmarkRecord>,
}

/// Whole pose sequence as exchanged with collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseDocument {
    #[serde(default = "default_format_version")]
    pub format_version: String,
    pub metadata: DocumentMetadata,
    pub frames: Vec<FrameRecord>,
}

fn default_frame_rate() -> f64 {
    DEFAULT_FPS
}

fn default_format_version() -> String {
    DOCUMENT_FORMAT_VERSION.to_string()
}

impl PoseSequence {
    /// Build a validated sequence from a document.
    ///
    /// Timestamps are always derived from frame index and frame rate; any
    /// timestamp in the document is ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::DataShape` under the same conditions as
    /// [`PoseSequence::from_frames`], or if `total_frames` disagrees with the
    /// number of frames present.
    pub fn from_document(document: &PoseDocument) -> Result<Self> {
        let meta = &document.metadata;
        if meta.total_frames != 0 && meta.total_frames != document.frames.len() {
            return Err(Error::DataShape(format!(
                "Document declares {} frames but contains {}",
                meta.total_frames,
                document.frames.len()
            )));
        }

        let metadata = SequenceMetadata::new(meta.frame_rate, meta.image_width, meta.image_height);
        let frames: Vec<Frame> = document
            .frames
            .iter()
            .map(|record| {
                let landmarks = record
                    .landmarks
                    .iter()
                    .map(|lm| Landmark::new(lm.name, lm.x, lm.y, lm.z, lm.visibility))
                    .collect();
                Frame::new(record.frame_index, meta.frame_rate, landmarks)
            })
            .collect();

        Self::from_frames(metadata, &frames)
    }

    /// Export the sequence as a document
    #[must_use]
    pub fn to_document(&self) -> PoseDocument {
        let metadata = self.metadata();
        PoseDocument {
            format_version: default_format_version(),
            metadata: DocumentMetadata {
                frame_rate: metadata.frame_rate,
                image_width: metadata.image_width,
                image_height: metadata.image_height,
                total_frames: self.frame_count(),
                landmark_count: Joint::COUNT,
            },
            frames: self
                .frames()
                .map(|frame| FrameRecord {
                    frame_index: frame.index,
                    timestamp: Some(frame.timestamp),
                    landmarks: frame
                        .landmarks
                        .iter()
                        .map(|lm| LandmarkRecord {
                            name: lm.joint,
                            x: lm.position.x,
                            y: lm.position.y,
                            z: lm.position.z,
                            visibility: lm.visibility,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Read and deserialize a JSON file
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be read or `Error::Json` if it is malformed
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Serialize a value to a pretty-printed JSON file
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails or `Error::Io` if the file cannot be written
pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)?;
    Ok(())
}

/// Load a pose document from disk and validate it into a sequence
///
/// # Errors
///
/// Propagates I/O, JSON and data shape errors
pub fn load_pose_sequence<P: AsRef<Path>>(path: P) -> Result<PoseSequence> {
    let document: PoseDocument = read_json(path)?;
    PoseSequence::from_document(&document)
}
