//! Channel filters for smoothing landmark coordinates.
//!
//! Every filter maps one scalar coordinate channel (one axis of one joint
//! across all frames) to a denoised channel of the same length. Channels are
//! independent, so the smoothing orchestrator can run them in parallel.

/// Constant-velocity Kalman filter with predict-only steps for missing samples
pub mod kalman;

/// Savitzky-Golay polynomial smoothing over a sliding window
pub mod savgol;

/// Gap fill, Kalman and Savitzky-Golay chained in one filter
pub mod combined;

use crate::{config::SmoothingConfig, constants::DEFAULT_CONFIDENCE_THRESHOLD, Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// One channel value and the confidence of the landmark it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub confidence: f64,
}

impl Sample {
    #[must_use]
    pub fn new(value: f64, confidence: f64) -> Self {
        Self { value, confidence }
    }

    /// Missing samples are kept as placeholders but never used as measurements
    #[must_use]
    pub fn is_missing(&self, threshold: f64) -> bool {
        self.confidence < threshold || !self.value.is_finite()
    }
}

/// Filtered channel plus the frames whose value could not be trusted
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelOutput {
    pub values: Vec<f64>,
    /// Per frame; unreliable frames are emitted with zero visibility
    pub unreliable: Vec<bool>,
}

impl ChannelOutput {
    /// Output with every frame trusted
    #[must_use]
    pub fn reliable(values: Vec<f64>) -> Self {
        let unreliable = vec![false; values.len()];
        Self { values, unreliable }
    }

    /// True when no frame of a non-empty channel met the confidence threshold
    #[must_use]
    pub fn is_unreliable(&self) -> bool {
        !self.unreliable.is_empty() && self.unreliable.iter().all(|&u| u)
    }
}

/// Trait for all channel filters
pub trait ChannelFilter: Send + Sync {
    /// Filter one channel; output has the same length as the input
    ///
    /// # Errors
    ///
    /// Returns an error if the filter cannot process the channel
    fn apply(&self, samples: &[Sample]) -> Result<ChannelOutput>;

    /// Get filter name
    fn name(&self) -> &str;
}

/// No-op filter that passes through values unchanged.
///
/// A channel in which no sample meets the confidence threshold is still
/// flagged unreliable everywhere.
pub struct NoFilter {
    confidence_threshold: f64,
}

impl NoFilter {
    #[must_use]
    pub fn new(confidence_threshold: f64) -> Self {
        Self { confidence_threshold }
    }
}

impl Default for NoFilter {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl ChannelFilter for NoFilter {
    fn apply(&self, samples: &[Sample]) -> Result<ChannelOutput> {
        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        if samples.iter().all(|s| s.is_missing(self.confidence_threshold)) {
            let unreliable = vec![true; values.len()];
            return Ok(ChannelOutput { values, unreliable });
        }
        Ok(ChannelOutput::reliable(values))
    }

    fn name(&self) -> &str {
        "NoFilter"
    }
}

/// Smoothing method selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmoothingMethod {
    None,
    Kalman,
    Savgol,
    #[default]
    Combined,
}

impl FromStr for SmoothingMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" | "nofilter" => Ok(Self::None),
            "kalman" => Ok(Self::Kalman),
            "savgol" | "savitzky_golay" | "savitzkygolay" => Ok(Self::Savgol),
            "combined" => Ok(Self::Combined),
            _ => Err(Error::Configuration(format!("Unknown smoothing method: {s}"))),
        }
    }
}

impl fmt::Display for SmoothingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Kalman => "kalman",
            Self::Savgol => "savgol",
            Self::Combined => "combined",
        })
    }
}

/// Create the channel filter selected by a smoothing configuration
///
/// # Errors
///
/// Returns `Error::Configuration` if the filter parameters are invalid
pub fn create_filter(config: &SmoothingConfig) -> Result<Box<dyn ChannelFilter>> {
    config.validate()?;

    match config.method {
        SmoothingMethod::None => Ok(Box::new(NoFilter::new(config.confidence_threshold))),
        SmoothingMethod::Kalman => Ok(Box::new(kalman::KalmanFilter::from_config(config)?)),
        SmoothingMethod::Savgol => Ok(Box::new(savgol::SavitzkyGolayFilter::from_config(config)?)),
        SmoothingMethod::Combined => Ok(Box::new(combined::CombinedFilter::from_config(config)?)),
    }
}

/// Fill runs of missing samples in a filtered channel.
///
/// A run no longer than `max_gap` keeps its values unless `hold_short_gaps`
/// is set, in which case it takes the last trusted value before it. Longer
/// runs always take that held value and are flagged unreliable. A leading
/// run holds the first trusted value after it. A channel with no trusted
/// value at all is left as is and flagged unreliable everywhere.
pub(crate) fn fill_gaps(values: &mut [f64], missing: &[bool], max_gap: usize, hold_short_gaps: bool) -> Vec<bool> {
    let n = values.len();
    let mut unreliable = vec![false; n];
    let mut i = 0;

    while i < n {
        if !missing[i] {
            i += 1;
            continue;
        }

        let start = i;
        while i < n && missing[i] {
            i += 1;
        }
        let end = i;
        let long = end - start > max_gap;

        let held = if start > 0 {
            Some(values[start - 1])
        } else if end < n {
            Some(values[end])
        } else {
            None
        };

        match held {
            None => unreliable[start..end].fill(true),
            Some(value) => {
                if long || hold_short_gaps || start == 0 {
                    values[start..end].fill(value);
                }
                if long {
                    unreliable[start..end].fill(true);
                }
            }
        }
    }

    unreliable
}
