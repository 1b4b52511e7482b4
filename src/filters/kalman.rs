use nalgebra::{Matrix1x2, Matrix2, Vector2};
use super::{fill_gaps, ChannelFilter, ChannelOutput, Sample};
use crate::{
    config::SmoothingConfig,
    constants::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MAX_GAP, DEFAULT_MEASUREMENT_NOISE, DEFAULT_PROCESS_NOISE, MIN_MEASUREMENT_CONFIDENCE},
    Error, Result,
};

/// Constant-velocity state estimator for one scalar channel
pub struct KalmanTracker {
    // State: [position, velocity]
    state: Vector2<f64>,
    // State covariance
    covariance: Matrix2<f64>,
    // Process noise
    process_noise: Matrix2<f64>,
    // Base measurement noise, scaled per sample by confidence
    measurement_noise: f64,
    // State transition matrix
    transition: Matrix2<f64>,
    // Measurement matrix (we only measure position)
    measurement: Matrix1x2<f64>,
}

impl KalmanTracker {
    /// Start tracking at `position` with zero velocity. One step is one frame.
    #[must_use]
    pub fn new(position: f64, process_noise: f64, measurement_noise: f64) -> Self {
        let dt: f64 = 1.0;

        let transition = Matrix2::new(
            1.0, dt,
            0.0, 1.0,
        );

        let measurement = Matrix1x2::new(1.0, 0.0);

        // Discrete white-noise acceleration
        let q = process_noise;
        let process_noise = Matrix2::new(
            q * dt.powi(4) / 4.0, q * dt.powi(3) / 2.0,
            q * dt.powi(3) / 2.0, q * dt.powi(2),
        );

        Self {
            state: Vector2::new(position, 0.0),
            covariance: Matrix2::identity() * measurement_noise,
            process_noise,
            measurement_noise,
            transition,
            measurement,
        }
    }

    /// Propagate the state one frame without a measurement
    pub fn predict(&mut self) {
        self.state = self.transition * self.state;
        self.covariance = self.transition * self.covariance * self.transition.transpose() + self.process_noise;
    }

    /// Fold in a measurement; lower confidence means a noisier measurement
    pub fn update(&mut self, value: f64, confidence: f64) {
        let noise = self.measurement_noise / confidence.max(MIN_MEASUREMENT_CONFIDENCE);

        // Innovation
        let innovation = value - (self.measurement * self.state)[0];

        // Innovation covariance (scalar for a single measured coordinate)
        let innovation_cov = (self.measurement * self.covariance * self.measurement.transpose())[0] + noise;

        // Kalman gain
        let gain = self.covariance * self.measurement.transpose() / innovation_cov;

        // Update state
        self.state += gain * innovation;

        // Update covariance
        let identity = Matrix2::identity();
        self.covariance = (identity - gain * self.measurement) * self.covariance;
    }

    #[must_use]
    pub fn position(&self) -> f64 {
        self.state[0]
    }

    #[must_use]
    pub fn velocity(&self) -> f64 {
        self.state[1]
    }
}

/// Raw Kalman pass over a channel, before any gap policy
#[derive(Debug, Clone, PartialEq)]
pub struct KalmanEstimate {
    pub values: Vec<f64>,
    pub missing: Vec<bool>,
}

impl KalmanEstimate {
    /// True when no sample of a non-empty channel was usable
    #[must_use]
    pub fn never_observed(&self) -> bool {
        !self.missing.is_empty() && self.missing.iter().all(|&m| m)
    }
}

/// Kalman channel filter
pub struct KalmanFilter {
    process_noise: f64,
    measurement_noise: f64,
    confidence_threshold: f64,
    max_gap: usize,
}

impl KalmanFilter {
    /// Create a new Kalman filter
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if either noise scalar is not positive
    pub fn new(process_noise: f64, measurement_noise: f64, confidence_threshold: f64, max_gap: usize) -> Result<Self> {
        if !(process_noise.is_finite() && process_noise > 0.0) {
            return Err(Error::Configuration(format!(
                "Process noise must be positive, got {process_noise}"
            )));
        }
        if !(measurement_noise.is_finite() && measurement_noise > 0.0) {
            return Err(Error::Configuration(format!(
                "Measurement noise must be positive, got {measurement_noise}"
            )));
        }

        Ok(Self {
            process_noise,
            measurement_noise,
            confidence_threshold,
            max_gap,
        })
    }

    /// Create a Kalman filter from the smoothing configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the noise parameters are invalid
    pub fn from_config(config: &SmoothingConfig) -> Result<Self> {
        Self::new(
            config.kalman.process_noise,
            config.kalman.measurement_noise,
            config.confidence_threshold,
            config.max_gap,
        )
    }

    /// Run the filter end to end. Missing samples are predict-only steps.
    ///
    /// Frames before the first usable sample take that sample's value. A
    /// channel with no usable sample holds its first raw value.
    #[must_use]
    pub fn estimate(&self, samples: &[Sample]) -> KalmanEstimate {
        let missing: Vec<bool> = samples.iter().map(|s| s.is_missing(self.confidence_threshold)).collect();

        let Some(first) = missing.iter().position(|&m| !m) else {
            let held = samples.first().map_or(0.0, |s| if s.value.is_finite() { s.value } else { 0.0 });
            return KalmanEstimate {
                values: vec![held; samples.len()],
                missing,
            };
        };

        let mut values = Vec::with_capacity(samples.len());
        values.resize(first + 1, samples[first].value);

        let mut tracker = KalmanTracker::new(samples[first].value, self.process_noise, self.measurement_noise);
        for (sample, &is_missing) in samples.iter().zip(&missing).skip(first + 1) {
            tracker.predict();
            if !is_missing {
                tracker.update(sample.value, sample.confidence);
            }
            values.push(tracker.position());
        }

        KalmanEstimate { values, missing }
    }
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self {
            process_noise: DEFAULT_PROCESS_NOISE,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_gap: DEFAULT_MAX_GAP,
        }
    }
}

impl ChannelFilter for KalmanFilter {
    fn apply(&self, samples: &[Sample]) -> Result<ChannelOutput> {
        let KalmanEstimate { mut values, missing } = self.estimate(samples);
        let unreliable = fill_gaps(&mut values, &missing, self.max_gap, false);
        Ok(ChannelOutput { values, unreliable })
    }

    fn name(&self) -> &str {
        "KalmanFilter"
    }
}
