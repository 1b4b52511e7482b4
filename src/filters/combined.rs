use super::{fill_gaps, kalman::KalmanFilter, savgol::SavitzkyGolayFilter, ChannelFilter, ChannelOutput, Sample};
use crate::{config::SmoothingConfig, Result};

/// Kalman filtering, gap fill and Savitzky-Golay smoothing in sequence.
///
/// The Kalman pass tolerates missing samples; every gap is then filled by
/// holding the last trusted Kalman estimate so that the Savitzky-Golay pass
/// sees a dense, already denoised channel. Gaps longer than `max_gap` are
/// flagged unreliable.
pub struct CombinedFilter {
    kalman: KalmanFilter,
    savgol: SavitzkyGolayFilter,
    max_gap: usize,
}

impl CombinedFilter {
    #[must_use]
    pub fn new(kalman: KalmanFilter, savgol: SavitzkyGolayFilter, max_gap: usize) -> Self {
        Self { kalman, savgol, max_gap }
    }

    /// Create a combined filter from the smoothing configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if either stage is misconfigured
    pub fn from_config(config: &SmoothingConfig) -> Result<Self> {
        Ok(Self::new(
            KalmanFilter::from_config(config)?,
            SavitzkyGolayFilter::from_config(config)?,
            config.max_gap,
        ))
    }
}

impl ChannelFilter for CombinedFilter {
    fn apply(&self, samples: &[Sample]) -> Result<ChannelOutput> {
        let estimate = self.kalman.estimate(samples);
        if estimate.never_observed() {
            let unreliable = vec![true; estimate.values.len()];
            return Ok(ChannelOutput {
                values: estimate.values,
                unreliable,
            });
        }

        let mut values = estimate.values;
        let unreliable = fill_gaps(&mut values, &estimate.missing, self.max_gap, true);
        let values = self.savgol.smooth(&values)?;

        Ok(ChannelOutput { values, unreliable })
    }

    fn name(&self) -> &str {
        "CombinedFilter"
    }
}
