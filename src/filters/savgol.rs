use nalgebra::DMatrix;
use super::{ChannelFilter, ChannelOutput, Sample};
use crate::{config::SmoothingConfig, constants::EPSILON, Error, Result};

/// Savitzky-Golay smoother.
///
/// Fits a polynomial of order `order` by least squares over a centered
/// window and evaluates it at the window center. Near the ends of the
/// channel the window is clipped to the data rather than padded, and if the
/// clipped window has fewer than `order + 1` points it is extended on the
/// side that still has data. Polynomials of degree at most `order` pass
/// through unchanged everywhere.
pub struct SavitzkyGolayFilter {
    window: usize,
    order: usize,
    confidence_threshold: f64,
    // Weights for a full, centered window
    interior: Vec<f64>,
}

impl SavitzkyGolayFilter {
    /// Create a new Savitzky-Golay filter
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if `window` is even or smaller than `order + 2`
    pub fn new(window: usize, order: usize, confidence_threshold: f64) -> Result<Self> {
        if window % 2 == 0 {
            return Err(Error::Configuration(format!(
                "Savitzky-Golay window length must be odd, got {window}"
            )));
        }
        if window < order + 2 {
            return Err(Error::Configuration(format!(
                "Savitzky-Golay window length {window} must be at least polynomial order + 2 ({})",
                order + 2
            )));
        }

        let half = window / 2;
        let interior = fit_weights(half, half, order).map_err(|e| Error::Configuration(e.to_string()))?;

        Ok(Self {
            window,
            order,
            confidence_threshold,
            interior,
        })
    }

    /// Create a Savitzky-Golay filter from the smoothing configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the window and order are incompatible
    pub fn from_config(config: &SmoothingConfig) -> Result<Self> {
        Self::new(config.savgol.window_length, config.savgol.polyorder, config.confidence_threshold)
    }

    #[must_use]
    pub fn window(&self) -> usize {
        self.window
    }

    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Smooth a dense channel
    ///
    /// # Errors
    ///
    /// Returns `Error::FilterError` if an edge window cannot be fitted
    pub fn smooth(&self, values: &[f64]) -> Result<Vec<f64>> {
        let n = values.len();
        let half = self.window / 2;
        let needed = (self.order + 1).min(n);
        let mut out = Vec::with_capacity(n);

        for i in 0..n {
            let mut lo = i.saturating_sub(half);
            let mut hi = (i + half).min(n - 1);
            while hi - lo + 1 < needed {
                if hi < n - 1 {
                    hi += 1;
                } else if lo > 0 {
                    lo -= 1;
                } else {
                    break;
                }
            }

            let (before, after) = (i - lo, hi - i);
            let edge;
            let weights = if before == half && after == half {
                &self.interior
            } else {
                edge = fit_weights(before, after, self.order)?;
                &edge
            };

            out.push(weights.iter().zip(&values[lo..=hi]).map(|(w, v)| w * v).sum());
        }

        Ok(out)
    }
}

/// Least-squares weights that evaluate the fitted polynomial at the point
/// with `before` samples to its left and `after` to its right
fn fit_weights(before: usize, after: usize, order: usize) -> Result<Vec<f64>> {
    let len = before + after + 1;
    let order = order.min(len - 1);

    let vandermonde = DMatrix::from_fn(len, order + 1, |row, power| {
        let t = row as f64 - before as f64;
        t.powi(power as i32)
    });

    let pseudo_inverse = vandermonde
        .pseudo_inverse(EPSILON)
        .map_err(|e| Error::FilterError(format!("Savitzky-Golay fit failed: {e}")))?;

    // Row 0 yields the constant coefficient, i.e. the value at t = 0
    Ok(pseudo_inverse.row(0).iter().copied().collect())
}

impl ChannelFilter for SavitzkyGolayFilter {
    fn apply(&self, samples: &[Sample]) -> Result<ChannelOutput> {
        if let Some(i) = samples.iter().position(|s| s.is_missing(self.confidence_threshold)) {
            return Err(Error::DataGap(format!(
                "Savitzky-Golay needs a dense channel but sample {i} is missing"
            )));
        }

        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        Ok(ChannelOutput::reliable(self.smooth(&values)?))
    }

    fn name(&self) -> &str {
        "SavitzkyGolayFilter"
    }
}
