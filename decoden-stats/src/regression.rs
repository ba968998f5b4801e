//! Least-squares regression without an intercept term.
//!
//! HSR rescaling fits `y ≈ β·x` on log-transformed tracks, so the only
//! parameter is the slope `β = Σxy / Σx²`.

use decoden_core::{DecodenError, Result, Summarizable};

/// A fitted through-origin line `y = slope · x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OriginFit {
    /// Fitted slope.
    pub slope: f64,
    /// Number of observations used in the fit.
    pub n_obs: usize,
    /// Uncentered coefficient of determination, `1 - SS_res / Σy²`.
    pub r_squared: f64,
}

impl OriginFit {
    /// Predicted response for a single predictor value.
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x
    }
}

impl Summarizable for OriginFit {
    fn summary(&self) -> String {
        format!(
            "y = {:.4}·x (n={}, R²={:.3})",
            self.slope, self.n_obs, self.r_squared
        )
    }
}

/// Fit `y ≈ slope · x` by ordinary least squares with no intercept.
///
/// # Errors
///
/// - [`DecodenError::InvalidInput`] if `x` and `y` differ in length, contain
///   non-finite values, or every `x` is zero (the slope is undefined).
/// - [`DecodenError::InsufficientData`] if there are no observations.
pub fn fit_through_origin(x: &[f64], y: &[f64]) -> Result<OriginFit> {
    if x.len() != y.len() {
        return Err(DecodenError::InvalidInput(format!(
            "regression: x and y must have the same length ({} vs {})",
            x.len(),
            y.len(),
        )));
    }
    if x.is_empty() {
        return Err(DecodenError::InsufficientData {
            requested: 1,
            available: 0,
        });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(DecodenError::InvalidInput(
            "regression: observations must be finite".into(),
        ));
    }

    let sum_xx: f64 = x.iter().map(|&v| v * v).sum();
    if sum_xx < 1e-300 {
        return Err(DecodenError::InvalidInput(
            "degenerate regression: all predictor values are zero".into(),
        ));
    }
    let sum_xy: f64 = x.iter().zip(y).map(|(&a, &b)| a * b).sum();
    let slope = sum_xy / sum_xx;

    let sum_yy: f64 = y.iter().map(|&v| v * v).sum();
    let ss_res: f64 = x
        .iter()
        .zip(y)
        .map(|(&a, &b)| (b - slope * a).powi(2))
        .sum();
    let r_squared = if sum_yy > 0.0 { 1.0 - ss_res / sum_yy } else { 1.0 };

    Ok(OriginFit {
        slope,
        n_obs: x.len(),
        r_squared,
    })
}
