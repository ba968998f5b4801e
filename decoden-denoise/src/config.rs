//! Run configuration for the denoising engine.

use std::path::Path;

use decoden_core::{DecodenError, Result};
use decoden_ml::{NmfConfig, NmfInit};
use serde::{Deserialize, Serialize};

/// Operator-tunable parameters of a denoising run.
///
/// Every field has a default, so a JSON file only needs the keys it wants to
/// override:
///
/// ```
/// use decoden_denoise::DenoiseConfig;
///
/// let config = DenoiseConfig::from_json_str(r#"{ "chunk_size": 1000, "seed": 3 }"#).unwrap();
/// assert_eq!(config.chunk_size, 1000);
/// assert_eq!(config.alpha_w, 0.01);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseConfig {
    /// Regularization strength for the signal factor.
    pub alpha_w: f64,
    /// Regularization strength for the mixing factor.
    pub alpha_h: f64,
    /// Share of L1 in the elastic-net penalty.
    pub l1_ratio: f64,
    /// A bin enters the training pool when any control replicate exceeds this.
    pub control_cov_threshold: f64,
    /// Number of training bins sampled for the factorization.
    pub n_train_bins: usize,
    /// Rows per chunk in the signal projection.
    pub chunk_size: usize,
    /// Seed for training-bin sampling and factor initialisation.
    pub seed: u64,
    /// Floor applied before taking logarithms in HSR.
    pub eps: f64,
    /// Iteration cap for the training-set factorizations.
    pub max_iter: usize,
    /// Iteration cap for each projected chunk.
    pub projection_max_iter: usize,
    /// Relative tolerance of the factorization stopping rule.
    pub tol: f64,
    /// Fewer surviving fit bins than this raises a degenerate-fit diagnostic.
    pub min_fit_bins: usize,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            alpha_w: 0.01,
            alpha_h: 0.001,
            l1_ratio: 0.0,
            control_cov_threshold: 0.1,
            n_train_bins: 50_000,
            chunk_size: 50_000,
            seed: 0,
            eps: 1e-20,
            max_iter: 200,
            projection_max_iter: 500,
            tol: 1e-4,
            min_fit_bins: 100,
        }
    }
}

impl DenoiseConfig {
    /// Parse a (possibly partial) JSON configuration and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DecodenError::Config(format!("invalid configuration JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DecodenError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DecodenError::Config(format!("cannot serialize configuration: {e}")))
    }

    /// Reject non-finite or out-of-range values.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("alpha_w", self.alpha_w),
            ("alpha_h", self.alpha_h),
            ("control_cov_threshold", self.control_cov_threshold),
            ("tol", self.tol),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DecodenError::Config(format!(
                    "{name} must be finite and >= 0 (got {value})"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(DecodenError::Config(format!(
                "l1_ratio must be in [0, 1] (got {})",
                self.l1_ratio
            )));
        }
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(DecodenError::Config(format!(
                "eps must be finite and > 0 (got {})",
                self.eps
            )));
        }
        for (name, value) in [
            ("n_train_bins", self.n_train_bins),
            ("chunk_size", self.chunk_size),
            ("max_iter", self.max_iter),
            ("projection_max_iter", self.projection_max_iter),
        ] {
            if value == 0 {
                return Err(DecodenError::Config(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }

    /// Rank-1 factorization settings shared by the training-set stages.
    pub(crate) fn rank_one(&self, init: NmfInit) -> NmfConfig {
        NmfConfig {
            n_components: 1,
            alpha_w: self.alpha_w,
            alpha_h: self.alpha_h,
            l1_ratio: self.l1_ratio,
            max_iter: self.max_iter,
            tol: self.tol,
            seed: self.seed,
            init,
        }
    }
}
