//! Condition-specific components.
//!
//! Once the background contribution is removed from the training set, what
//! remains in each treatment condition's columns is that condition's own
//! signal. Each condition gets an independent rank-1 factorization of its
//! column block.

use std::ops::Range;

use decoden_core::{DecodenError, Result};
use decoden_ml::{nmf, NmfInit};
use decoden_omics::{BinMatrix, ConditionLayout};

use crate::config::DenoiseConfig;
use crate::diagnostic::FitReport;

/// Rank-1 component of one treatment condition.
#[derive(Debug, Clone)]
pub struct SpecificComponent {
    pub label: String,
    /// Column range of the condition's replicates.
    pub columns: Range<usize>,
    /// One coefficient per replicate of the condition.
    pub coefficients: Vec<f64>,
    pub report: FitReport,
}

/// `max(X − W·h, 0)`: the training matrix with the background removed.
///
/// Returned row-major, `n_bins × n_samples`.
pub fn background_residual(
    training: &BinMatrix,
    signal: &[f64],
    coefficients: &[f64],
) -> Result<Vec<f64>> {
    let (n_bins, n_samples) = training.shape();
    if signal.len() != n_bins || coefficients.len() != n_samples {
        return Err(DecodenError::ShapeMismatch(format!(
            "background of {} bins \u{00d7} {} samples does not match training set {n_bins} \u{00d7} {n_samples}",
            signal.len(),
            coefficients.len()
        )));
    }
    let residual = training
        .as_slice()
        .chunks_exact(n_samples.max(1))
        .zip(signal)
        .flat_map(|(row, &w)| {
            row.iter()
                .zip(coefficients)
                .map(move |(&x, &h)| (x - w * h).max(0.0))
        })
        .collect();
    Ok(residual)
}

/// Fit one rank-1 component per treatment condition on the background
/// residual, in conditions-list order.
pub fn extract_specific(
    training: &BinMatrix,
    layout: &ConditionLayout,
    signal: &[f64],
    coefficients: &[f64],
    config: &DenoiseConfig,
) -> Result<Vec<SpecificComponent>> {
    layout.check_columns(training.column_names())?;
    let residual = background_residual(training, signal, coefficients)?;
    let n_samples = layout.n_samples();
    let treatments: Vec<(&str, Range<usize>)> = layout.treatments().collect();

    let fit_one = |(label, columns): &(&str, Range<usize>)| -> Result<SpecificComponent> {
        let width = columns.len();
        let block: Vec<f64> = residual
            .chunks_exact(n_samples)
            .flat_map(|row| row[columns.clone()].iter().copied())
            .collect();
        let fit = nmf(&block, width, &config.rank_one(NmfInit::Nndsvda))?;
        let report = FitReport::from(&fit);
        log::info!(
            "specific component '{}': {} replicates, {} iterations, residual {:.4e}",
            label,
            width,
            report.n_iter,
            report.residual
        );
        Ok(SpecificComponent {
            label: label.to_string(),
            columns: columns.clone(),
            coefficients: fit.h,
            report,
        })
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        treatments.par_iter().map(fit_one).collect()
    }
    #[cfg(not(feature = "parallel"))]
    treatments.iter().map(fit_one).collect()
}
