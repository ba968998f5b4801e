//! Propagation of the background to the treatment replicates.
//!
//! With the background signal held fixed, only the per-sample coefficients
//! of the treatment columns are solved for. The result is one background
//! coefficient for every sample of the experiment.

use decoden_core::{DecodenError, Result};
use decoden_ml::{nmf_fixed, FixedFactor, NmfConfig, NmfInit};
use decoden_omics::{BinMatrix, ConditionLayout};

use crate::background::Background;
use crate::config::DenoiseConfig;
use crate::diagnostic::FitReport;

/// Background coefficient of every sample, control columns first.
#[derive(Debug, Clone)]
pub struct BackgroundCoefficients {
    /// One coefficient per sample column, in matrix order.
    pub coefficients: Vec<f64>,
    pub report: FitReport,
}

/// Solve the treatment-side background coefficients with the background
/// signal frozen, and concatenate them after the control coefficients.
///
/// # Errors
///
/// `InvalidInput` when the layout has no treatment conditions, and
/// `ShapeMismatch` when the background does not match the training set.
pub fn propagate_background(
    training: &BinMatrix,
    layout: &ConditionLayout,
    background: &Background,
    config: &DenoiseConfig,
) -> Result<BackgroundCoefficients> {
    layout.check_columns(training.column_names())?;
    if layout.n_treatments() == 0 {
        return Err(DecodenError::InvalidInput(
            "at least one treatment condition is required".into(),
        ));
    }
    if background.signal.len() != training.n_bins() {
        return Err(DecodenError::ShapeMismatch(format!(
            "background signal covers {} bins, training set has {}",
            background.signal.len(),
            training.n_bins()
        )));
    }
    if background.control_coefficients.len() != layout.control_range().len() {
        return Err(DecodenError::ShapeMismatch(format!(
            "{} control coefficients for {} control replicates",
            background.control_coefficients.len(),
            layout.control_range().len()
        )));
    }

    let treatment_cols: Vec<usize> = layout.treatment_columns().collect();
    let treatments = training.select_columns(&treatment_cols)?;

    // Only the coefficient side is updated, and it takes the signal-side
    // regularization strength.
    let nmf_config = NmfConfig {
        alpha_h: config.alpha_w,
        ..config.rank_one(NmfInit::Constant)
    };
    let fit = nmf_fixed(
        treatments.as_slice(),
        treatment_cols.len(),
        FixedFactor::Signal(&background.signal),
        None,
        &nmf_config,
    )?;
    let report = FitReport::from(&fit);
    log::info!(
        "background propagation: {} treatment replicates, {} iterations, residual {:.4e}",
        treatment_cols.len(),
        report.n_iter,
        report.residual
    );

    let mut coefficients = Vec::with_capacity(layout.n_samples());
    coefficients.extend_from_slice(&background.control_coefficients);
    coefficients.extend_from_slice(&fit.h);

    Ok(BackgroundCoefficients {
        coefficients,
        report,
    })
}
