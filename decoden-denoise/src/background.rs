//! Background extraction from the control replicates.
//!
//! The control samples share only the unspecific background, so a rank-1
//! factorization of their training columns gives the background signal
//! `W` (one value per training bin) and one coefficient per control
//! replicate.

use decoden_core::{DecodenError, Result};
use decoden_ml::{nmf, NmfInit};
use decoden_omics::{BinMatrix, ConditionLayout};

use crate::config::DenoiseConfig;
use crate::diagnostic::FitReport;

/// Rank-1 background fitted on the control training columns.
#[derive(Debug, Clone)]
pub struct Background {
    /// Background signal over the training bins.
    pub signal: Vec<f64>,
    /// Weight of the background in each control replicate.
    pub control_coefficients: Vec<f64>,
    pub report: FitReport,
}

/// Fit the background signal and control coefficients on `training`.
///
/// # Errors
///
/// `ShapeMismatch` if `layout` does not describe the training columns, or any
/// factorization input error.
pub fn extract_background(
    training: &BinMatrix,
    layout: &ConditionLayout,
    config: &DenoiseConfig,
) -> Result<Background> {
    layout.check_columns(training.column_names())?;
    if training.is_empty() {
        return Err(DecodenError::InsufficientData {
            requested: 1,
            available: 0,
        });
    }

    let control_cols: Vec<usize> = layout.control_range().collect();
    let control = training.select_columns(&control_cols)?;

    let fit = nmf(control.as_slice(), control_cols.len(), &config.rank_one(NmfInit::Random))?;
    let report = FitReport::from(&fit);
    log::info!(
        "background: rank-1 fit on {} bins \u{00d7} {} control replicates, {} iterations, residual {:.4e}",
        training.n_bins(),
        control_cols.len(),
        report.n_iter,
        report.residual
    );

    Ok(Background {
        signal: fit.w,
        control_coefficients: fit.h,
        report,
    })
}
