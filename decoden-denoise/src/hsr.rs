//! HSR: log-linear rescaling of treatment signal against the control.
//!
//! Both tracks are log-transformed under a floor `eps`. A through-origin
//! line `log(treatment) ≈ β·log(control)` is fitted on the usable bins where
//! both tracks lie above their own median over usable bins. The prediction
//! for every bin, floored at `log(0.5)`, is the control-driven baseline; the
//! normalized value is the treatment divided by that baseline.
//!
//! Two variants share this machinery:
//!
//! - [`run_hsr`] rescales each treatment condition's pooled signal column;
//! - [`run_hsr_replicates`] rescales each treatment replicate after removing
//!   its own share of the background, which keeps inter-replicate variation.

use decoden_core::{DecodenError, Result};
use decoden_omics::{BinMask, BinMatrix, ConditionLayout};
use decoden_stats::{fit_through_origin, median, OriginFit};

use crate::config::DenoiseConfig;
use crate::diagnostic::Diagnostic;
use crate::mixing::MixingMatrix;

/// Column-name suffix of normalized tracks in the HSR table.
pub const HSR_VALUE_SUFFIX: &str = " HSR Value";
/// Column-name suffix of fitted baselines in the HSR table.
pub const FIT_SUFFIX: &str = " fit";

/// `log(0.5)`, the floor of the predicted log baseline.
const LOG_BASELINE_FLOOR: f64 = -std::f64::consts::LN_2;

/// One normalized track.
#[derive(Debug, Clone)]
pub struct HsrTrack {
    /// Condition or sample label.
    pub label: String,
    pub fit: OriginFit,
    /// `exp(log(treatment) − prediction)` for every bin.
    pub values: Vec<f64>,
    /// `exp(prediction)` for every bin.
    pub baseline: Vec<f64>,
}

/// HSR table plus per-track fits and warnings.
#[derive(Debug, Clone)]
pub struct HsrOutput {
    /// Bins × 2 columns per track: `<label> HSR Value`, `<label> fit`.
    pub table: BinMatrix,
    /// Fitted line of every track, in output order.
    pub fits: Vec<(String, OriginFit)>,
    pub diagnostics: Vec<Diagnostic>,
}

/// `ln(max(eps, x))` for every value.
pub fn log_floor(values: &[f64], eps: f64) -> Vec<f64> {
    values.iter().map(|&x| x.max(eps).ln()).collect()
}

/// Usable bins where both log tracks exceed their median over usable bins.
pub fn select_fit_bins(control_log: &[f64], treatment_log: &[f64], mask: &BinMask) -> Vec<usize> {
    let usable: Vec<usize> = mask.usable_indices().collect();
    let control_usable: Vec<f64> = usable.iter().map(|&i| control_log[i]).collect();
    let treatment_usable: Vec<f64> = usable.iter().map(|&i| treatment_log[i]).collect();
    let (Ok(control_median), Ok(treatment_median)) =
        (median(&control_usable), median(&treatment_usable))
    else {
        return Vec::new();
    };
    usable
        .into_iter()
        .filter(|&i| control_log[i] > control_median && treatment_log[i] > treatment_median)
        .collect()
}

/// Fit one treatment track against the control and normalize every bin.
///
/// # Errors
///
/// `InsufficientData` when no bin survives the fit filter, `InvalidInput`
/// when the surviving control values are all zero on the log scale.
pub fn normalize_track(
    label: &str,
    control_log: &[f64],
    treatment_log: &[f64],
    mask: &BinMask,
    min_fit_bins: usize,
) -> Result<(HsrTrack, Option<Diagnostic>)> {
    if control_log.len() != treatment_log.len() {
        return Err(DecodenError::ShapeMismatch(format!(
            "{label}: control has {} bins, treatment {}",
            control_log.len(),
            treatment_log.len()
        )));
    }
    mask.check_aligned(control_log.len())?;

    let fit_bins = select_fit_bins(control_log, treatment_log, mask);
    if fit_bins.is_empty() {
        return Err(DecodenError::InsufficientData {
            requested: min_fit_bins.max(1),
            available: 0,
        });
    }
    let x: Vec<f64> = fit_bins.iter().map(|&i| control_log[i]).collect();
    let y: Vec<f64> = fit_bins.iter().map(|&i| treatment_log[i]).collect();
    let fit = fit_through_origin(&x, &y)
        .map_err(|e| DecodenError::InvalidInput(format!("{label}: {e}")))?;

    let diagnostic = (fit_bins.len() < min_fit_bins).then(|| {
        Diagnostic::DegenerateFit {
            label: label.to_string(),
            n_bins: fit_bins.len(),
            min_bins: min_fit_bins,
        }
        .emit()
    });

    let mut values = Vec::with_capacity(control_log.len());
    let mut baseline = Vec::with_capacity(control_log.len());
    for (&c, &t) in control_log.iter().zip(treatment_log) {
        let log_pred = fit.predict(c).max(LOG_BASELINE_FLOOR);
        values.push((t - log_pred).exp());
        baseline.push(log_pred.exp());
    }
    log::info!("HSR {}: slope {:.4} on {} bins", label, fit.slope, fit.n_obs);

    Ok((
        HsrTrack {
            label: label.to_string(),
            fit,
            values,
            baseline,
        },
        diagnostic,
    ))
}

/// Pooled-condition HSR on the signal matrix.
///
/// Column 0 of `signal` is the control (background) signal, and every other
/// column is a treatment condition in conditions-list order.
pub fn run_hsr(
    signal: &BinMatrix,
    mask: &BinMask,
    layout: &ConditionLayout,
    config: &DenoiseConfig,
) -> Result<HsrOutput> {
    check_signal(signal, layout)?;
    mask.check_aligned(signal.n_bins())?;

    let control_log = column_log(signal, 0, config.eps)?;
    let columns: Vec<usize> = (1..signal.n_columns()).collect();

    let normalize = |&col: &usize| -> Result<(HsrTrack, Option<Diagnostic>)> {
        let treatment_log = column_log(signal, col, config.eps)?;
        normalize_track(
            &signal.column_names()[col],
            &control_log,
            &treatment_log,
            mask,
            config.min_fit_bins,
        )
    };

    #[cfg(feature = "parallel")]
    let tracks: Vec<(HsrTrack, Option<Diagnostic>)> = {
        use rayon::prelude::*;
        columns.par_iter().map(normalize).collect::<Result<_>>()?
    };
    #[cfg(not(feature = "parallel"))]
    let tracks: Vec<(HsrTrack, Option<Diagnostic>)> =
        columns.iter().map(normalize).collect::<Result<_>>()?;

    assemble(signal, tracks)
}

/// Per-replicate HSR on the original coverage.
///
/// For treatment replicate `j`, the specific signal is
/// `max(coverage_j − background_j · control_signal, eps)`, where
/// `background_j` is the replicate's background weight in the mixing matrix
/// and `control_signal` is column 0 of the signal matrix.
pub fn run_hsr_replicates(
    coverage: &BinMatrix,
    signal: &BinMatrix,
    mixing: &MixingMatrix,
    mask: &BinMask,
    layout: &ConditionLayout,
    config: &DenoiseConfig,
) -> Result<HsrOutput> {
    check_signal(signal, layout)?;
    layout.check_columns(coverage.column_names())?;
    if mixing.sample_names() != coverage.column_names() {
        return Err(DecodenError::ShapeMismatch(
            "mixing matrix samples do not match the coverage columns".into(),
        ));
    }
    if coverage.bins() != signal.bins() {
        return Err(DecodenError::ShapeMismatch(format!(
            "coverage ({} bins) and signal ({} bins) are not on the same bin grid",
            coverage.n_bins(),
            signal.n_bins()
        )));
    }
    mask.check_aligned(signal.n_bins())?;

    let control_signal = signal.column(0).unwrap_or_default();
    let control_log = log_floor(&control_signal, config.eps);
    let background = mixing.background();
    let columns: Vec<usize> = layout.treatment_columns().collect();

    let normalize = |&col: &usize| -> Result<(HsrTrack, Option<Diagnostic>)> {
        let coef = background[col];
        let specific: Vec<f64> = coverage
            .column(col)
            .unwrap_or_default()
            .iter()
            .zip(&control_signal)
            .map(|(&x, &c)| x - coef * c)
            .collect();
        let treatment_log = log_floor(&specific, config.eps);
        normalize_track(
            &coverage.column_names()[col],
            &control_log,
            &treatment_log,
            mask,
            config.min_fit_bins,
        )
    };

    #[cfg(feature = "parallel")]
    let tracks: Vec<(HsrTrack, Option<Diagnostic>)> = {
        use rayon::prelude::*;
        columns.par_iter().map(normalize).collect::<Result<_>>()?
    };
    #[cfg(not(feature = "parallel"))]
    let tracks: Vec<(HsrTrack, Option<Diagnostic>)> =
        columns.iter().map(normalize).collect::<Result<_>>()?;

    assemble(signal, tracks)
}

fn check_signal(signal: &BinMatrix, layout: &ConditionLayout) -> Result<()> {
    if signal.column_names() != layout.conditions() {
        return Err(DecodenError::ShapeMismatch(format!(
            "signal columns [{}] do not match the conditions list [{}]",
            signal.column_names().join(", "),
            layout.conditions().join(", ")
        )));
    }
    if layout.n_treatments() == 0 {
        return Err(DecodenError::InvalidInput(
            "at least one treatment condition is required".into(),
        ));
    }
    Ok(())
}

fn column_log(matrix: &BinMatrix, col: usize, eps: f64) -> Result<Vec<f64>> {
    let values = matrix
        .column(col)
        .ok_or_else(|| DecodenError::InvalidInput(format!("column {col} out of bounds")))?;
    Ok(log_floor(&values, eps))
}

fn assemble(signal: &BinMatrix, tracks: Vec<(HsrTrack, Option<Diagnostic>)>) -> Result<HsrOutput> {
    let mut names = Vec::with_capacity(2 * tracks.len());
    let mut columns = Vec::with_capacity(2 * tracks.len());
    let mut fits = Vec::with_capacity(tracks.len());
    let mut diagnostics = Vec::new();

    for (track, diagnostic) in tracks {
        names.push(format!("{}{HSR_VALUE_SUFFIX}", track.label));
        names.push(format!("{}{FIT_SUFFIX}", track.label));
        columns.push(track.values);
        columns.push(track.baseline);
        fits.push((track.label, track.fit));
        diagnostics.extend(diagnostic);
    }

    let table = BinMatrix::from_columns(signal.bins().to_vec(), names, columns)?;
    Ok(HsrOutput {
        table,
        fits,
        diagnostics,
    })
}
