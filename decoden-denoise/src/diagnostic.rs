//! Non-fatal conditions raised during a run.

use core::fmt;

use decoden_ml::NmfResult;

/// Outcome of one factorization call, kept after its factors are consumed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    pub n_iter: usize,
    /// Final `sqrt(2·KL)` reconstruction error.
    pub residual: f64,
    pub converged: bool,
}

impl From<&NmfResult> for FitReport {
    fn from(result: &NmfResult) -> Self {
        Self {
            n_iter: result.n_iter,
            residual: result.reconstruction_err,
            converged: result.converged,
        }
    }
}

/// A warning-level condition. The run continues with the best available
/// estimate.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A factorization hit its iteration cap before meeting the tolerance.
    NonConvergence {
        stage: String,
        n_iter: usize,
        residual: f64,
    },
    /// Fewer bins than `min_bins` survived the HSR fit filter.
    DegenerateFit {
        label: String,
        n_bins: usize,
        min_bins: usize,
    },
}

impl Diagnostic {
    /// A non-convergence diagnostic for `stage`, or `None` if the fit converged.
    pub fn check_convergence(stage: impl Into<String>, report: &FitReport) -> Option<Self> {
        if report.converged {
            return None;
        }
        Some(Diagnostic::NonConvergence {
            stage: stage.into(),
            n_iter: report.n_iter,
            residual: report.residual,
        })
    }

    /// Log the diagnostic at `warn` level and hand it back.
    pub(crate) fn emit(self) -> Self {
        log::warn!("{self}");
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NonConvergence {
                stage,
                n_iter,
                residual,
            } => write!(
                f,
                "{stage}: factorization stopped at the iteration cap ({n_iter}) with residual {residual:.4e}"
            ),
            Diagnostic::DegenerateFit {
                label,
                n_bins,
                min_bins,
            } => write!(
                f,
                "{label}: only {n_bins} bins passed the HSR fit filter (minimum {min_bins}); regression may be unreliable"
            ),
        }
    }
}
