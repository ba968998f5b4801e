//! Non-negative matrix factorization (NMF).
//!
//! Approximates a non-negative matrix `X` (`n_rows × n_cols`, row-major) by
//! the product `W·H` of a *signal* factor `W` (`n_rows × k`) and a *mixing*
//! factor `H` (`k × n_cols`). The objective is the generalized
//! Kullback–Leibler divergence `D(X ‖ WH)`, which suits count-like coverage
//! data, plus elastic-net penalties on both factors:
//!
//! ```text
//! D(X ‖ WH) + l1_w·‖W‖₁ + ½·l2_w·‖W‖²_F + l1_h·‖H‖₁ + ½·l2_h·‖H‖²_F
//! ```
//!
//! where `l1_w = n_cols·alpha_w·l1_ratio`, `l2_w = n_cols·alpha_w·(1 − l1_ratio)`
//! and the `H` penalties are scaled by `n_rows` in the same way.
//!
//! The solver uses multiplicative updates, which keep both factors
//! non-negative without projection. Convergence is checked every 10
//! iterations: the run stops once the relative decrease of
//! `sqrt(2·D(X ‖ WH))` since the previous check, measured against the initial
//! error, falls below `tol`.
//!
//! [`nmf_fixed`] runs the same solver with one factor frozen, which is how
//! known background signals or known mixing weights are projected onto new
//! data.

use decoden_core::{DecodenError, Result, Summarizable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Floor applied to reconstructed values and update denominators.
const EPSILON: f64 = f32::EPSILON as f64;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Initialisation strategy for the factors being fitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NmfInit {
    /// `sqrt(mean(X) / k) · |N(0, 1)|`, drawn from a generator seeded with
    /// [`NmfConfig::seed`].
    Random,
    /// Non-negative double SVD from the leading singular triplet of `X`,
    /// with exact zeros replaced by `mean(X)`. Single-component only.
    Nndsvda,
    /// Uniform on `[0, high)`, seeded.
    Uniform { high: f64 },
    /// Every entry set to `sqrt(mean(X) / k)`.
    Constant,
}

/// Configuration for NMF.
#[derive(Debug, Clone)]
pub struct NmfConfig {
    /// Number of latent components `k`.
    pub n_components: usize,
    /// Regularization strength for the signal factor `W`.
    pub alpha_w: f64,
    /// Regularization strength for the mixing factor `H`.
    pub alpha_h: f64,
    /// Share of the penalty that is L1 (`0.0` = pure L2, `1.0` = pure L1).
    pub l1_ratio: f64,
    /// Maximum number of multiplicative-update iterations.
    pub max_iter: usize,
    /// Relative tolerance for the stopping rule. `0.0` runs exactly `max_iter`
    /// iterations.
    pub tol: f64,
    /// Seed for the random initialisation strategies.
    pub seed: u64,
    /// Initialisation strategy.
    pub init: NmfInit,
}

impl Default for NmfConfig {
    fn default() -> Self {
        Self {
            n_components: 1,
            alpha_w: 0.0,
            alpha_h: 0.0,
            l1_ratio: 0.0,
            max_iter: 200,
            tol: 1e-4,
            seed: 0,
            init: NmfInit::Random,
        }
    }
}

/// A factor held fixed by [`nmf_fixed`].
#[derive(Debug, Clone, Copy)]
pub enum FixedFactor<'a> {
    /// `W` is frozen (`n_rows × k`, row-major); only `H` is fitted.
    Signal(&'a [f64]),
    /// `H` is frozen (`k × n_cols`, row-major); only `W` is fitted.
    Mixing(&'a [f64]),
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Result of an NMF run.
#[derive(Debug, Clone)]
pub struct NmfResult {
    /// Signal factor, row-major: `n_rows × n_components`.
    pub w: Vec<f64>,
    /// Mixing factor, row-major: `n_components × n_cols`.
    pub h: Vec<f64>,
    /// Rows of the factorized matrix.
    pub n_rows: usize,
    /// Columns of the factorized matrix.
    pub n_cols: usize,
    /// Number of components.
    pub n_components: usize,
    /// Iterations actually run.
    pub n_iter: usize,
    /// Final `sqrt(2·D(X ‖ WH))`.
    pub reconstruction_err: f64,
    /// Whether the stopping rule was met before `max_iter` (always `true` when
    /// `tol` is zero and the iteration budget was the goal).
    pub converged: bool,
}

impl NmfResult {
    /// Column `component` of `W`: the latent signal across all rows.
    pub fn signal(&self, component: usize) -> Option<Vec<f64>> {
        if component >= self.n_components {
            return None;
        }
        Some(
            (0..self.n_rows)
                .map(|i| self.w[i * self.n_components + component])
                .collect(),
        )
    }

    /// Row `component` of `H`: the weight of that component in every column.
    pub fn mixing(&self, component: usize) -> Option<&[f64]> {
        if component >= self.n_components {
            return None;
        }
        let start = component * self.n_cols;
        Some(&self.h[start..start + self.n_cols])
    }
}

impl Summarizable for NmfResult {
    fn summary(&self) -> String {
        format!(
            "NMF: {} × {} with {} component(s), {} iterations, error {:.4e}{}",
            self.n_rows,
            self.n_cols,
            self.n_components,
            self.n_iter,
            self.reconstruction_err,
            if self.converged { "" } else { " (not converged)" },
        )
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Factorize `x` (`n_rows × n_cols`, row-major) into `W·H`, fitting both
/// factors.
///
/// # Errors
///
/// Returns an error if the data is empty, not divisible into `n_cols`
/// columns, contains negative or non-finite values, or the configuration is
/// out of range.
pub fn nmf(x: &[f64], n_cols: usize, config: &NmfConfig) -> Result<NmfResult> {
    let n_rows = validate_data(x, n_cols)?;
    validate_config(config)?;
    let (w, h) = initialize(x, n_rows, n_cols, config)?;
    Ok(solve(x, n_rows, n_cols, w, h, Updates::Both, config))
}

/// Factorize `x` with one factor frozen.
///
/// The free factor starts from `initial` when given (row-major, same shape as
/// the free factor), otherwise from `config.init`. The frozen factor is
/// returned unchanged in the result.
///
/// # Errors
///
/// As [`nmf`], plus shape or sign errors in the frozen or initial factor.
pub fn nmf_fixed(
    x: &[f64],
    n_cols: usize,
    fixed: FixedFactor<'_>,
    initial: Option<&[f64]>,
    config: &NmfConfig,
) -> Result<NmfResult> {
    let n_rows = validate_data(x, n_cols)?;
    validate_config(config)?;
    let k = config.n_components;

    match fixed {
        FixedFactor::Signal(w) => {
            validate_factor("fixed signal factor", w, n_rows * k)?;
            let h = match initial {
                Some(h0) => {
                    validate_factor("initial mixing factor", h0, k * n_cols)?;
                    h0.to_vec()
                }
                None => initialize(x, n_rows, n_cols, config)?.1,
            };
            Ok(solve(x, n_rows, n_cols, w.to_vec(), h, Updates::MixingOnly, config))
        }
        FixedFactor::Mixing(h) => {
            validate_factor("fixed mixing factor", h, k * n_cols)?;
            let w = match initial {
                Some(w0) => {
                    validate_factor("initial signal factor", w0, n_rows * k)?;
                    w0.to_vec()
                }
                None => initialize(x, n_rows, n_cols, config)?.0,
            };
            Ok(solve(x, n_rows, n_cols, w, h.to_vec(), Updates::SignalOnly, config))
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_data(x: &[f64], n_cols: usize) -> Result<usize> {
    if x.is_empty() {
        return Err(DecodenError::InvalidInput("nmf: empty data".into()));
    }
    if n_cols == 0 {
        return Err(DecodenError::InvalidInput("nmf: n_cols must be > 0".into()));
    }
    if x.len() % n_cols != 0 {
        return Err(DecodenError::InvalidInput(format!(
            "nmf: data length {} not divisible by n_cols {}",
            x.len(),
            n_cols
        )));
    }
    if let Some(idx) = x.iter().position(|v| !v.is_finite() || *v < 0.0) {
        return Err(DecodenError::InvalidInput(format!(
            "nmf: value {} at row {}, column {} is negative or not finite",
            x[idx],
            idx / n_cols,
            idx % n_cols
        )));
    }
    Ok(x.len() / n_cols)
}

fn validate_config(config: &NmfConfig) -> Result<()> {
    if config.n_components == 0 {
        return Err(DecodenError::InvalidInput(
            "nmf: n_components must be > 0".into(),
        ));
    }
    if config.max_iter == 0 {
        return Err(DecodenError::InvalidInput(
            "nmf: max_iter must be > 0".into(),
        ));
    }
    for (name, value) in [
        ("alpha_w", config.alpha_w),
        ("alpha_h", config.alpha_h),
        ("tol", config.tol),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(DecodenError::InvalidInput(format!(
                "nmf: {name} must be finite and >= 0 (got {value})"
            )));
        }
    }
    if !(0.0..=1.0).contains(&config.l1_ratio) {
        return Err(DecodenError::InvalidInput(format!(
            "nmf: l1_ratio must be in [0, 1] (got {})",
            config.l1_ratio
        )));
    }
    match config.init {
        NmfInit::Uniform { high } if !(high.is_finite() && high > 0.0) => {
            Err(DecodenError::InvalidInput(format!(
                "nmf: uniform initialisation needs a positive upper bound (got {high})"
            )))
        }
        NmfInit::Nndsvda if config.n_components != 1 => Err(DecodenError::InvalidInput(
            "nmf: nndsvda initialisation supports a single component".into(),
        )),
        _ => Ok(()),
    }
}

fn validate_factor(what: &str, factor: &[f64], expected_len: usize) -> Result<()> {
    if factor.len() != expected_len {
        return Err(DecodenError::ShapeMismatch(format!(
            "nmf: {what} has {} entries, expected {expected_len}",
            factor.len()
        )));
    }
    if factor.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(DecodenError::InvalidInput(format!(
            "nmf: {what} must be finite and non-negative"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Initialisation
// ---------------------------------------------------------------------------

fn initialize(
    x: &[f64],
    n_rows: usize,
    n_cols: usize,
    config: &NmfConfig,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let k = config.n_components;
    let mean = x.iter().sum::<f64>() / x.len() as f64;
    let avg = (mean / k as f64).sqrt();

    let factors = match config.init {
        NmfInit::Random => {
            let mut rng = StdRng::seed_from_u64(config.seed);
            let h: Vec<f64> = (0..k * n_cols)
                .map(|_| avg * rng.sample::<f64, _>(StandardNormal).abs())
                .collect();
            let w: Vec<f64> = (0..n_rows * k)
                .map(|_| avg * rng.sample::<f64, _>(StandardNormal).abs())
                .collect();
            (w, h)
        }
        NmfInit::Uniform { high } => {
            let mut rng = StdRng::seed_from_u64(config.seed);
            let w: Vec<f64> = (0..n_rows * k).map(|_| rng.gen_range(0.0..high)).collect();
            let h: Vec<f64> = (0..k * n_cols).map(|_| rng.gen_range(0.0..high)).collect();
            (w, h)
        }
        NmfInit::Constant => (vec![avg; n_rows * k], vec![avg; k * n_cols]),
        NmfInit::Nndsvda => nndsvda_rank1(x, n_rows, n_cols, mean),
    };
    Ok(factors)
}

/// Rank-1 NNDSVDa: `W = √σ·|u|`, `H = √σ·|v|` for the leading singular
/// triplet `(σ, u, v)` of `X`, with exact zeros filled by `mean(X)`.
fn nndsvda_rank1(x: &[f64], n_rows: usize, n_cols: usize, mean: f64) -> (Vec<f64>, Vec<f64>) {
    // Gram matrix XᵀX (n_cols × n_cols)
    let mut gram = vec![0.0; n_cols * n_cols];
    for row in x.chunks_exact(n_cols) {
        for i in 0..n_cols {
            for j in i..n_cols {
                let val = row[i] * row[j];
                gram[i * n_cols + j] += val;
                if i != j {
                    gram[j * n_cols + i] += val;
                }
            }
        }
    }

    let (eigenvalue, v) = power_iteration(&gram, n_cols, 1000, 1e-12);
    let sigma = eigenvalue.max(0.0).sqrt();

    let (mut w, mut h) = if sigma > 0.0 {
        let scale = sigma.sqrt();
        let w: Vec<f64> = x
            .chunks_exact(n_cols)
            .map(|row| {
                let u: f64 = row.iter().zip(&v).map(|(a, b)| a * b).sum::<f64>() / sigma;
                scale * u.abs()
            })
            .collect();
        let h: Vec<f64> = v.iter().map(|&vj| scale * vj.abs()).collect();
        (w, h)
    } else {
        (vec![0.0; n_rows], vec![0.0; n_cols])
    };

    for val in w.iter_mut().chain(h.iter_mut()) {
        if *val == 0.0 {
            *val = mean;
        }
    }
    (w, h)
}

/// Power iteration: find the dominant eigenvector of a symmetric matrix.
fn power_iteration(matrix: &[f64], n: usize, max_iter: usize, tol: f64) -> (f64, Vec<f64>) {
    // Deterministic non-zero init
    let mut v: Vec<f64> = (0..n).map(|i| 1.0 / ((i + 1) as f64)).collect();
    let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    for val in v.iter_mut() {
        *val /= norm;
    }

    let mut eigenvalue = 0.0;

    for _ in 0..max_iter {
        // w = M * v
        let mut w = vec![0.0; n];
        for i in 0..n {
            w[i] = (0..n).map(|j| matrix[i * n + j] * v[j]).sum();
        }

        let new_eigenvalue: f64 = v.iter().zip(w.iter()).map(|(a, b)| a * b).sum();

        let wnorm: f64 = w.iter().map(|x| x * x).sum::<f64>().sqrt();
        if wnorm == 0.0 {
            break;
        }
        for val in w.iter_mut() {
            *val /= wnorm;
        }

        let diff: f64 = v
            .iter()
            .zip(w.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();

        v = w;
        eigenvalue = new_eigenvalue;

        if diff < tol {
            break;
        }
    }

    (eigenvalue, v)
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum Updates {
    Both,
    SignalOnly,
    MixingOnly,
}

/// Penalty weights after scaling by the matrix dimensions.
struct Regularization {
    l1_w: f64,
    l2_w: f64,
    l1_h: f64,
    l2_h: f64,
}

impl Regularization {
    fn new(n_rows: usize, n_cols: usize, config: &NmfConfig) -> Self {
        let w_scale = n_cols as f64 * config.alpha_w;
        let h_scale = n_rows as f64 * config.alpha_h;
        Self {
            l1_w: w_scale * config.l1_ratio,
            l2_w: w_scale * (1.0 - config.l1_ratio),
            l1_h: h_scale * config.l1_ratio,
            l2_h: h_scale * (1.0 - config.l1_ratio),
        }
    }
}

fn solve(
    x: &[f64],
    n_rows: usize,
    n_cols: usize,
    mut w: Vec<f64>,
    mut h: Vec<f64>,
    updates: Updates,
    config: &NmfConfig,
) -> NmfResult {
    let k = config.n_components;
    let reg = Regularization::new(n_rows, n_cols, config);
    let mut ratio = vec![0.0; n_rows * n_cols];

    let error_at_init = kl_error(x, &w, &h, n_rows, n_cols, k);
    let mut previous_error = error_at_init;
    let mut converged = config.tol == 0.0;
    let mut n_iter = 0;

    for iter in 1..=config.max_iter {
        n_iter = iter;

        if updates != Updates::MixingOnly {
            fill_ratio(x, &w, &h, &mut ratio, n_rows, n_cols, k);
            update_signal(&mut w, &h, &ratio, n_rows, n_cols, k, &reg);
        }
        if updates != Updates::SignalOnly {
            fill_ratio(x, &w, &h, &mut ratio, n_rows, n_cols, k);
            update_mixing(&w, &mut h, &ratio, n_rows, n_cols, k, &reg);
        }

        if config.tol > 0.0 && iter % 10 == 0 {
            let error = kl_error(x, &w, &h, n_rows, n_cols, k);
            if error_at_init <= 0.0 || (previous_error - error) / error_at_init < config.tol {
                converged = true;
                break;
            }
            previous_error = error;
        }
    }

    let reconstruction_err = kl_error(x, &w, &h, n_rows, n_cols, k);
    log::trace!(
        "nmf {}x{} k={}: {} iterations, error {:.4e}",
        n_rows,
        n_cols,
        k,
        n_iter,
        reconstruction_err
    );

    NmfResult {
        w,
        h,
        n_rows,
        n_cols,
        n_components: k,
        n_iter,
        reconstruction_err,
        converged,
    }
}

/// `ratio[i,j] = X[i,j] / (WH)[i,j]` where `X` is positive, zero elsewhere.
fn fill_ratio(
    x: &[f64],
    w: &[f64],
    h: &[f64],
    ratio: &mut [f64],
    n_rows: usize,
    n_cols: usize,
    k: usize,
) {
    for i in 0..n_rows {
        let w_row = &w[i * k..(i + 1) * k];
        for j in 0..n_cols {
            let idx = i * n_cols + j;
            ratio[idx] = if x[idx] > 0.0 {
                let wh: f64 = (0..k).map(|c| w_row[c] * h[c * n_cols + j]).sum();
                x[idx] / wh.max(EPSILON)
            } else {
                0.0
            };
        }
    }
}

// W <- W .* (ratio · Hᵀ) ./ (1 · Hᵀ + l1_w + l2_w·W)
fn update_signal(
    w: &mut [f64],
    h: &[f64],
    ratio: &[f64],
    n_rows: usize,
    n_cols: usize,
    k: usize,
    reg: &Regularization,
) {
    let h_sums: Vec<f64> = (0..k)
        .map(|c| h[c * n_cols..(c + 1) * n_cols].iter().sum())
        .collect();

    for i in 0..n_rows {
        let r = &ratio[i * n_cols..(i + 1) * n_cols];
        for c in 0..k {
            let h_row = &h[c * n_cols..(c + 1) * n_cols];
            let numerator: f64 = r.iter().zip(h_row).map(|(a, b)| a * b).sum();
            let idx = i * k + c;
            let mut denominator = h_sums[c] + reg.l1_w + reg.l2_w * w[idx];
            if denominator == 0.0 {
                denominator = EPSILON;
            }
            w[idx] *= numerator / denominator;
        }
    }
}

// H <- H .* (Wᵀ · ratio) ./ (Wᵀ · 1 + l1_h + l2_h·H)
fn update_mixing(
    w: &[f64],
    h: &mut [f64],
    ratio: &[f64],
    n_rows: usize,
    n_cols: usize,
    k: usize,
    reg: &Regularization,
) {
    let mut numerator = vec![0.0; k * n_cols];
    let mut w_sums = vec![0.0; k];
    for i in 0..n_rows {
        let r = &ratio[i * n_cols..(i + 1) * n_cols];
        for c in 0..k {
            let wic = w[i * k + c];
            w_sums[c] += wic;
            if wic == 0.0 {
                continue;
            }
            let num_row = &mut numerator[c * n_cols..(c + 1) * n_cols];
            for (acc, &rv) in num_row.iter_mut().zip(r) {
                *acc += wic * rv;
            }
        }
    }

    for c in 0..k {
        for j in 0..n_cols {
            let idx = c * n_cols + j;
            let mut denominator = w_sums[c] + reg.l1_h + reg.l2_h * h[idx];
            if denominator == 0.0 {
                denominator = EPSILON;
            }
            h[idx] *= numerator[idx] / denominator;
        }
    }
}

/// `sqrt(2·D(X ‖ WH))` with the generalized Kullback–Leibler divergence.
fn kl_error(x: &[f64], w: &[f64], h: &[f64], n_rows: usize, n_cols: usize, k: usize) -> f64 {
    let mut divergence = 0.0;
    for i in 0..n_rows {
        let w_row = &w[i * k..(i + 1) * k];
        for j in 0..n_cols {
            let wh: f64 = (0..k).map(|c| w_row[c] * h[c * n_cols + j]).sum();
            let xv = x[i * n_cols + j];
            if xv > 0.0 {
                divergence += xv * (xv / wh.max(EPSILON)).ln() - xv;
            }
            divergence += wh;
        }
    }
    (2.0 * divergence.max(0.0)).sqrt()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
