//! End-to-end denoising runs.

use decoden_core::{DecodenError, Result, Summarizable};
use decoden_omics::{BinMask, BinMatrix, ConditionLayout};
use decoden_stats::OriginFit;

use crate::background::extract_background;
use crate::config::DenoiseConfig;
use crate::diagnostic::Diagnostic;
use crate::hsr::{run_hsr, run_hsr_replicates, HsrOutput};
use crate::mixing::MixingMatrix;
use crate::projector::ChunkProjector;
use crate::propagate::propagate_background;
use crate::sampler::select_training_bins;
use crate::specific::extract_specific;

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct DenoiseOutput {
    /// Components × samples weights.
    pub mixing: MixingMatrix,
    /// Bins × conditions signal.
    pub signal: BinMatrix,
    /// Bins × (2 per track) HSR table.
    pub hsr: BinMatrix,
    /// HSR fit of every track.
    pub fits: Vec<(String, OriginFit)>,
    /// Warnings raised along the way.
    pub diagnostics: Vec<Diagnostic>,
}

impl Summarizable for DenoiseOutput {
    fn summary(&self) -> String {
        format!(
            "DecoDen: {} bins, {} components \u{00d7} {} samples, {} HSR track(s), {} warning(s)",
            self.signal.n_bins(),
            self.mixing.n_components(),
            self.mixing.n_samples(),
            self.fits.len(),
            self.diagnostics.len()
        )
    }
}

/// The denoising engine.
///
/// ```no_run
/// # use decoden_denoise::{Decoden, DenoiseConfig};
/// # use decoden_omics::{BinMask, BinMatrix, ConditionLayout};
/// # fn run(coverage: &BinMatrix, layout: &ConditionLayout) -> decoden_core::Result<()> {
/// let engine = Decoden::new(DenoiseConfig::default())?;
/// let mask = BinMask::all_usable(coverage.n_bins());
/// let output = engine.run_consolidated(coverage, layout, &mask)?;
/// println!("{}", output.mixing.row_labels().join(", "));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Decoden {
    config: DenoiseConfig,
}

impl Decoden {
    /// Create an engine with a validated configuration.
    pub fn new(config: DenoiseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The run configuration.
    pub fn config(&self) -> &DenoiseConfig {
        &self.config
    }

    /// Learn the mixing matrix from a sampled training set.
    pub fn extract_mixing_matrix(
        &self,
        coverage: &BinMatrix,
        layout: &ConditionLayout,
    ) -> Result<(MixingMatrix, Vec<Diagnostic>)> {
        check_inputs(coverage, layout, None)?;
        let config = &self.config;

        let training = select_training_bins(
            coverage,
            layout,
            config.control_cov_threshold,
            config.n_train_bins,
            config.seed,
        )?;
        let background = extract_background(&training.matrix, layout, config)?;
        let coefficients = propagate_background(&training.matrix, layout, &background, config)?;
        let specific = extract_specific(
            &training.matrix,
            layout,
            &background.signal,
            &coefficients.coefficients,
            config,
        )?;

        let mut diagnostics: Vec<Diagnostic> = [
            Diagnostic::check_convergence("background", &background.report),
            Diagnostic::check_convergence("background propagation", &coefficients.report),
        ]
        .into_iter()
        .flatten()
        .collect();
        diagnostics.extend(specific.iter().filter_map(|component| {
            Diagnostic::check_convergence(format!("specific '{}'", component.label), &component.report)
        }));

        let mixing = MixingMatrix::assemble(layout, &coefficients.coefficients, &specific)?;
        Ok((mixing, diagnostics.into_iter().map(Diagnostic::emit).collect()))
    }

    /// Project the full coverage matrix onto `mixing`, chunk by chunk.
    pub fn extract_signal(
        &self,
        coverage: &BinMatrix,
        mixing: &MixingMatrix,
        layout: &ConditionLayout,
    ) -> Result<(BinMatrix, Vec<Diagnostic>)> {
        let projection = ChunkProjector::new(coverage, mixing, layout, &self.config)?.project()?;
        let diagnostics = projection
            .chunks
            .iter()
            .filter_map(|(bins, report)| {
                Diagnostic::check_convergence(
                    format!("projection of bins {}..{}", bins.start, bins.end),
                    report,
                )
            })
            .map(Diagnostic::emit)
            .collect();
        Ok((projection.signal, diagnostics))
    }

    /// Factorize, project, and rescale each treatment condition's pooled
    /// signal.
    pub fn run_consolidated(
        &self,
        coverage: &BinMatrix,
        layout: &ConditionLayout,
        mask: &BinMask,
    ) -> Result<DenoiseOutput> {
        check_inputs(coverage, layout, Some(mask))?;
        let (mixing, mut diagnostics) = self.extract_mixing_matrix(coverage, layout)?;
        let (signal, projection_diagnostics) = self.extract_signal(coverage, &mixing, layout)?;
        diagnostics.extend(projection_diagnostics);

        let hsr = run_hsr(&signal, mask, layout, &self.config)?;
        Ok(finish(mixing, signal, hsr, diagnostics))
    }

    /// Factorize, project, and rescale each treatment replicate separately.
    pub fn run_replicates(
        &self,
        coverage: &BinMatrix,
        layout: &ConditionLayout,
        mask: &BinMask,
    ) -> Result<DenoiseOutput> {
        check_inputs(coverage, layout, Some(mask))?;
        let (mixing, mut diagnostics) = self.extract_mixing_matrix(coverage, layout)?;
        let (signal, projection_diagnostics) = self.extract_signal(coverage, &mixing, layout)?;
        diagnostics.extend(projection_diagnostics);

        let hsr = run_hsr_replicates(coverage, &signal, &mixing, mask, layout, &self.config)?;
        Ok(finish(mixing, signal, hsr, diagnostics))
    }
}

fn check_inputs(
    coverage: &BinMatrix,
    layout: &ConditionLayout,
    mask: Option<&BinMask>,
) -> Result<()> {
    layout.check_columns(coverage.column_names())?;
    if layout.n_treatments() == 0 {
        return Err(DecodenError::InvalidInput(
            "at least one treatment condition is required".into(),
        ));
    }
    if !coverage.is_non_negative() {
        return Err(DecodenError::InvalidInput(
            "coverage matrix contains negative or non-finite values".into(),
        ));
    }
    if let Some(mask) = mask {
        mask.check_aligned(coverage.n_bins())?;
    }
    Ok(())
}

fn finish(
    mixing: MixingMatrix,
    signal: BinMatrix,
    hsr: HsrOutput,
    mut diagnostics: Vec<Diagnostic>,
) -> DenoiseOutput {
    diagnostics.extend(hsr.diagnostics);
    let output = DenoiseOutput {
        mixing,
        signal,
        hsr: hsr.table,
        fits: hsr.fits,
        diagnostics,
    };
    log::info!("{}", output.summary());
    output
}
