//! Chunked projection of the full coverage matrix onto the mixing matrix.
//!
//! The mixing matrix is fixed and only the per-bin signal is solved for, so
//! every bin is independent of every other. The coverage matrix is cut into
//! contiguous row chunks of at most `chunk_size` bins, each chunk is
//! factorized on its own, and the chunk results are stitched back together in
//! genomic order. Peak memory is bounded by one chunk per worker.
//!
//! The free factor of each bin is initialised from a generator seeded with
//! `seed + bin_index`, so a bin starts from the same point whatever chunk it
//! lands in.

use std::ops::Range;

use decoden_core::{DecodenError, Result};
use decoden_ml::{nmf_fixed, FixedFactor, NmfConfig, NmfInit};
use decoden_omics::{BinMatrix, ConditionLayout};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::DenoiseConfig;
use crate::diagnostic::FitReport;
use crate::mixing::MixingMatrix;

/// Upper bound of the uniform initialisation of the per-bin signal.
const INIT_HIGH: f64 = 0.1;

/// Signal recovered for one row chunk.
#[derive(Debug, Clone)]
pub struct ProjectedChunk {
    /// Bin range of the chunk in the full coverage matrix.
    pub bins: Range<usize>,
    /// Row-major `bins.len() × n_components` signal.
    pub signal: Vec<f64>,
    pub report: FitReport,
}

/// Full projection result.
#[derive(Debug, Clone)]
pub struct Projection {
    /// Bins × conditions signal matrix.
    pub signal: BinMatrix,
    /// Fit outcome of every chunk, in bin order.
    pub chunks: Vec<(Range<usize>, FitReport)>,
}

/// Projects coverage onto a fixed mixing matrix, one chunk at a time.
#[derive(Debug, Clone)]
pub struct ChunkProjector<'a> {
    coverage: &'a BinMatrix,
    mixing: &'a MixingMatrix,
    column_labels: Vec<String>,
    chunk_size: usize,
    seed: u64,
    nmf_config: NmfConfig,
}

impl<'a> ChunkProjector<'a> {
    /// Set up a projector. The signal columns are labelled with the
    /// layout's conditions list.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the mixing matrix and coverage columns disagree, or
    /// the mixing matrix does not have one row per condition.
    pub fn new(
        coverage: &'a BinMatrix,
        mixing: &'a MixingMatrix,
        layout: &ConditionLayout,
        config: &DenoiseConfig,
    ) -> Result<Self> {
        layout.check_columns(coverage.column_names())?;
        if mixing.sample_names() != coverage.column_names() {
            return Err(DecodenError::ShapeMismatch(
                "mixing matrix samples do not match the coverage columns".into(),
            ));
        }
        if mixing.n_components() != layout.n_conditions() {
            return Err(DecodenError::ShapeMismatch(format!(
                "mixing matrix has {} components for {} conditions",
                mixing.n_components(),
                layout.n_conditions()
            )));
        }
        if config.chunk_size == 0 {
            return Err(DecodenError::Config("chunk_size must be > 0".into()));
        }

        let nmf_config = NmfConfig {
            n_components: mixing.n_components(),
            alpha_w: config.alpha_w,
            alpha_h: 0.0,
            l1_ratio: config.l1_ratio,
            max_iter: config.projection_max_iter,
            tol: config.tol,
            seed: config.seed,
            init: NmfInit::Uniform { high: INIT_HIGH },
        };

        Ok(Self {
            coverage,
            mixing,
            column_labels: layout.conditions().to_vec(),
            chunk_size: config.chunk_size,
            seed: config.seed,
            nmf_config,
        })
    }

    /// Number of non-empty chunks.
    pub fn n_chunks(&self) -> usize {
        self.coverage.n_bins().div_ceil(self.chunk_size)
    }

    /// Bin range of chunk `idx`, or `None` past the last non-empty chunk.
    pub fn chunk_range(&self, idx: usize) -> Option<Range<usize>> {
        let n_bins = self.coverage.n_bins();
        let start = idx.checked_mul(self.chunk_size)?;
        if start >= n_bins {
            return None;
        }
        Some(start..(start + self.chunk_size).min(n_bins))
    }

    /// Solve the signal of the bins in `bins`.
    pub fn project_chunk(&self, bins: Range<usize>) -> Result<ProjectedChunk> {
        let block = self
            .coverage
            .row_block(bins.clone())
            .filter(|block| !block.is_empty())
            .ok_or_else(|| {
                DecodenError::InvalidInput(format!(
                    "chunk {bins:?} is empty or outside the {} bins",
                    self.coverage.n_bins()
                ))
            })?;

        let k = self.mixing.n_components();
        let initial: Vec<f64> = bins
            .clone()
            .flat_map(|bin| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(bin as u64));
                (0..k)
                    .map(|_| rng.gen_range(0.0..INIT_HIGH))
                    .collect::<Vec<_>>()
            })
            .collect();

        let fit = nmf_fixed(
            block,
            self.mixing.n_samples(),
            FixedFactor::Mixing(self.mixing.as_slice()),
            Some(&initial),
            &self.nmf_config,
        )?;
        let report = FitReport::from(&fit);
        log::debug!(
            "projected bins {}..{}: {} iterations, residual {:.4e}",
            bins.start,
            bins.end,
            report.n_iter,
            report.residual
        );

        Ok(ProjectedChunk {
            bins,
            signal: fit.w,
            report,
        })
    }

    /// Lazy sequence of chunk results, in bin order.
    pub fn chunks(&self) -> Chunks<'_, 'a> {
        Chunks {
            projector: self,
            next: 0,
        }
    }

    /// Project every chunk and assemble the signal matrix.
    pub fn project(&self) -> Result<Projection> {
        #[cfg(feature = "parallel")]
        let results: Vec<ProjectedChunk> = {
            use rayon::prelude::*;
            (0..self.n_chunks())
                .into_par_iter()
                .filter_map(|idx| self.chunk_range(idx))
                .map(|bins| self.project_chunk(bins))
                .collect::<Result<_>>()?
        };
        #[cfg(not(feature = "parallel"))]
        let results: Vec<ProjectedChunk> = self.chunks().collect::<Result<_>>()?;

        let mut data = Vec::with_capacity(self.coverage.n_bins() * self.mixing.n_components());
        let mut chunks = Vec::with_capacity(results.len());
        for chunk in results {
            data.extend_from_slice(&chunk.signal);
            chunks.push((chunk.bins, chunk.report));
        }
        log::info!(
            "projected {} bins in {} chunk(s) onto {} components",
            self.coverage.n_bins(),
            chunks.len(),
            self.mixing.n_components()
        );

        let signal = BinMatrix::new(
            self.coverage.bins().to_vec(),
            self.column_labels.clone(),
            data,
        )?;
        Ok(Projection { signal, chunks })
    }
}

/// Iterator over projected chunks. See [`ChunkProjector::chunks`].
#[derive(Debug)]
pub struct Chunks<'p, 'a> {
    projector: &'p ChunkProjector<'a>,
    next: usize,
}

impl Iterator for Chunks<'_, '_> {
    type Item = Result<ProjectedChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        let bins = self.projector.chunk_range(self.next)?;
        self.next += 1;
        Some(self.projector.project_chunk(bins))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.projector.n_chunks().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}
