//! Training-bin selection.
//!
//! Bins where no control replicate rises above the coverage threshold carry
//! almost no information about the background, so the factorization is
//! trained on a fixed-size random subset of the bins that do.

use decoden_core::{DecodenError, Result};
use decoden_omics::{BinMatrix, ConditionLayout};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// The sampled training subset.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    /// Training rows, all sample columns, in genomic order.
    pub matrix: BinMatrix,
    /// Row index of each training bin in the full coverage matrix (ascending).
    pub indices: Vec<usize>,
    /// Number of bins that passed the control-coverage filter.
    pub n_qualifying: usize,
}

/// Indices of bins where any control replicate exceeds `threshold`.
pub fn qualifying_bins(
    coverage: &BinMatrix,
    layout: &ConditionLayout,
    threshold: f64,
) -> Vec<usize> {
    let control = layout.control_range();
    (0..coverage.n_bins())
        .filter(|&i| {
            coverage
                .row(i)
                .map(|row| row[control.clone()].iter().any(|&v| v > threshold))
                .unwrap_or(false)
        })
        .collect()
}

/// Draw `n` training bins uniformly without replacement from the qualifying
/// bins, using a generator seeded with `seed`.
///
/// # Errors
///
/// `InsufficientData` if fewer than `n` bins qualify, `InvalidInput` if `n`
/// is zero, and `ShapeMismatch` if the layout does not describe `coverage`.
pub fn select_training_bins(
    coverage: &BinMatrix,
    layout: &ConditionLayout,
    threshold: f64,
    n: usize,
    seed: u64,
) -> Result<TrainingSet> {
    layout.check_columns(coverage.column_names())?;
    if n == 0 {
        return Err(DecodenError::InvalidInput(
            "training set size must be > 0".into(),
        ));
    }

    let candidates = qualifying_bins(coverage, layout, threshold);
    if candidates.len() < n {
        return Err(DecodenError::InsufficientData {
            requested: n,
            available: candidates.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = rand::seq::index::sample(&mut rng, candidates.len(), n)
        .into_iter()
        .map(|k| candidates[k])
        .collect();
    indices.sort_unstable();

    log::info!(
        "training set: {} of {} bins pass the control coverage threshold {}, sampled {}",
        candidates.len(),
        coverage.n_bins(),
        threshold,
        n
    );

    let matrix = coverage.select_rows(&indices)?;
    Ok(TrainingSet {
        matrix,
        indices,
        n_qualifying: candidates.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use decoden_omics::GenomicInterval;

    fn fixture() -> (BinMatrix, ConditionLayout) {
        let names: Vec<String> = ["control_1", "control_2", "t_1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        // Control coverage above 0.5 in every even bin
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let c = if i % 2 == 0 { 1.0 + i as f64 } else { 0.2 };
                vec![c, 0.0, 5.0]
            })
            .collect();
        let matrix =
            BinMatrix::from_rows(GenomicInterval::tiles("chr1", 0, 2000, 100), names.clone(), rows)
                .unwrap();
        let layout =
            ConditionLayout::from_sample_names(names, vec!["control".into(), "t".into()]).unwrap();
        (matrix, layout)
    }

    #[test]
    fn filters_on_any_control_column() {
        let (m, layout) = fixture();
        let q = qualifying_bins(&m, &layout, 0.5);
        assert_eq!(q, (0..20).step_by(2).collect::<Vec<_>>());
    }

    #[test]
    fn samples_requested_size_sorted() {
        let (m, layout) = fixture();
        let set = select_training_bins(&m, &layout, 0.5, 6, 42).unwrap();
        assert_eq!(set.indices.len(), 6);
        assert_eq!(set.matrix.n_bins(), 6);
        assert_eq!(set.n_qualifying, 10);
        assert!(set.indices.windows(2).all(|w| w[0] < w[1]));
        assert!(set.indices.iter().all(|i| i % 2 == 0));
        for (row, &idx) in set.indices.iter().enumerate() {
            assert_eq!(set.matrix.row(row), m.row(idx));
        }
    }

    #[test]
    fn deterministic_given_seed() {
        let (m, layout) = fixture();
        let a = select_training_bins(&m, &layout, 0.5, 5, 7).unwrap();
        let b = select_training_bins(&m, &layout, 0.5, 5, 7).unwrap();
        assert_eq!(a.indices, b.indices);
    }

    #[test]
    fn all_qualifying_bins_when_n_matches() {
        let (m, layout) = fixture();
        let set = select_training_bins(&m, &layout, 0.5, 10, 1).unwrap();
        assert_eq!(set.indices, (0..20).step_by(2).collect::<Vec<_>>());
    }

    #[test]
    fn too_few_qualifying_bins() {
        let (m, layout) = fixture();
        let err = select_training_bins(&m, &layout, 0.5, 11, 0).unwrap_err();
        assert!(matches!(
            err,
            DecodenError::InsufficientData {
                requested: 11,
                available: 10
            }
        ));
    }

    #[test]
    fn zero_request_rejected() {
        let (m, layout) = fixture();
        assert!(select_training_bins(&m, &layout, 0.5, 0, 0).is_err());
    }
}
