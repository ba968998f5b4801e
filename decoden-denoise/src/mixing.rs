//! The mixing matrix: per-sample weights of every latent component.

use decoden_core::{DecodenError, Result, Summarizable};
use decoden_omics::ConditionLayout;

use crate::specific::SpecificComponent;

/// Row label of the shared background component.
pub const BACKGROUND_LABEL: &str = "background";

/// Components × samples non-negative weight matrix, row-major.
///
/// Row 0 is the background and has a weight for every sample; row `k > 0`
/// belongs to treatment condition `k` and is zero outside that condition's
/// columns.
#[derive(Debug, Clone, PartialEq)]
pub struct MixingMatrix {
    data: Vec<f64>,
    row_labels: Vec<String>,
    sample_names: Vec<String>,
}

impl MixingMatrix {
    /// Create a mixing matrix from flat row-major weights.
    pub fn new(row_labels: Vec<String>, sample_names: Vec<String>, data: Vec<f64>) -> Result<Self> {
        if row_labels.is_empty() {
            return Err(DecodenError::InvalidInput(
                "mixing matrix needs at least one component".into(),
            ));
        }
        if data.len() != row_labels.len() * sample_names.len() {
            return Err(DecodenError::ShapeMismatch(format!(
                "mixing matrix data length ({}) does not match {} components \u{00d7} {} samples",
                data.len(),
                row_labels.len(),
                sample_names.len()
            )));
        }
        if let Some(v) = data.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(DecodenError::InvalidInput(format!(
                "mixing matrix weight {v} is negative or not finite"
            )));
        }
        Ok(Self {
            data,
            row_labels,
            sample_names,
        })
    }

    /// Place the background coefficients in row 0 and each specific
    /// component in its own row at its condition's columns.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the coefficients disagree with `layout`.
    pub fn assemble(
        layout: &ConditionLayout,
        background: &[f64],
        specific: &[SpecificComponent],
    ) -> Result<Self> {
        let n_samples = layout.n_samples();
        if background.len() != n_samples {
            return Err(DecodenError::ShapeMismatch(format!(
                "{} background coefficients for {n_samples} samples",
                background.len()
            )));
        }
        if specific.len() != layout.n_treatments() {
            return Err(DecodenError::ShapeMismatch(format!(
                "{} specific components for {} treatment conditions",
                specific.len(),
                layout.n_treatments()
            )));
        }

        let n_rows = 1 + specific.len();
        let mut data = vec![0.0; n_rows * n_samples];
        data[..n_samples].copy_from_slice(background);

        let mut row_labels = Vec::with_capacity(n_rows);
        row_labels.push(BACKGROUND_LABEL.to_string());

        for (k, (component, (label, columns))) in specific.iter().zip(layout.treatments()).enumerate() {
            if component.label != label || component.columns != columns {
                return Err(DecodenError::ShapeMismatch(format!(
                    "specific component '{}' at columns {:?} does not match condition '{label}' at {columns:?}",
                    component.label, component.columns
                )));
            }
            if component.coefficients.len() != columns.len() {
                return Err(DecodenError::ShapeMismatch(format!(
                    "condition '{label}' has {} replicates but {} coefficients",
                    columns.len(),
                    component.coefficients.len()
                )));
            }
            let start = (k + 1) * n_samples;
            data[start + columns.start..start + columns.end].copy_from_slice(&component.coefficients);
            row_labels.push(label.to_string());
        }

        Self::new(row_labels, layout.sample_names().to_vec(), data)
    }

    /// (n_components, n_samples).
    pub fn shape(&self) -> (usize, usize) {
        (self.row_labels.len(), self.sample_names.len())
    }

    /// Number of components (rows).
    pub fn n_components(&self) -> usize {
        self.row_labels.len()
    }

    /// Number of samples (columns).
    pub fn n_samples(&self) -> usize {
        self.sample_names.len()
    }

    /// Weight of component `row` in sample `col`.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let (n_rows, n_cols) = self.shape();
        if row < n_rows && col < n_cols {
            Some(self.data[row * n_cols + col])
        } else {
            None
        }
    }

    /// Weights of one component across all samples.
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        let n = self.n_samples();
        if row < self.n_components() {
            Some(&self.data[row * n..(row + 1) * n])
        } else {
            None
        }
    }

    /// Background weight of every sample.
    pub fn background(&self) -> &[f64] {
        &self.data[..self.n_samples()]
    }

    /// Component labels: `background`, then treatment conditions.
    pub fn row_labels(&self) -> &[String] {
        &self.row_labels
    }

    /// Sample names, in coverage-matrix column order.
    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }

    /// Flat row-major weights.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

impl Summarizable for MixingMatrix {
    fn summary(&self) -> String {
        format!(
            "MixingMatrix: {} components \u{00d7} {} samples",
            self.n_components(),
            self.n_samples()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::FitReport;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn layout() -> ConditionLayout {
        ConditionLayout::from_sample_names(
            names(&["control_1", "control_2", "a_1", "a_2", "b_1"]),
            names(&["control", "a", "b"]),
        )
        .unwrap()
    }

    fn component(label: &str, columns: std::ops::Range<usize>, coefficients: Vec<f64>) -> SpecificComponent {
        SpecificComponent {
            label: label.into(),
            columns,
            coefficients,
            report: FitReport {
                n_iter: 10,
                residual: 0.0,
                converged: true,
            },
        }
    }

    #[test]
    fn assemble_places_blocks() {
        let mm = MixingMatrix::assemble(
            &layout(),
            &[1.0, 1.1, 0.9, 1.2, 0.8],
            &[
                component("a", 2..4, vec![2.0, 3.0]),
                component("b", 4..5, vec![4.0]),
            ],
        )
        .unwrap();
        assert_eq!(mm.shape(), (3, 5));
        assert_eq!(mm.row_labels(), &names(&["background", "a", "b"])[..]);
        assert_eq!(mm.row(1), Some(&[0.0, 0.0, 2.0, 3.0, 0.0][..]));
        assert_eq!(mm.row(2), Some(&[0.0, 0.0, 0.0, 0.0, 4.0][..]));
        assert_eq!(mm.background(), &[1.0, 1.1, 0.9, 1.2, 0.8]);
        assert_eq!(mm.get(0, 4), Some(0.8));
        assert_eq!(mm.get(3, 0), None);
        assert_eq!(mm.summary(), "MixingMatrix: 3 components \u{00d7} 5 samples");
    }

    #[test]
    fn assemble_rejects_mismatches() {
        let l = layout();
        let good = vec![
            component("a", 2..4, vec![2.0, 3.0]),
            component("b", 4..5, vec![4.0]),
        ];
        assert!(MixingMatrix::assemble(&l, &[1.0; 4], &good).is_err());
        assert!(MixingMatrix::assemble(&l, &[1.0; 5], &good[..1]).is_err());
        let swapped = vec![good[1].clone(), good[0].clone()];
        assert!(MixingMatrix::assemble(&l, &[1.0; 5], &swapped).is_err());
        let short = vec![component("a", 2..4, vec![2.0]), good[1].clone()];
        assert!(MixingMatrix::assemble(&l, &[1.0; 5], &short).is_err());
    }

    #[test]
    fn new_rejects_negative_weights() {
        assert!(MixingMatrix::new(names(&["background"]), names(&["s"]), vec![-1.0]).is_err());
        assert!(MixingMatrix::new(names(&["background"]), names(&["s"]), vec![1.0, 2.0]).is_err());
        assert!(MixingMatrix::new(vec![], vec![], vec![]).is_err());
    }
}
