//! Data model for binned multi-condition coverage experiments.
//!
//! - **Genomic coordinates**: [`GenomicInterval`], the half-open bins of a
//!   tiled genome
//! - **Bin matrices**: dense [`BinMatrix`] (bins × named columns), used for
//!   coverage, per-condition signal and normalized output tables
//! - **Blacklist masks**: [`BinMask`], the per-bin usable flag
//! - **Condition layouts**: [`ConditionLayout`], a validated map from
//!   condition labels to their replicate columns
//!
//! # Quick start
//!
//! ```
//! use decoden_omics::{BinMatrix, GenomicInterval};
//! use decoden_core::Summarizable;
//!
//! let bins = GenomicInterval::tiles("chr1", 0, 200, 100);
//! let matrix = BinMatrix::from_rows(
//!     bins,
//!     vec!["control_1".into(), "H3K4me3_1".into()],
//!     vec![vec![1.0, 2.0], vec![3.0, 4.0]],
//! ).unwrap();
//!
//! assert_eq!(matrix.shape(), (2, 2));
//! assert_eq!(matrix.get(0, 1), Some(2.0));
//! assert_eq!(matrix.summary(), "BinMatrix: 2 bins \u{00d7} 2 columns");
//! ```

pub mod genomic;
pub mod layout;
pub mod mask;
pub mod matrix;

pub use genomic::GenomicInterval;
pub use layout::ConditionLayout;
pub use mask::BinMask;
pub use matrix::BinMatrix;
