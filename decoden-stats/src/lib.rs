//! Statistical helpers for the DecoDen workspace.
//!
//! - **Order statistics**: the median that selects HSR fit bins
//! - **Regression**: through-origin least squares used by HSR rescaling

pub mod descriptive;
pub mod regression;

pub use descriptive::median;
pub use regression::{fit_through_origin, OriginFit};
