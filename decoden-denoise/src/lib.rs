//! Signal decomposition and normalization for multi-condition coverage
//! tracks.
//!
//! The engine separates a shared background signal from condition-specific
//! signal in a bins × samples coverage matrix, then rescales each treatment
//! against the control:
//!
//! 1. [`sampler`] draws a training set of bins with control coverage.
//! 2. [`background`] fits a rank-1 background on the control replicates.
//! 3. [`propagate`] solves the background weight of every treatment replicate
//!    with the background signal frozen.
//! 4. [`specific`] fits one rank-1 component per treatment condition on what
//!    the background leaves behind.
//! 5. [`mixing`] assembles the components × samples [`MixingMatrix`].
//! 6. [`projector`] projects the full coverage matrix onto the mixing matrix,
//!    chunk by chunk, into a bins × conditions signal matrix.
//! 7. [`hsr`] rescales treatment signal against the control on high-signal
//!    bins, pooled per condition or per replicate.
//!
//! [`Decoden`] runs the whole chain.
//!
//! # Features
//!
//! - `parallel`: chunks, per-condition fits and HSR tracks run on the rayon
//!   thread pool. Results are identical to the sequential build.

pub mod background;
pub mod config;
pub mod diagnostic;
pub mod hsr;
pub mod mixing;
pub mod pipeline;
pub mod projector;
pub mod propagate;
pub mod sampler;
pub mod specific;

pub use background::{extract_background, Background};
pub use config::DenoiseConfig;
pub use diagnostic::{Diagnostic, FitReport};
pub use hsr::{
    log_floor, normalize_track, run_hsr, run_hsr_replicates, select_fit_bins, HsrOutput,
    HsrTrack, FIT_SUFFIX, HSR_VALUE_SUFFIX,
};
pub use mixing::{MixingMatrix, BACKGROUND_LABEL};
pub use pipeline::{Decoden, DenoiseOutput};
pub use projector::{ChunkProjector, Chunks, ProjectedChunk, Projection};
pub use propagate::{propagate_background, BackgroundCoefficients};
pub use sampler::{qualifying_bins, select_training_bins, TrainingSet};
pub use specific::{background_residual, extract_specific, SpecificComponent};
