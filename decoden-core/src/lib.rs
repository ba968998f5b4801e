//! Shared primitives for the DecoDen signal-denoising workspace.
//!
//! `decoden-core` provides the foundation that the other crates build on:
//!
//! - **Error types**: [`DecodenError`] and [`Result`] for structured error handling
//! - **Traits**: [`Summarizable`] for one-line run and matrix summaries

pub mod error;
pub mod traits;

pub use error::{DecodenError, Result};
pub use traits::*;
