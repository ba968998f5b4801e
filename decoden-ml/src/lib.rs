//! Matrix factorization primitives for the DecoDen workspace.
//!
//! - **NMF**: non-negative matrix factorization under the generalized
//!   Kullback–Leibler divergence, solved with multiplicative updates and
//!   elastic-net regularization on both factors
//! - **Frozen-factor NMF**: the same solver with one factor held fixed, used
//!   to project new data onto known signals or known mixing weights

pub mod nmf;

pub use nmf::{nmf, nmf_fixed, FixedFactor, NmfConfig, NmfInit, NmfResult};
