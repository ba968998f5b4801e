//! File formats for DecoDen runs.
//!
//! - **Experiment reference**: the `experiment_conditions.json` map from a
//!   tiled track to its condition label ([`reference`])
//! - **Tiled bedGraph**: per-sample coverage on a fixed bin grid, assembled
//!   into a [`BinMatrix`](decoden_omics::BinMatrix) ([`tracks`])
//! - **BED blacklist**: regions excluded from HSR fitting ([`blacklist`])
//! - **TSV / bedGraph output**: mixing matrix, signal matrix and HSR tracks
//!   ([`write`])

pub mod blacklist;
pub mod reference;
pub mod tracks;
pub mod write;

pub use blacklist::{load_blacklist_mask, parse_blacklist};
pub use reference::ExperimentReference;
pub use tracks::{
    load_coverage_matrix, load_experiment, parse_bedgraph, parse_bedgraph_str, BedGraphRecord,
};
pub use write::{write_bedgraph_tracks, write_bin_matrix, write_mixing_matrix};

use std::path::Path;

use decoden_core::DecodenError;

/// Attach the offending path to an I/O error.
pub(crate) fn io_error(path: &Path, e: std::io::Error) -> DecodenError {
    DecodenError::Io(std::io::Error::new(
        e.kind(),
        format!("{}: {}", path.display(), e),
    ))
}
