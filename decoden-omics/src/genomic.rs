//! Genomic bin coordinates.
//!
//! All coordinates are 0-based, half-open `[start, end)`, matching BED and
//! bedGraph files.

use core::fmt;

use decoden_core::{DecodenError, Result};

/// A half-open interval `[start, end)` on a chromosome (0-based).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenomicInterval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl GenomicInterval {
    /// Create a new interval.
    ///
    /// Returns an error if `start >= end`.
    pub fn new(chrom: impl Into<String>, start: u64, end: u64) -> Result<Self> {
        if start >= end {
            return Err(DecodenError::InvalidInput(format!(
                "interval start ({start}) must be less than end ({end})"
            )));
        }
        Ok(Self {
            chrom: chrom.into(),
            start,
            end,
        })
    }

    /// Tile `[start, end)` on `chrom` into consecutive bins of `bin_size`
    /// bases. The last bin is truncated at `end`. Returns no bins when
    /// `bin_size` is zero or the range is empty.
    pub fn tiles(chrom: &str, start: u64, end: u64, bin_size: u64) -> Vec<GenomicInterval> {
        if bin_size == 0 {
            return Vec::new();
        }
        let mut bins = Vec::new();
        let mut pos = start;
        while pos < end {
            let bin_end = (pos + bin_size).min(end);
            bins.push(GenomicInterval {
                chrom: chrom.to_string(),
                start: pos,
                end: bin_end,
            });
            pos = bin_end;
        }
        bins
    }
}

impl fmt::Display for GenomicInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}
