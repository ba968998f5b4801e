//! Per-bin usability mask derived from a blacklist.

use std::collections::HashMap;

use decoden_core::{DecodenError, Result};

use crate::genomic::GenomicInterval;

/// Boolean flag per bin: `true` where the bin may be used for regression
/// fitting, `false` inside blacklisted regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinMask {
    usable: Vec<bool>,
}

impl BinMask {
    /// A mask with every bin usable.
    pub fn all_usable(n_bins: usize) -> Self {
        Self {
            usable: vec![true; n_bins],
        }
    }

    /// Wrap an explicit flag vector.
    pub fn from_flags(usable: Vec<bool>) -> Self {
        Self { usable }
    }

    /// Mark every bin that overlaps any blacklist interval as unusable.
    ///
    /// Blacklist intervals are grouped by chromosome, sorted and merged, and
    /// each bin is checked against the last merged interval starting before
    /// the bin's end.
    pub fn from_blacklist(bins: &[GenomicInterval], blacklist: &[GenomicInterval]) -> Self {
        let mut by_chrom: HashMap<&str, Vec<(u64, u64)>> = HashMap::new();
        for iv in blacklist {
            by_chrom
                .entry(iv.chrom.as_str())
                .or_default()
                .push((iv.start, iv.end));
        }
        for intervals in by_chrom.values_mut() {
            intervals.sort_unstable();
            let mut merged: Vec<(u64, u64)> = Vec::with_capacity(intervals.len());
            for &(start, end) in intervals.iter() {
                match merged.last_mut() {
                    Some(last) if start <= last.1 => last.1 = last.1.max(end),
                    _ => merged.push((start, end)),
                }
            }
            *intervals = merged;
        }

        let usable = bins
            .iter()
            .map(|bin| match by_chrom.get(bin.chrom.as_str()) {
                Some(intervals) => {
                    let idx = intervals.partition_point(|&(start, _)| start < bin.end);
                    idx == 0 || intervals[idx - 1].1 <= bin.start
                }
                None => true,
            })
            .collect();
        Self { usable }
    }

    /// Number of bins covered by the mask.
    pub fn len(&self) -> usize {
        self.usable.len()
    }

    /// Whether the mask covers no bins.
    pub fn is_empty(&self) -> bool {
        self.usable.is_empty()
    }

    /// Number of usable bins.
    pub fn n_usable(&self) -> usize {
        self.usable.iter().filter(|&&u| u).count()
    }

    /// Indices of usable bins, in order.
    pub fn usable_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.usable
            .iter()
            .enumerate()
            .filter_map(|(i, &u)| u.then_some(i))
    }

    /// The flags as a slice.
    pub fn as_slice(&self) -> &[bool] {
        &self.usable
    }

    /// Check that the mask is aligned, length for length, with `n_bins` bins.
    pub fn check_aligned(&self, n_bins: usize) -> Result<()> {
        if self.usable.len() != n_bins {
            return Err(DecodenError::ShapeMismatch(format!(
                "blacklist mask covers {} bins, matrix has {n_bins}",
                self.usable.len()
            )));
        }
        Ok(())
    }
}
