//! Blacklist regions in BED format.
//!
//! Only the first three columns are read; any further BED columns (name,
//! score, strand, ...) are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use decoden_core::{DecodenError, Result};
use decoden_omics::{BinMask, GenomicInterval};

/// Parse a BED3+ blacklist file into intervals.
///
/// Lines starting with `#`, `track`, or `browser` are treated as headers and
/// skipped. Empty lines are also skipped.
pub fn parse_blacklist(path: impl AsRef<Path>) -> Result<Vec<GenomicInterval>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| crate::io_error(path, e))?;
    let reader = BufReader::new(file);

    let mut intervals = Vec::new();
    for (line_idx, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| {
            DecodenError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: line {}: {}", path.display(), line_idx + 1, e),
            ))
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed.starts_with('#')
            || trimmed.starts_with("track")
            || trimmed.starts_with("browser")
        {
            continue;
        }
        intervals.push(parse_bed3_line(trimmed, line_idx + 1, path)?);
    }

    log::debug!("{}: {} blacklist regions", path.display(), intervals.len());
    Ok(intervals)
}

/// Read a blacklist and mark the bins it overlaps as unusable.
pub fn load_blacklist_mask(path: impl AsRef<Path>, bins: &[GenomicInterval]) -> Result<BinMask> {
    let blacklist = parse_blacklist(path)?;
    let mask = BinMask::from_blacklist(bins, &blacklist);
    log::info!(
        "Blacklist leaves {} of {} bins usable",
        mask.n_usable(),
        mask.len()
    );
    Ok(mask)
}

fn parse_bed3_line(line: &str, line_num: usize, path: &Path) -> Result<GenomicInterval> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 3 {
        return Err(DecodenError::Parse(format!(
            "{}: line {}: expected at least 3 tab-separated fields, found {}",
            path.display(),
            line_num,
            fields.len()
        )));
    }

    let start: u64 = fields[1].trim().parse().map_err(|_| {
        DecodenError::Parse(format!(
            "{}: line {}: invalid start coordinate '{}'",
            path.display(),
            line_num,
            fields[1]
        ))
    })?;
    let end: u64 = fields[2].trim().parse().map_err(|_| {
        DecodenError::Parse(format!(
            "{}: line {}: invalid end coordinate '{}'",
            path.display(),
            line_num,
            fields[2]
        ))
    })?;

    GenomicInterval::new(fields[0].trim(), start, end).map_err(|e| {
        DecodenError::Parse(format!("{}: line {}: {}", path.display(), line_num, e))
    })
}
