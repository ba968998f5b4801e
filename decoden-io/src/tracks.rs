//! Tiled bedGraph tracks and coverage-matrix assembly.
//!
//! Each sample arrives as a bedGraph file on a fixed bin grid
//! (`chrom start end value`, one line per bin). All samples of an
//! experiment must share the same grid; their values become the columns of
//! the coverage matrix.

use std::fs;
use std::path::Path;

use decoden_core::{DecodenError, Result};
use decoden_omics::{BinMatrix, ConditionLayout, GenomicInterval};

use crate::reference::ExperimentReference;

/// A single bedGraph record: a genomic interval with an associated value.
#[derive(Debug, Clone, PartialEq)]
pub struct BedGraphRecord {
    /// Chromosome name.
    pub chrom: String,
    /// 0-based start coordinate (inclusive).
    pub start: u64,
    /// 0-based end coordinate (exclusive).
    pub end: u64,
    /// Coverage of this interval.
    pub value: f64,
}

impl BedGraphRecord {
    /// The record's interval.
    pub fn interval(&self) -> GenomicInterval {
        GenomicInterval {
            chrom: self.chrom.clone(),
            start: self.start,
            end: self.end,
        }
    }
}

/// Parse coverage bedGraph from a string.
///
/// Skips lines starting with `track`, `browser`, or `#`. Each data line must
/// have at least 4 whitespace-separated fields: `chrom start end value`.
/// Coverage is non-negative, so negative or non-finite values are rejected.
///
/// # Errors
///
/// Returns `Parse` with line number context if a data line is malformed.
///
/// # Examples
///
/// ```
/// # use decoden_io::parse_bedgraph_str;
/// let data = "track type=bedGraph\nchr1\t0\t200\t1.5\nchr1\t200\t400\t0\n";
/// let records = parse_bedgraph_str(data).unwrap();
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[1].start, 200);
/// ```
pub fn parse_bedgraph_str(data: &str) -> Result<Vec<BedGraphRecord>> {
    let mut records = Vec::new();

    for (line_idx, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty()
            || line.starts_with("track")
            || line.starts_with("browser")
            || line.starts_with('#')
        {
            continue;
        }
        let line_no = line_idx + 1;

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(DecodenError::Parse(format!(
                "line {line_no}: expected 4 fields, found {}",
                fields.len()
            )));
        }

        let start: u64 = fields[1].parse().map_err(|_| {
            DecodenError::Parse(format!(
                "line {line_no}: invalid start coordinate '{}'",
                fields[1]
            ))
        })?;
        let end: u64 = fields[2].parse().map_err(|_| {
            DecodenError::Parse(format!(
                "line {line_no}: invalid end coordinate '{}'",
                fields[2]
            ))
        })?;
        if start >= end {
            return Err(DecodenError::Parse(format!(
                "line {line_no}: start ({start}) must be less than end ({end})"
            )));
        }

        let value: f64 = fields[3].parse().map_err(|_| {
            DecodenError::Parse(format!("line {line_no}: invalid value '{}'", fields[3]))
        })?;
        if !value.is_finite() || value < 0.0 {
            return Err(DecodenError::Parse(format!(
                "line {line_no}: coverage must be finite and non-negative, got {value}"
            )));
        }

        records.push(BedGraphRecord {
            chrom: fields[0].to_string(),
            start,
            end,
            value,
        });
    }

    Ok(records)
}

/// Read and parse a bedGraph file.
pub fn parse_bedgraph(path: impl AsRef<Path>) -> Result<Vec<BedGraphRecord>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| crate::io_error(path, e))?;
    parse_bedgraph_str(&text).map_err(|e| match e {
        DecodenError::Parse(msg) => DecodenError::Parse(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// Assemble the coverage matrix of every track in `reference`.
///
/// Track paths are resolved against `base_dir`. Columns are ordered by the
/// conditions list (control first), replicates in file order, and named
/// `<label>_<k>` with `k` counting from 1 within each condition.
///
/// # Errors
///
/// `InvalidInput` if the control label is missing, `ShapeMismatch` if any
/// track's bin grid differs from the first track's, and the I/O or parse
/// error of the first unreadable track.
pub fn load_coverage_matrix(
    reference: &ExperimentReference,
    base_dir: impl AsRef<Path>,
    control_label: &str,
) -> Result<(BinMatrix, ConditionLayout)> {
    let base_dir = base_dir.as_ref();
    let (conditions, counts) = reference.conditions(control_label)?;

    let mut bins: Option<Vec<GenomicInterval>> = None;
    let mut names = Vec::with_capacity(reference.len());
    let mut columns = Vec::with_capacity(reference.len());
    for label in &conditions {
        for (k, track) in reference.tracks_of(label).enumerate() {
            let path = base_dir.join(track);
            let records = parse_bedgraph(&path)?;
            log::debug!("{}: {} bins ({label})", path.display(), records.len());

            match &bins {
                None => bins = Some(records.iter().map(BedGraphRecord::interval).collect()),
                Some(grid) => check_grid(grid, &records, &path)?,
            }
            names.push(format!("{label}_{}", k + 1));
            columns.push(records.into_iter().map(|r| r.value).collect::<Vec<f64>>());
        }
    }

    let bins = bins.unwrap_or_default();
    if bins.is_empty() {
        return Err(DecodenError::InvalidInput(
            "tracks contain no bins".into(),
        ));
    }
    log::info!(
        "Loaded {} tracks over {} bins ({} conditions)",
        names.len(),
        bins.len(),
        conditions.len()
    );

    let matrix = BinMatrix::from_columns(bins, names.clone(), columns)?;
    // Counts fix the column ranges; the generated names are not re-parsed
    let layout = ConditionLayout::new(names, conditions, &counts)?;
    Ok((matrix, layout))
}

/// Load an `experiment_conditions.json` file and the tracks it lists,
/// resolving them against the file's own directory.
pub fn load_experiment(
    reference_path: impl AsRef<Path>,
    control_label: &str,
) -> Result<(BinMatrix, ConditionLayout)> {
    let reference_path = reference_path.as_ref();
    let reference = ExperimentReference::load(reference_path)?;
    let base_dir = reference_path.parent().unwrap_or_else(|| Path::new("."));
    load_coverage_matrix(&reference, base_dir, control_label)
}

fn check_grid(grid: &[GenomicInterval], records: &[BedGraphRecord], path: &Path) -> Result<()> {
    if grid.len() != records.len() {
        return Err(DecodenError::ShapeMismatch(format!(
            "{}: {} bins, expected {}",
            path.display(),
            records.len(),
            grid.len()
        )));
    }
    let mismatch = grid
        .iter()
        .zip(records)
        .position(|(bin, r)| bin.chrom != r.chrom || bin.start != r.start || bin.end != r.end);
    match mismatch {
        Some(idx) => Err(DecodenError::ShapeMismatch(format!(
            "{}: bin {idx} is {}:{}-{}, expected {}",
            path.display(),
            records[idx].chrom,
            records[idx].start,
            records[idx].end,
            grid[idx]
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn track(values: &[f64]) -> String {
        let mut out = String::from("track type=bedGraph\n");
        for (i, v) in values.iter().enumerate() {
            out.push_str(&format!("chr1\t{}\t{}\t{}\n", i * 200, (i + 1) * 200, v));
        }
        out
    }

    fn experiment(dir: &TempDir, tracks: &[(&str, &str, &[f64])]) -> ExperimentReference {
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        let entries = tracks
            .iter()
            .map(|(file, label, values)| {
                let rel = PathBuf::from("data").join(file);
                std::fs::write(dir.path().join(&rel), track(values)).unwrap();
                (rel, label.to_string())
            })
            .collect();
        ExperimentReference::new(entries)
    }

    #[test]
    fn parse_skips_headers() {
        let data = "browser position chr1\n# comment\nchr1\t0\t100\t2.5\n\nchr2\t0\t100\t0\n";
        let records = parse_bedgraph_str(data).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].chrom, "chr1");
        assert!((records[0].value - 2.5).abs() < f64::EPSILON);
        assert_eq!(records[1].interval().to_string(), "chr2:0-100");
    }

    #[test]
    fn malformed_lines_report_line_number() {
        let err = parse_bedgraph_str("chr1\t0\t100\t1\nchr1\t100\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(parse_bedgraph_str("chr1\tx\t100\t1\n").is_err());
        assert!(parse_bedgraph_str("chr1\t100\t100\t1\n").is_err());
        assert!(parse_bedgraph_str("chr1\t0\t100\tabc\n").is_err());
    }

    #[test]
    fn negative_or_nan_coverage_rejected() {
        assert!(matches!(
            parse_bedgraph_str("chr1\t0\t100\t-0.5\n"),
            Err(DecodenError::Parse(_))
        ));
        assert!(parse_bedgraph_str("chr1\t0\t100\tNaN\n").is_err());
        assert!(parse_bedgraph_str("chr1\t0\t100\tinf\n").is_err());
    }

    #[test]
    fn assembles_matrix_in_condition_order() {
        let dir = TempDir::new().unwrap();
        let reference = experiment(
            &dir,
            &[
                ("t1.bdg", "H3K4me3", &[5.0, 6.0, 7.0]),
                ("c1.bdg", "control", &[1.0, 2.0, 3.0]),
                ("c2.bdg", "control", &[1.5, 2.5, 3.5]),
                ("t2.bdg", "H3K4me3", &[8.0, 9.0, 10.0]),
            ],
        );
        let (matrix, layout) = load_coverage_matrix(&reference, dir.path(), "control").unwrap();
        assert_eq!(matrix.shape(), (3, 4));
        assert_eq!(
            matrix.column_names(),
            &["control_1", "control_2", "H3K4me3_1", "H3K4me3_2"]
        );
        assert_eq!(matrix.row(1).unwrap(), &[2.0, 2.5, 6.0, 9.0]);
        assert_eq!(layout.control_range(), 0..2);
        assert_eq!(layout.range_of("H3K4me3"), Some(2..4));
        assert_eq!(matrix.bins()[2].start, 400);
    }

    #[test]
    fn label_that_extends_another_label() {
        let dir = TempDir::new().unwrap();
        let reference = experiment(
            &dir,
            &[
                ("c1.bdg", "control", &[1.0, 2.0]),
                ("a1.bdg", "a", &[3.0, 4.0]),
                ("a2.bdg", "a", &[5.0, 6.0]),
                ("b1.bdg", "a_1", &[7.0, 8.0]),
            ],
        );
        let (matrix, layout) = load_coverage_matrix(&reference, dir.path(), "control").unwrap();
        assert_eq!(matrix.column_names(), &["control_1", "a_1", "a_2", "a_1_1"]);
        assert_eq!(layout.range_of("a"), Some(1..3));
        assert_eq!(layout.range_of("a_1"), Some(3..4));
        assert_eq!(matrix.row(0).unwrap(), &[1.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn differing_bin_grids_rejected() {
        let dir = TempDir::new().unwrap();
        let reference = experiment(
            &dir,
            &[
                ("c1.bdg", "control", &[1.0, 2.0, 3.0]),
                ("t1.bdg", "a", &[1.0, 2.0]),
            ],
        );
        let err = load_coverage_matrix(&reference, dir.path(), "control").unwrap_err();
        assert!(matches!(err, DecodenError::ShapeMismatch(_)));

        std::fs::write(
            dir.path().join("data/t1.bdg"),
            "chr1\t0\t200\t1\nchr1\t200\t400\t1\nchr1\t400\t500\t1\n",
        )
        .unwrap();
        let err = load_coverage_matrix(&reference, dir.path(), "control").unwrap_err();
        assert!(err.to_string().contains("bin 2"));
    }

    #[test]
    fn missing_track_is_io_error() {
        let dir = TempDir::new().unwrap();
        let reference = ExperimentReference::new(vec![(PathBuf::from("nope.bdg"), "control".into())]);
        let err = load_coverage_matrix(&reference, dir.path(), "control").unwrap_err();
        assert!(matches!(err, DecodenError::Io(_)));
    }

    #[test]
    fn load_experiment_resolves_against_reference_dir() {
        let dir = TempDir::new().unwrap();
        let reference = experiment(
            &dir,
            &[("c1.bdg", "control", &[1.0, 2.0]), ("t1.bdg", "a", &[3.0, 4.0])],
        );
        let json: String = {
            let pairs: Vec<String> = reference
                .entries()
                .iter()
                .map(|(p, l)| format!("\"{}\": \"{l}\"", p.display()))
                .collect();
            format!("{{{}}}", pairs.join(", "))
        };
        let path = dir.path().join("experiment_conditions.json");
        std::fs::write(&path, json).unwrap();

        let (matrix, layout) = load_experiment(&path, "control").unwrap();
        assert_eq!(matrix.shape(), (2, 2));
        assert_eq!(layout.conditions(), &["control", "a"]);
    }
}
