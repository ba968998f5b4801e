//! Result writers: tab-separated tables and per-track bedGraph files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ::csv::{Writer, WriterBuilder};
use decoden_core::{DecodenError, Result};
use decoden_denoise::MixingMatrix;
use decoden_omics::BinMatrix;

fn tsv_writer(path: &Path) -> Result<Writer<File>> {
    let file = File::create(path).map_err(|e| crate::io_error(path, e))?;
    Ok(WriterBuilder::new().delimiter(b'\t').from_writer(file))
}

fn csv_error(path: &Path, e: ::csv::Error) -> DecodenError {
    match e.into_kind() {
        ::csv::ErrorKind::Io(io) => crate::io_error(path, io),
        kind => DecodenError::Other(format!("{}: {:?}", path.display(), kind)),
    }
}

/// Write the mixing matrix as TSV: a `component` column holding the row
/// labels, then one column per sample.
pub fn write_mixing_matrix(path: impl AsRef<Path>, mixing: &MixingMatrix) -> Result<()> {
    let path = path.as_ref();
    let mut writer = tsv_writer(path)?;

    let mut header = vec!["component".to_string()];
    header.extend(mixing.sample_names().iter().cloned());
    writer.write_record(&header).map_err(|e| csv_error(path, e))?;

    for (r, label) in mixing.row_labels().iter().enumerate() {
        let values = mixing.row(r).unwrap_or_default();
        let mut record = Vec::with_capacity(values.len() + 1);
        record.push(label.clone());
        record.extend(values.iter().map(|v| v.to_string()));
        writer.write_record(&record).map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|e| crate::io_error(path, e))?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Write a bins × columns matrix as TSV with `chrom`, `start` and `end`
/// leading columns.
pub fn write_bin_matrix(path: impl AsRef<Path>, matrix: &BinMatrix) -> Result<()> {
    let path = path.as_ref();
    let mut writer = tsv_writer(path)?;

    let mut header = vec!["chrom".to_string(), "start".into(), "end".into()];
    header.extend(matrix.column_names().iter().cloned());
    writer.write_record(&header).map_err(|e| csv_error(path, e))?;

    let mut record: Vec<String> = Vec::with_capacity(matrix.n_columns() + 3);
    for (i, bin) in matrix.bins().iter().enumerate() {
        record.clear();
        record.push(bin.chrom.clone());
        record.push(bin.start.to_string());
        record.push(bin.end.to_string());
        if let Some(row) = matrix.row(i) {
            record.extend(row.iter().map(|v| v.to_string()));
        }
        writer.write_record(&record).map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|e| crate::io_error(path, e))?;
    log::debug!("Wrote {} ({} bins)", path.display(), matrix.n_bins());
    Ok(())
}

/// Write one bedGraph file per column whose name ends with `suffix`.
///
/// The file for column `"<label><suffix>"` is `<label>_<tag>.bdg`, where
/// `tag` is the first word of `suffix` (`" HSR Value"` gives `_HSR.bdg`).
/// Returns the written paths in column order.
pub fn write_bedgraph_tracks(
    dir: impl AsRef<Path>,
    matrix: &BinMatrix,
    suffix: &str,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let tag = suffix.split_whitespace().next().unwrap_or("track");

    let mut written = Vec::new();
    for (c, name) in matrix.column_names().iter().enumerate() {
        let Some(label) = name.strip_suffix(suffix) else {
            continue;
        };
        let path = dir.join(format!("{}_{tag}.bdg", label.replace(['/', ' '], "_")));
        let file = File::create(&path).map_err(|e| crate::io_error(&path, e))?;
        let mut out = BufWriter::new(file);

        writeln!(out, "track type=bedGraph name=\"{label}{suffix}\"")
            .map_err(|e| crate::io_error(&path, e))?;
        for (i, bin) in matrix.bins().iter().enumerate() {
            let value = matrix.get(i, c).unwrap_or(0.0);
            writeln!(out, "{}\t{}\t{}\t{}", bin.chrom, bin.start, bin.end, value)
                .map_err(|e| crate::io_error(&path, e))?;
        }
        out.flush().map_err(|e| crate::io_error(&path, e))?;
        written.push(path);
    }
    log::debug!("Wrote {} bedGraph track(s) to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracks::parse_bedgraph;
    use decoden_omics::GenomicInterval;
    use tempfile::TempDir;

    fn hsr_table() -> BinMatrix {
        BinMatrix::from_rows(
            GenomicInterval::tiles("chr1", 0, 300, 100),
            vec![
                "a HSR Value".into(),
                "a fit".into(),
                "b HSR Value".into(),
                "b fit".into(),
            ],
            vec![
                vec![1.0, 0.5, 2.0, 0.5],
                vec![3.5, 0.5, 0.25, 0.75],
                vec![0.0, 1.0, 4.0, 1.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn mixing_matrix_tsv() {
        let dir = TempDir::new().unwrap();
        let mixing = MixingMatrix::new(
            vec!["background".into(), "a".into()],
            vec!["control_1".into(), "a_1".into()],
            vec![1.0, 0.9, 0.0, 1.5],
        )
        .unwrap();
        let path = dir.path().join("mixing_matrix.tsv");
        write_mixing_matrix(&path, &mixing).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "component\tcontrol_1\ta_1");
        assert_eq!(lines[1], "background\t1\t0.9");
        assert_eq!(lines[2], "a\t0\t1.5");
    }

    #[test]
    fn bin_matrix_tsv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hsr_results.tsv");
        write_bin_matrix(&path, &hsr_table()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "chrom\tstart\tend\ta HSR Value\ta fit\tb HSR Value\tb fit");
        assert_eq!(lines[2], "chr1\t100\t200\t3.5\t0.5\t0.25\t0.75");
    }

    #[test]
    fn bedgraph_per_track() {
        let dir = TempDir::new().unwrap();
        let paths = write_bedgraph_tracks(dir.path(), &hsr_table(), " HSR Value").unwrap();
        assert_eq!(
            paths,
            vec![dir.path().join("a_HSR.bdg"), dir.path().join("b_HSR.bdg")]
        );

        let records = parse_bedgraph(&paths[1]).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].start, 200);
        assert!((records[2].value - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn csv_io_failure_keeps_kind_and_path() {
        let path = Path::new("out/mixing_matrix.tsv");
        let io = std::io::Error::new(std::io::ErrorKind::WriteZero, "disk full");
        let err = csv_error(path, ::csv::Error::from(io));
        match err {
            DecodenError::Io(e) => {
                assert_eq!(e.kind(), std::io::ErrorKind::WriteZero);
                assert!(e.to_string().contains("out/mixing_matrix.tsv"));
            }
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let err = write_bin_matrix("/nonexistent/dir/out.tsv", &hsr_table()).unwrap_err();
        assert!(matches!(err, DecodenError::Io(_)));
    }
}
