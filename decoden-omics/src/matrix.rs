//! Dense bin matrix for tiled genome-wide tracks.
//!
//! [`BinMatrix`] stores a row-major dense matrix of `f64` values
//! (n_bins × n_columns) together with the genomic interval of every row and
//! a unique name for every column. The same type carries raw coverage
//! (one column per replicate), per-condition signal (one column per
//! condition) and normalized output tables.

use std::collections::HashSet;
use std::ops::Range;

use decoden_core::{DecodenError, Result, Summarizable};

use crate::genomic::GenomicInterval;

/// A dense, row-major matrix of per-bin values (bins × columns).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinMatrix {
    data: Vec<f64>,
    bins: Vec<GenomicInterval>,
    column_names: Vec<String>,
}

impl BinMatrix {
    /// Create a matrix from flat row-major data.
    pub fn new(
        bins: Vec<GenomicInterval>,
        column_names: Vec<String>,
        data: Vec<f64>,
    ) -> Result<Self> {
        check_unique(&column_names)?;
        let expected = bins.len() * column_names.len();
        if data.len() != expected {
            return Err(DecodenError::ShapeMismatch(format!(
                "data length ({}) does not match {} bins \u{00d7} {} columns",
                data.len(),
                bins.len(),
                column_names.len()
            )));
        }
        Ok(Self {
            data,
            bins,
            column_names,
        })
    }

    /// Create a matrix from row-major 2D data.
    ///
    /// Each inner `Vec` is one bin (row) with one value per column.
    pub fn from_rows(
        bins: Vec<GenomicInterval>,
        column_names: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if rows.len() != bins.len() {
            return Err(DecodenError::ShapeMismatch(format!(
                "{} rows given for {} bins",
                rows.len(),
                bins.len()
            )));
        }
        let n_columns = column_names.len();
        let mut flat = Vec::with_capacity(rows.len() * n_columns);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_columns {
                return Err(DecodenError::ShapeMismatch(format!(
                    "row {i} has {} columns, expected {n_columns}",
                    row.len()
                )));
            }
            flat.extend_from_slice(row);
        }
        Self::new(bins, column_names, flat)
    }

    /// Create a matrix from column vectors, one per column name.
    pub fn from_columns(
        bins: Vec<GenomicInterval>,
        column_names: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if columns.len() != column_names.len() {
            return Err(DecodenError::ShapeMismatch(format!(
                "{} columns given for {} column names",
                columns.len(),
                column_names.len()
            )));
        }
        let n_bins = bins.len();
        for (name, col) in column_names.iter().zip(&columns) {
            if col.len() != n_bins {
                return Err(DecodenError::ShapeMismatch(format!(
                    "column '{name}' has {} values, expected {n_bins}",
                    col.len()
                )));
            }
        }
        let n_columns = columns.len();
        let mut flat = vec![0.0; n_bins * n_columns];
        for (c, col) in columns.iter().enumerate() {
            for (r, &v) in col.iter().enumerate() {
                flat[r * n_columns + c] = v;
            }
        }
        Self::new(bins, column_names, flat)
    }

    /// (n_bins, n_columns).
    pub fn shape(&self) -> (usize, usize) {
        (self.n_bins(), self.n_columns())
    }

    /// Number of bins (rows).
    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    /// Number of columns.
    pub fn n_columns(&self) -> usize {
        self.column_names.len()
    }

    /// Whether the matrix has no bins.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Get a single value by bin and column index.
    pub fn get(&self, bin_idx: usize, col_idx: usize) -> Option<f64> {
        if bin_idx < self.n_bins() && col_idx < self.n_columns() {
            Some(self.data[bin_idx * self.n_columns() + col_idx])
        } else {
            None
        }
    }

    /// Set a single value. Returns an error if indices are out of bounds.
    pub fn set(&mut self, bin_idx: usize, col_idx: usize, value: f64) -> Result<()> {
        let (n_bins, n_columns) = self.shape();
        if bin_idx >= n_bins || col_idx >= n_columns {
            return Err(DecodenError::InvalidInput(format!(
                "index ({bin_idx}, {col_idx}) out of bounds for ({n_bins}, {n_columns})"
            )));
        }
        self.data[bin_idx * n_columns + col_idx] = value;
        Ok(())
    }

    /// A slice of one bin's values across all columns.
    pub fn row(&self, bin_idx: usize) -> Option<&[f64]> {
        if bin_idx < self.n_bins() {
            let start = bin_idx * self.n_columns();
            Some(&self.data[start..start + self.n_columns()])
        } else {
            None
        }
    }

    /// The contiguous row-major block for a range of bins.
    pub fn row_block(&self, bins: Range<usize>) -> Option<&[f64]> {
        if bins.start > bins.end || bins.end > self.n_bins() {
            return None;
        }
        let n = self.n_columns();
        Some(&self.data[bins.start * n..bins.end * n])
    }

    /// All bin values for a single column (column copy, since data is row-major).
    pub fn column(&self, col_idx: usize) -> Option<Vec<f64>> {
        let n = self.n_columns();
        if col_idx >= n {
            return None;
        }
        Some(self.data.iter().skip(col_idx).step_by(n).copied().collect())
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|c| c == name)
    }

    /// All bin values for a named column.
    pub fn column_by_name(&self, name: &str) -> Option<Vec<f64>> {
        self.column_index(name).and_then(|idx| self.column(idx))
    }

    /// Subset the matrix to the given bin (row) indices, in the order given.
    pub fn select_rows(&self, indices: &[usize]) -> Result<BinMatrix> {
        let n = self.n_columns();
        let mut data = Vec::with_capacity(indices.len() * n);
        let mut bins = Vec::with_capacity(indices.len());

        for &i in indices {
            let row = self.row(i).ok_or_else(|| {
                DecodenError::InvalidInput(format!(
                    "bin index {i} out of bounds (n_bins={})",
                    self.n_bins()
                ))
            })?;
            data.extend_from_slice(row);
            bins.push(self.bins[i].clone());
        }

        Ok(BinMatrix {
            data,
            bins,
            column_names: self.column_names.clone(),
        })
    }

    /// Subset the matrix to the given column indices, in the order given.
    pub fn select_columns(&self, indices: &[usize]) -> Result<BinMatrix> {
        let n = self.n_columns();
        for &i in indices {
            if i >= n {
                return Err(DecodenError::InvalidInput(format!(
                    "column index {i} out of bounds (n_columns={n})"
                )));
            }
        }
        let names: Vec<String> = indices
            .iter()
            .map(|&i| self.column_names[i].clone())
            .collect();
        check_unique(&names)?;

        let mut data = Vec::with_capacity(self.n_bins() * indices.len());
        for row in self.data.chunks_exact(n.max(1)).take(self.n_bins()) {
            data.extend(indices.iter().map(|&c| row[c]));
        }

        Ok(BinMatrix {
            data,
            bins: self.bins.clone(),
            column_names: names,
        })
    }

    /// The underlying flat data as a slice (row-major, n_bins × n_columns).
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Genomic interval of every bin.
    pub fn bins(&self) -> &[GenomicInterval] {
        &self.bins
    }

    /// Column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Whether every value is finite and `>= 0`.
    pub fn is_non_negative(&self) -> bool {
        self.data.iter().all(|v| v.is_finite() && *v >= 0.0)
    }
}

impl Summarizable for BinMatrix {
    fn summary(&self) -> String {
        format!(
            "BinMatrix: {} bins \u{00d7} {} columns",
            self.n_bins(),
            self.n_columns()
        )
    }
}

fn check_unique(names: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(DecodenError::InvalidInput(format!(
                "duplicate column name '{name}'"
            )));
        }
    }
    Ok(())
}
