//! Order statistics for numeric data.

use decoden_core::{DecodenError, Result};

/// Median of `data`. An even-length sample gives the mean of the two
/// middle values.
pub fn median(data: &[f64]) -> Result<f64> {
    if data.is_empty() {
        return Err(DecodenError::InvalidInput(
            "median: data must not be empty".into(),
        ));
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Ok(sorted[mid])
    } else {
        Ok(0.5 * (sorted[mid - 1] + sorted[mid]))
    }
}
