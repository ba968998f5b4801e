//! Condition layout: which columns of a coverage matrix belong to which
//! experimental condition.
//!
//! Downstream stages slice the coverage matrix by column position, so the
//! layout is built and validated once, before any numerical work. A layout
//! guarantees that:
//!
//! - the first condition is the control;
//! - every condition owns a non-empty, contiguous column range, and the
//!   ranges follow the order of the conditions list and tile all columns.
//!
//! With explicit replicate counts the layout is purely positional and
//! column names are only labels. When the counts are inferred from the
//! names, every name must carry its own condition label as its longest
//! matching prefix (so `H3K4` and `H3K4me3` cannot be confused).

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use decoden_core::{DecodenError, Result, Summarizable};

/// Validated mapping from condition labels to replicate column ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionLayout {
    sample_names: Vec<String>,
    conditions: Vec<String>,
    ranges: Vec<Range<usize>>,
}

impl ConditionLayout {
    /// Build a layout from the column names, the ordered conditions list
    /// (control first) and the replicate count of every condition.
    ///
    /// Column `j` belongs to whichever condition's range covers `j`; the
    /// names themselves are not inspected.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty or duplicated conditions list, and
    /// `ShapeMismatch` when the counts disagree with the conditions list or
    /// the number of columns.
    pub fn new(
        sample_names: Vec<String>,
        conditions: Vec<String>,
        counts: &HashMap<String, usize>,
    ) -> Result<Self> {
        check_conditions(&conditions)?;

        for label in counts.keys() {
            if !conditions.contains(label) {
                return Err(DecodenError::ShapeMismatch(format!(
                    "replicate count given for unknown condition '{label}'"
                )));
            }
        }

        let mut ranges = Vec::with_capacity(conditions.len());
        let mut offset = 0;
        for label in &conditions {
            let count = counts.get(label).copied().unwrap_or(0);
            if count == 0 {
                return Err(DecodenError::ShapeMismatch(format!(
                    "condition '{label}' has no replicate columns"
                )));
            }
            ranges.push(offset..offset + count);
            offset += count;
        }
        if offset != sample_names.len() {
            return Err(DecodenError::ShapeMismatch(format!(
                "replicate counts sum to {offset}, matrix has {} columns",
                sample_names.len()
            )));
        }

        Ok(Self {
            sample_names,
            conditions,
            ranges,
        })
    }

    /// Build a layout by assigning each column to the longest condition label
    /// that prefixes its name.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when a column matches no condition or when a
    /// condition's columns are not contiguous in conditions-list order.
    pub fn from_sample_names(sample_names: Vec<String>, conditions: Vec<String>) -> Result<Self> {
        check_conditions(&conditions)?;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for name in &sample_names {
            let label = longest_prefix(name, &conditions).ok_or_else(|| {
                DecodenError::ShapeMismatch(format!(
                    "column '{name}' does not belong to any condition"
                ))
            })?;
            *counts.entry(label.to_string()).or_default() += 1;
        }
        let layout = Self::new(sample_names, conditions, &counts)?;
        layout.check_names()?;
        Ok(layout)
    }

    /// Ordered condition labels, control first.
    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    /// Column names, in matrix order.
    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }

    /// Total number of sample columns.
    pub fn n_samples(&self) -> usize {
        self.sample_names.len()
    }

    /// Number of conditions, control included.
    pub fn n_conditions(&self) -> usize {
        self.conditions.len()
    }

    /// Number of treatment conditions.
    pub fn n_treatments(&self) -> usize {
        self.conditions.len() - 1
    }

    /// Column range of the control replicates.
    pub fn control_range(&self) -> Range<usize> {
        self.ranges[0].clone()
    }

    /// Column range of the condition at position `idx` of the conditions list.
    pub fn range(&self, idx: usize) -> Option<Range<usize>> {
        self.ranges.get(idx).cloned()
    }

    /// Column range of a condition by label.
    pub fn range_of(&self, label: &str) -> Option<Range<usize>> {
        self.conditions
            .iter()
            .position(|c| c == label)
            .map(|i| self.ranges[i].clone())
    }

    /// Treatment conditions with their column ranges, in list order.
    pub fn treatments(&self) -> impl Iterator<Item = (&str, Range<usize>)> + '_ {
        self.conditions[1..]
            .iter()
            .zip(&self.ranges[1..])
            .map(|(label, range)| (label.as_str(), range.clone()))
    }

    /// Column range holding all treatment replicates.
    pub fn treatment_columns(&self) -> Range<usize> {
        self.ranges[0].end..self.sample_names.len()
    }

    /// Replicate count of every condition, in list order.
    pub fn counts(&self) -> Vec<(&str, usize)> {
        self.conditions
            .iter()
            .zip(&self.ranges)
            .map(|(label, range)| (label.as_str(), range.len()))
            .collect()
    }

    /// Check that `column_names` are exactly this layout's sample names.
    pub fn check_columns(&self, column_names: &[String]) -> Result<()> {
        if column_names != self.sample_names.as_slice() {
            return Err(DecodenError::ShapeMismatch(format!(
                "matrix columns [{}] do not match the condition layout [{}]",
                column_names.join(", "),
                self.sample_names.join(", ")
            )));
        }
        Ok(())
    }

    fn check_names(&self) -> Result<()> {
        for (label, range) in self.conditions.iter().zip(&self.ranges) {
            for name in &self.sample_names[range.clone()] {
                match longest_prefix(name, &self.conditions) {
                    Some(found) if found == label => {}
                    Some(found) => {
                        return Err(DecodenError::ShapeMismatch(format!(
                            "column '{name}' sits in the '{label}' block but belongs to '{found}'"
                        )))
                    }
                    None => {
                        return Err(DecodenError::ShapeMismatch(format!(
                            "column '{name}' sits in the '{label}' block but does not carry its prefix"
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}

impl Summarizable for ConditionLayout {
    fn summary(&self) -> String {
        let parts: Vec<String> = self
            .counts()
            .iter()
            .map(|(label, n)| format!("{label}\u{00d7}{n}"))
            .collect();
        format!("ConditionLayout: {}", parts.join(", "))
    }
}

fn check_conditions(conditions: &[String]) -> Result<()> {
    if conditions.is_empty() {
        return Err(DecodenError::InvalidInput(
            "conditions list is empty; the control condition must come first".into(),
        ));
    }
    let mut seen = HashSet::new();
    for label in conditions {
        if label.is_empty() {
            return Err(DecodenError::InvalidInput("empty condition label".into()));
        }
        if !seen.insert(label.as_str()) {
            return Err(DecodenError::InvalidInput(format!(
                "condition '{label}' listed twice"
            )));
        }
    }
    Ok(())
}

fn longest_prefix<'a>(name: &str, conditions: &'a [String]) -> Option<&'a str> {
    conditions
        .iter()
        .filter(|label| name.starts_with(label.as_str()))
        .max_by_key(|label| label.len())
        .map(|label| label.as_str())
}
