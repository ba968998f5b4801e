//! Experiment reference: which tiled track belongs to which condition.
//!
//! The preprocessing step writes `experiment_conditions.json`, a flat JSON
//! object mapping each tiled track (relative to the JSON file's directory)
//! to its condition label:
//!
//! ```json
//! {
//!  "data/control_1_tiled.bdg": "control",
//!  "data/h3k4me3_1_tiled.bdg": "H3K4me3"
//! }
//! ```
//!
//! Entry order is significant: treatment conditions are listed in the order
//! they first appear, and replicates keep their file order.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use decoden_core::{DecodenError, Result};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// Ordered `(track path, condition label)` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentReference {
    entries: Vec<(PathBuf, String)>,
}

impl ExperimentReference {
    /// Wrap explicit entries.
    pub fn new(entries: Vec<(PathBuf, String)>) -> Self {
        Self { entries }
    }

    /// Parse the JSON object form.
    ///
    /// # Errors
    ///
    /// `Parse` if the text is not a JSON object of strings, or if a track
    /// path appears twice.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let reference: Self =
            serde_json::from_str(json).map_err(|e| DecodenError::Parse(e.to_string()))?;
        reference.check_unique()?;
        Ok(reference)
    }

    /// Read and parse a reference file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| crate::io_error(path, e))?;
        Self::from_json_str(&text).map_err(|e| match e {
            DecodenError::Parse(msg) => DecodenError::Parse(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// All entries in file order.
    pub fn entries(&self) -> &[(PathBuf, String)] {
        &self.entries
    }

    /// Number of tracks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the reference lists no tracks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tracks of one condition, in file order.
    pub fn tracks_of<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Path> + 'a {
        self.entries
            .iter()
            .filter(move |(_, l)| l == label)
            .map(|(p, _)| p.as_path())
    }

    /// The conditions list (control first, then treatments in order of first
    /// appearance) and the replicate count of every condition.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if no track carries `control_label`.
    pub fn conditions(&self, control_label: &str) -> Result<(Vec<String>, HashMap<String, usize>)> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut treatments: Vec<String> = Vec::new();
        for (_, label) in &self.entries {
            let count = counts.entry(label.clone()).or_default();
            if *count == 0 && label != control_label {
                treatments.push(label.clone());
            }
            *count += 1;
        }
        if !counts.contains_key(control_label) {
            return Err(DecodenError::InvalidInput(format!(
                "no track is labelled with the control condition '{control_label}'"
            )));
        }

        let mut conditions = Vec::with_capacity(treatments.len() + 1);
        conditions.push(control_label.to_string());
        conditions.extend(treatments);
        Ok((conditions, counts))
    }

    fn check_unique(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for (path, _) in &self.entries {
            if !seen.insert(path) {
                return Err(DecodenError::Parse(format!(
                    "track '{}' is listed more than once",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for ExperimentReference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = ExperimentReference;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from track path to condition label")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((path, label)) = map.next_entry::<String, String>()? {
                    entries.push((PathBuf::from(path), label));
                }
                Ok(ExperimentReference { entries })
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const JSON: &str = r#"{
 "data/b_1.bdg": "H3K27ac",
 "data/c_1.bdg": "control",
 "data/a_1.bdg": "H3K4me3",
 "data/b_2.bdg": "H3K27ac",
 "data/c_2.bdg": "control"
}"#;

    #[test]
    fn keeps_file_order() {
        let r = ExperimentReference::from_json_str(JSON).unwrap();
        assert_eq!(r.len(), 5);
        assert_eq!(r.entries()[0].0, PathBuf::from("data/b_1.bdg"));
        let b: Vec<&Path> = r.tracks_of("H3K27ac").collect();
        assert_eq!(b, vec![Path::new("data/b_1.bdg"), Path::new("data/b_2.bdg")]);
    }

    #[test]
    fn conditions_put_control_first() {
        let r = ExperimentReference::from_json_str(JSON).unwrap();
        let (conditions, counts) = r.conditions("control").unwrap();
        assert_eq!(conditions, vec!["control", "H3K27ac", "H3K4me3"]);
        assert_eq!(counts["control"], 2);
        assert_eq!(counts["H3K27ac"], 2);
        assert_eq!(counts["H3K4me3"], 1);
    }

    #[test]
    fn missing_control_is_rejected() {
        let r = ExperimentReference::from_json_str(JSON).unwrap();
        assert!(matches!(
            r.conditions("input"),
            Err(DecodenError::InvalidInput(_))
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            ExperimentReference::from_json_str("[\"a\", \"b\"]"),
            Err(DecodenError::Parse(_))
        ));
        assert!(matches!(
            ExperimentReference::from_json_str(r#"{"a.bdg": 3}"#),
            Err(DecodenError::Parse(_))
        ));
        assert!(ExperimentReference::from_json_str(r#"{"a.bdg": "x", "a.bdg": "y"}"#).is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        write!(file, "{}", JSON).unwrap();
        file.flush().unwrap();
        let r = ExperimentReference::load(file.path()).unwrap();
        assert_eq!(r.len(), 5);

        let err = ExperimentReference::load("/nonexistent/experiment_conditions.json").unwrap_err();
        assert!(matches!(err, DecodenError::Io(_)));
    }
}
