//! CLO coefficient table and its loader.
//!
//! The table maps lower-cased garment labels to insulation coefficients and
//! carries a base coefficient for the bare body. It is read once from a TOML
//! document and immutable afterwards, so a single instance can be shared
//! across concurrent estimations.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a coefficient table.
///
/// Both kinds are non-recoverable: callers must surface them rather than
/// substitute an empty table.
#[derive(Debug, Error)]
pub enum TableError {
    /// The source path does not resolve to readable data.
    #[error("CLO table not found: {}", .path.display())]
    NotFound {
        /// Path that failed to resolve.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The source exists but cannot be parsed into the expected shape.
    #[error("malformed CLO table {}: {reason}", .path.display())]
    Malformed {
        /// Path of the offending document.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },
}

/// On-disk shape of the table document. Both keys are optional.
#[derive(Debug, Default, Deserialize)]
struct RawTable {
    #[serde(default)]
    clo_values: HashMap<String, f32>,
    #[serde(default)]
    base_clo: f32,
}

/// Garment label to CLO coefficient mapping plus the bare-body base value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloTable {
    coefficients: HashMap<String, f32>,
    base_clo: f32,
}

impl CloTable {
    /// Builds a table from parts, lower-casing keys so lookups are
    /// case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns an error if any coefficient or the base value is negative.
    pub fn new(coefficients: HashMap<String, f32>, base_clo: f32) -> anyhow::Result<Self> {
        if base_clo < 0.0 {
            anyhow::bail!("base CLO value must be >= 0, got {base_clo}");
        }
        let mut normalized = HashMap::with_capacity(coefficients.len());
        for (label, value) in coefficients {
            if value < 0.0 {
                anyhow::bail!("CLO coefficient for {label:?} must be >= 0, got {value}");
            }
            normalized.insert(label.to_lowercase(), value);
        }
        Ok(Self {
            coefficients: normalized,
            base_clo,
        })
    }

    /// Loads a table from a TOML document with optional `clo_values` and
    /// `base_clo` keys. A missing key falls back to an empty mapping or
    /// `0.0` respectively; a missing document does not.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::NotFound`] if the path cannot be read and
    /// [`TableError::Malformed`] if its content does not parse into the
    /// expected shape or violates the non-negativity invariant.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TableError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;

        let raw: RawTable = toml::from_str(&text).map_err(|e| TableError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let table = Self::new(raw.clo_values, raw.base_clo).map_err(|e| TableError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        debug!(
            "Loaded CLO table from {} ({} labels, base {})",
            path.display(),
            table.coefficients.len(),
            table.base_clo
        );

        Ok(table)
    }

    /// Looks up the coefficient for a label, case-insensitively.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<f32> {
        self.coefficients.get(&label.to_lowercase()).copied()
    }

    /// Returns whether the table has an entry for a label.
    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.coefficients.contains_key(&label.to_lowercase())
    }

    /// Returns the bare-body base coefficient.
    #[must_use]
    pub const fn base_clo(&self) -> f32 {
        self.base_clo
    }

    /// Returns the number of labelled coefficients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// Returns whether the table carries no labelled coefficients.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_table(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn test_load_full_table() {
        let file = write_table(
            r#"
base_clo = 0.1

[clo_values]
jacket = 0.3
pants = 0.2
"t-shirt" = 0.09
"#,
        );

        let table = CloTable::load(file.path()).expect("load");
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("jacket"), Some(0.3));
        assert_eq!(table.get("t-shirt"), Some(0.09));
        assert!((table.base_clo() - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_keys_are_case_normalized() {
        let file = write_table(
            r"
[clo_values]
Jacket = 0.3
PANTS = 0.2
",
        );

        let table = CloTable::load(file.path()).expect("load");
        assert_eq!(table.get("jacket"), Some(0.3));
        assert_eq!(table.get("JACKET"), Some(0.3));
        assert_eq!(table.get("Pants"), Some(0.2));
    }

    #[test]
    fn test_missing_clo_values_defaults_to_empty() {
        let file = write_table("base_clo = 0.5\n");

        let table = CloTable::load(file.path()).expect("load");
        assert!(table.is_empty());
        assert!((table.base_clo() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_base_clo_defaults_to_zero() {
        let file = write_table(
            r"
[clo_values]
hat = 0.01
",
        );

        let table = CloTable::load(file.path()).expect("load");
        assert!((table.base_clo() - 0.0).abs() < f32::EPSILON);
        assert_eq!(table.get("hat"), Some(0.01));
    }

    #[test]
    fn test_empty_document_is_valid() {
        let file = write_table("");

        let table = CloTable::load(file.path()).expect("load");
        assert!(table.is_empty());
        assert!((table.base_clo() - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = CloTable::load("/nonexistent/clo_values.toml").unwrap_err();

        assert!(matches!(err, TableError::NotFound { .. }));
        assert!(err.to_string().contains("/nonexistent/clo_values.toml"));
    }

    #[test]
    fn test_invalid_toml_is_malformed() {
        let file = write_table("[clo_values\njacket = 0.3\n");

        let err = CloTable::load(file.path()).unwrap_err();
        assert!(matches!(err, TableError::Malformed { .. }));
    }

    #[test]
    fn test_wrong_value_type_is_malformed() {
        let file = write_table(
            r#"
[clo_values]
jacket = "warm"
"#,
        );

        let err = CloTable::load(file.path()).unwrap_err();
        assert!(matches!(err, TableError::Malformed { .. }));
    }

    #[test]
    fn test_negative_coefficient_is_malformed() {
        let file = write_table(
            r"
[clo_values]
jacket = -0.3
",
        );

        let err = CloTable::load(file.path()).unwrap_err();
        assert!(matches!(err, TableError::Malformed { .. }));
        assert!(err.to_string().contains("jacket"));
    }

    #[test]
    fn test_negative_base_is_malformed() {
        let file = write_table("base_clo = -0.1\n");

        let err = CloTable::load(file.path()).unwrap_err();
        assert!(matches!(err, TableError::Malformed { .. }));
    }

    #[test]
    fn test_new_normalizes_keys() {
        let table = CloTable::new(
            HashMap::from([("Jacket".to_string(), 0.3), ("SKIRT".to_string(), 0.15)]),
            0.0,
        )
        .expect("valid table");

        assert!(table.contains("jacket"));
        assert!(table.contains("Skirt"));
        assert!(!table.contains("shorts"));
    }
}
