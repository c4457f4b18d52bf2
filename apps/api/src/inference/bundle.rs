//! Model bundles: a trained estimator plus the preprocessing metadata recorded
//! when it was trained. Bundles are JSON files, loaded read-only and never mutated.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::inference::embedding::EmbedError;
use crate::inference::estimator::{Estimator, StandardScaler};

pub const BUNDLE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("model bundle not found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read model bundle at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model bundle at {} is not readable: {source}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("model bundle at {} has no embedded model", path.display())]
    MissingModel { path: PathBuf },

    #[error("model bundle at {} is invalid: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("model bundle at {} was not loaded at startup", path.display())]
    Unavailable { path: PathBuf },

    #[error("text embedder unavailable: {0}")]
    Embedder(#[from] EmbedError),
}

/// Wire shape of a bundle file. Every field is optional here so that a missing
/// model is reported as a structural problem rather than a parse error.
#[derive(Debug, Deserialize)]
struct RawBundle {
    #[serde(default = "default_format_version")]
    format_version: u32,
    model: Option<Estimator>,
    #[serde(default, alias = "model_columns", alias = "feature_names")]
    feature_columns: Vec<String>,
    #[serde(default)]
    ordinal_maps: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    rare_categories: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    scaler: Option<StandardScaler>,
    #[serde(default, alias = "priority_map")]
    label_map: Option<BTreeMap<i64, String>>,
}

fn default_format_version() -> u32 {
    BUNDLE_FORMAT_VERSION
}

/// A validated model bundle.
///
/// `feature_columns` is the training-time column order; every feature vector
/// handed to `estimator` is laid out in exactly this order.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub estimator: Estimator,
    pub feature_columns: Vec<String>,
    pub ordinal_maps: BTreeMap<String, BTreeMap<String, f64>>,
    pub rare_categories: BTreeMap<String, BTreeSet<String>>,
    pub scaler: Option<StandardScaler>,
    pub label_map: Option<BTreeMap<i64, String>>,
}

/// Reads a bundle file, separating "missing" from other I/O failures.
pub fn read_bundle_file(path: &Path) -> Result<String, BundleError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            BundleError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            BundleError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

impl ModelBundle {
    /// Reads and validates a bundle file.
    pub fn load(path: &Path) -> Result<Self, BundleError> {
        let text = read_bundle_file(path)?;
        let bundle = Self::from_json(&text, path)?;
        info!(
            "Loaded {} bundle from {} ({} columns)",
            bundle.estimator.kind_name(),
            path.display(),
            bundle.feature_columns.len()
        );
        Ok(bundle)
    }

    /// Parses and validates bundle JSON. `origin` is only used in error messages.
    pub fn from_json(text: &str, origin: &Path) -> Result<Self, BundleError> {
        let raw: RawBundle = serde_json::from_str(text).map_err(|source| BundleError::Format {
            path: origin.to_path_buf(),
            source,
        })?;
        Self::try_from_raw(raw, origin)
    }

    fn try_from_raw(raw: RawBundle, origin: &Path) -> Result<Self, BundleError> {
        let invalid = |reason: String| BundleError::Invalid {
            path: origin.to_path_buf(),
            reason,
        };

        if raw.format_version != BUNDLE_FORMAT_VERSION {
            return Err(invalid(format!(
                "unsupported format version {} (expected {BUNDLE_FORMAT_VERSION})",
                raw.format_version
            )));
        }
        let estimator = raw.model.ok_or_else(|| BundleError::MissingModel {
            path: origin.to_path_buf(),
        })?;
        if raw.feature_columns.is_empty() {
            return Err(invalid("no feature columns recorded".to_string()));
        }
        let unique: BTreeSet<&str> = raw.feature_columns.iter().map(String::as_str).collect();
        if unique.len() != raw.feature_columns.len() {
            return Err(invalid("duplicate feature column".to_string()));
        }
        if estimator.n_features() != raw.feature_columns.len() {
            return Err(invalid(format!(
                "model expects {} features but {} columns are recorded",
                estimator.n_features(),
                raw.feature_columns.len()
            )));
        }
        estimator.validate().map_err(invalid)?;

        Ok(ModelBundle {
            estimator,
            feature_columns: raw.feature_columns,
            ordinal_maps: raw.ordinal_maps,
            rare_categories: raw.rare_categories,
            scaler: raw.scaler,
            label_map: raw.label_map,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::testing::{priority_bundle_json, write_bundle};

    #[test]
    fn test_load_priority_bundle_with_legacy_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bundle(dir.path(), "priority.json", &priority_bundle_json());

        let bundle = ModelBundle::load(&path).unwrap();
        assert_eq!(bundle.feature_columns.len(), 8);
        assert_eq!(bundle.feature_columns[0], "years_exp_min");
        let labels = bundle.label_map.unwrap();
        assert_eq!(labels.get(&2).map(String::as_str), Some("High"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelBundle::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, BundleError::NotFound { .. }));
    }

    #[test]
    fn test_garbage_file_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bundle(dir.path(), "bad.json", "\u{0}not json");
        assert!(matches!(
            ModelBundle::load(&path),
            Err(BundleError::Format { .. })
        ));
    }

    #[test]
    fn test_bundle_without_model_is_structural_failure() {
        let json = r#"{"feature_columns": ["a", "b"]}"#;
        let err = ModelBundle::from_json(json, Path::new("mem")).unwrap_err();
        assert!(matches!(err, BundleError::MissingModel { .. }));
    }

    #[test]
    fn test_column_count_must_match_model() {
        let json = r#"{
            "model": {"type": "linear_regression", "coefficients": [1.0, 2.0], "intercept": 0.0},
            "feature_columns": ["only_one"]
        }"#;
        let err = ModelBundle::from_json(json, Path::new("mem")).unwrap_err();
        assert!(matches!(err, BundleError::Invalid { .. }));
    }

    #[test]
    fn test_unknown_format_version_is_rejected() {
        let json = r#"{
            "format_version": 9,
            "model": {"type": "linear_regression", "coefficients": [1.0], "intercept": 0.0},
            "feature_columns": ["a"]
        }"#;
        let err = ModelBundle::from_json(json, Path::new("mem")).unwrap_err();
        assert!(err.to_string().contains("format version 9"));
    }

    #[test]
    fn test_scaler_shape_is_not_checked_at_load() {
        let json = r#"{
            "model": {"type": "linear_regression", "coefficients": [1.0], "intercept": 0.0},
            "model_columns": ["a"],
            "scaler": {"mean": [0.0, 0.0], "scale": [1.0, 1.0]}
        }"#;
        assert!(ModelBundle::from_json(json, Path::new("mem")).is_ok());
    }
}
