//! Loading of the pre-built model artifacts.
//!
//! Three JSON files produced by the training pipeline:
//!
//! - `columns.json`: feature column names in training order
//! - `encoders.json`: category list per categorical column
//! - `forest.json`: the random forest classifier
//!
//! Loading validates that the three agree with each other. Any failure
//! here means the service cannot serve predictions.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::classifier::Classifier;
use crate::encoder::{ColumnOrder, EncoderTables, FeatureEncoder};
use crate::forest::{ForestClassifier, ForestError};

/// Default file name of the column order artifact.
pub const COLUMNS_FILE: &str = "columns.json";

/// Default file name of the encoder tables artifact.
pub const ENCODERS_FILE: &str = "encoders.json";

/// Default file name of the classifier artifact.
pub const FOREST_FILE: &str = "forest.json";

/// Errors from loading model artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// I/O error reading an artifact.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Artifact path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Artifact is not valid JSON of the expected shape.
    #[error("Malformed artifact {path}: {source}")]
    Json {
        /// Artifact path.
        path: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Classifier structure is invalid.
    #[error("Invalid classifier: {0}")]
    InvalidModel(#[from] ForestError),

    /// Column order is empty.
    #[error("Column order is empty")]
    EmptyColumns,

    /// Column order lists a column twice.
    #[error("Column '{column}' appears more than once in the column order")]
    DuplicateColumn {
        /// The repeated column.
        column: String,
    },

    /// The target column is listed as a feature.
    #[error("Target column '{column}' is listed as a feature")]
    TargetAsFeature {
        /// The target column.
        column: String,
    },

    /// Classifier feature count differs from the column count.
    #[error("Classifier expects {expected} features but the column order has {actual}")]
    ColumnMismatch {
        /// Classifier feature count.
        expected: usize,
        /// Column order length.
        actual: usize,
    },

    /// The target column's category table disagrees with the classifier
    /// labels.
    #[error("Classifier labels do not match the '{column}' categories")]
    LabelMismatch {
        /// The target column.
        column: String,
    },
}

/// Locations of the three artifact files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Column order file.
    pub columns: PathBuf,
    /// Encoder tables file.
    pub encoders: PathBuf,
    /// Classifier file.
    pub classifier: PathBuf,
}

impl ArtifactPaths {
    /// Default file names inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            columns: dir.join(COLUMNS_FILE),
            encoders: dir.join(ENCODERS_FILE),
            classifier: dir.join(FOREST_FILE),
        }
    }
}

/// A loaded, mutually consistent classifier and encoder.
#[derive(Clone)]
pub struct ModelArtifacts {
    /// The classifier.
    pub classifier: Arc<dyn Classifier>,
    /// Encoder holding the category tables and column order.
    pub encoder: FeatureEncoder,
}

impl std::fmt::Debug for ModelArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifacts")
            .field("labels", &self.classifier.labels())
            .field("encoder", &self.encoder)
            .finish_non_exhaustive()
    }
}

impl ModelArtifacts {
    /// Loads and cross-checks the artifacts.
    ///
    /// `target_column` is the dataset's label column.
    ///
    /// # Errors
    ///
    /// Returns an [`ArtifactError`] if a file is missing or malformed, or
    /// if the artifacts are inconsistent with each other.
    pub fn load(paths: &ArtifactPaths, target_column: &str) -> Result<Self, ArtifactError> {
        let columns: ColumnOrder = read_json(&paths.columns)?;
        let tables: EncoderTables = read_json(&paths.encoders)?;
        let forest: ForestClassifier = read_json(&paths.classifier)?;

        let artifacts = Self::from_parts(forest, tables, columns, target_column)?;

        log::info!(
            "Loaded model: {} features, {} categorical, {} labels",
            artifacts.encoder.columns().len(),
            artifacts.encoder.tables().len(),
            artifacts.labels().len()
        );

        Ok(artifacts)
    }

    /// Validates already deserialized artifacts.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn from_parts(
        forest: ForestClassifier,
        tables: EncoderTables,
        columns: ColumnOrder,
        target_column: &str,
    ) -> Result<Self, ArtifactError> {
        forest.validate()?;

        if columns.is_empty() {
            return Err(ArtifactError::EmptyColumns);
        }

        let mut seen = HashSet::new();
        for column in columns.as_slice() {
            if !seen.insert(column.as_str()) {
                return Err(ArtifactError::DuplicateColumn {
                    column: column.clone(),
                });
            }
        }

        if seen.contains(target_column) {
            return Err(ArtifactError::TargetAsFeature {
                column: target_column.to_string(),
            });
        }

        if forest.n_features != columns.len() {
            return Err(ArtifactError::ColumnMismatch {
                expected: forest.n_features,
                actual: columns.len(),
            });
        }

        if let Some(target) = tables.get(target_column)
            && target.categories() != forest.labels.as_slice()
        {
            return Err(ArtifactError::LabelMismatch {
                column: target_column.to_string(),
            });
        }

        for column in tables.keys() {
            if column != target_column && !seen.contains(column.as_str()) {
                log::debug!("Encoder table for '{column}' is not a feature column");
            }
        }

        Ok(Self {
            classifier: Arc::new(forest),
            encoder: FeatureEncoder::new(tables, columns),
        })
    }

    /// The classifier's label vocabulary.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        self.classifier.labels()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = std::fs::read(path).map_err(|e| ArtifactError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Json {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use crate::encoder::EncoderTable;
    use crate::forest::{DecisionTree, TreeNode};

    use super::*;

    const TARGET: &str = "Descripcio_causa_mediata";

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    fn forest(n_features: usize) -> ForestClassifier {
        ForestClassifier {
            labels: strings(&["Altres", "Excés de velocitat"]),
            n_features,
            trees: vec![DecisionTree {
                nodes: vec![TreeNode::Leaf {
                    distribution: vec![1.0, 3.0],
                }],
            }],
        }
    }

    fn tables() -> EncoderTables {
        EncoderTables::from([
            (
                "Nom_districte".to_string(),
                EncoderTable::from(strings(&["Eixample", "Gràcia"])),
            ),
            (
                TARGET.to_string(),
                EncoderTable::from(strings(&["Altres", "Excés de velocitat"])),
            ),
        ])
    }

    fn columns(names: &[&str]) -> ColumnOrder {
        ColumnOrder::new(strings(names))
    }

    #[test]
    fn accepts_consistent_artifacts() {
        let artifacts =
            ModelArtifacts::from_parts(forest(2), tables(), columns(&["Nk_Any", "Nom_districte"]), TARGET)
                .unwrap();

        assert_eq!(artifacts.labels(), strings(&["Altres", "Excés de velocitat"]).as_slice());
        assert_eq!(
            artifacts.classifier.predict_probabilities(&[1.0, 0.0]).unwrap(),
            vec![0.25, 0.75]
        );
    }

    #[test]
    fn rejects_feature_count_mismatch() {
        let err = ModelArtifacts::from_parts(forest(3), tables(), columns(&["Nk_Any", "Nom_districte"]), TARGET)
            .unwrap_err();

        assert!(matches!(
            err,
            ArtifactError::ColumnMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn rejects_duplicate_columns() {
        let err = ModelArtifacts::from_parts(forest(2), tables(), columns(&["Nk_Any", "Nk_Any"]), TARGET)
            .unwrap_err();

        assert!(matches!(err, ArtifactError::DuplicateColumn { column } if column == "Nk_Any"));
    }

    #[test]
    fn rejects_target_as_feature() {
        let err = ModelArtifacts::from_parts(forest(2), tables(), columns(&["Nk_Any", TARGET]), TARGET)
            .unwrap_err();

        assert!(matches!(err, ArtifactError::TargetAsFeature { .. }));
    }

    #[test]
    fn rejects_label_mismatch() {
        let mut tables = tables();
        tables.insert(
            TARGET.to_string(),
            EncoderTable::from(strings(&["Excés de velocitat", "Altres"])),
        );

        let err = ModelArtifacts::from_parts(forest(2), tables, columns(&["Nk_Any", "Nom_districte"]), TARGET)
            .unwrap_err();

        assert!(matches!(err, ArtifactError::LabelMismatch { .. }));
    }

    #[test]
    fn rejects_empty_columns() {
        let err = ModelArtifacts::from_parts(forest(0), tables(), columns(&[]), TARGET).unwrap_err();
        assert!(matches!(err, ArtifactError::EmptyColumns));
    }

    #[test]
    fn missing_files_are_io_errors() {
        let paths = ArtifactPaths::in_dir(Path::new("/nonexistent/crash_cause/model"));
        let err = ModelArtifacts::load(&paths, TARGET).unwrap_err();

        assert!(matches!(err, ArtifactError::Io { path, .. } if path.ends_with(COLUMNS_FILE)));
    }
}
