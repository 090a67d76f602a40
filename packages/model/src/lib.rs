#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Accident cause classifier and its training-time feature encoding.
//!
//! The classifier, the per-column category tables, and the feature column
//! order are produced together by the offline training pipeline and are
//! only valid together. [`ModelArtifacts::load`] reads all three and
//! refuses to start on any inconsistency; afterwards everything here is
//! immutable and shared read-only.

pub mod artifacts;
pub mod classifier;
pub mod encoder;
pub mod forest;

pub use artifacts::{ArtifactError, ArtifactPaths, ModelArtifacts};
pub use classifier::{Classifier, ClassifierError};
pub use encoder::{
    ColumnOrder, EncodedRow, EncoderTable, EncoderTables, FeatureEncoder, UNSEEN_CATEGORY,
};
pub use forest::{DecisionTree, ForestClassifier, ForestError, TreeNode};
