#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Street-level accident cause prediction.
//!
//! [`PredictionService`] resolves a free-text street query, selects the
//! historical records on that street, encodes them the way the classifier
//! was trained, and [aggregates](aggregate::aggregate) the per-record
//! class probabilities into a ranked list of likely causes.

pub mod aggregate;
pub mod service;

use crash_cause_model::ClassifierError;
use crash_cause_resolver::ResolveError;

pub use crash_cause_prediction_models::{
    CauseProbability, CauseRanking, PredictionResult, TOP_CAUSES,
};
pub use service::PredictionService;

/// Errors that can occur while predicting causes for a street.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    /// No street in the dataset matches the query.
    #[error("No data for '{query}'")]
    NotFound {
        /// The raw query.
        query: String,
    },

    /// Classifier inference failed.
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    /// The classifier returned a probability vector of the wrong length.
    #[error("Classifier returned {actual} probabilities for {expected} labels")]
    ProbabilityShape {
        /// Label count.
        expected: usize,
        /// Returned vector length.
        actual: usize,
    },

    /// Aggregation was asked to rank zero records.
    #[error("No records to aggregate")]
    EmptySelection,
}

impl PredictionError {
    /// Whether this error means "no data for this street" rather than a
    /// failure of the service.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<ResolveError> for PredictionError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::NotFound { query } => Self::NotFound { query },
        }
    }
}
