#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Accident cause ranking and prediction result types.
//!
//! Probabilities are carried as percentages rounded to two decimals, the
//! form in which they are shown to users.

use crash_cause_records_models::MatchMethod;
use serde::{Deserialize, Serialize};

/// Number of causes in a ranking's headline list.
pub const TOP_CAUSES: usize = 3;

/// A cause label with its probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CauseProbability {
    /// Cause description, as in the classifier's label vocabulary.
    pub cause: String,
    /// Probability as a percentage, rounded to two decimals.
    pub percentage: f64,
}

/// Aggregated cause distribution for a set of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CauseRanking {
    /// Up to [`TOP_CAUSES`] most probable causes, most probable first.
    pub top: Vec<CauseProbability>,
    /// Every cause, in label vocabulary order.
    pub distribution: Vec<CauseProbability>,
}

/// Result of predicting the likely accident causes for a street.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    /// Street name as it appears in the dataset.
    pub street: String,
    /// How the query was matched to [`Self::street`].
    pub matched_by: MatchMethod,
    /// Number of historical records aggregated.
    pub record_count: usize,
    /// Ranked causes.
    pub ranking: CauseRanking,
}
