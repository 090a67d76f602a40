//! Prediction orchestration.

use std::sync::Arc;

use crash_cause_model::{Classifier, FeatureEncoder, ModelArtifacts};
use crash_cause_prediction_models::PredictionResult;
use crash_cause_records::{CrashRecord, RecordRepository};
use crash_cause_resolver::{StreetResolver, street_matcher};

use crate::PredictionError;
use crate::aggregate::aggregate;

/// Predicts the likely accident causes on a street.
///
/// Holds the immutable model artifacts and the street resolver; safe to
/// share across threads.
pub struct PredictionService {
    resolver: StreetResolver,
    encoder: FeatureEncoder,
    classifier: Arc<dyn Classifier>,
}

impl std::fmt::Debug for PredictionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionService")
            .field("resolver", &self.resolver)
            .field("encoder", &self.encoder)
            .field("labels", &self.classifier.labels())
            .finish()
    }
}

impl PredictionService {
    /// Creates a service from loaded artifacts.
    #[must_use]
    pub fn new(artifacts: ModelArtifacts, resolver: StreetResolver) -> Self {
        Self {
            resolver,
            encoder: artifacts.encoder,
            classifier: artifacts.classifier,
        }
    }

    /// The street resolver.
    #[must_use]
    pub const fn resolver(&self) -> &StreetResolver {
        &self.resolver
    }

    /// Predicts causes for `query` against a snapshot of `repository`.
    ///
    /// # Errors
    ///
    /// See [`Self::predict_records`].
    pub fn predict(
        &self,
        query: &str,
        repository: &dyn RecordRepository,
    ) -> Result<PredictionResult, PredictionError> {
        let snapshot = repository.snapshot();
        self.predict_records(query, &snapshot)
    }

    /// Predicts causes for `query` against `records`.
    ///
    /// # Errors
    ///
    /// * [`PredictionError::NotFound`] if no street matches `query`
    /// * [`PredictionError::Classifier`] /
    ///   [`PredictionError::ProbabilityShape`] if inference fails
    pub fn predict_records(
        &self,
        query: &str,
        records: &[CrashRecord],
    ) -> Result<PredictionResult, PredictionError> {
        let resolution = self.resolver.resolve(query, records)?;

        let on_street = street_matcher(&resolution.street);
        let selected: Vec<&CrashRecord> = records.iter().filter(|r| on_street(r)).collect();

        if selected.is_empty() {
            log::warn!(
                "Street '{}' resolved for '{query}' but no records matched",
                resolution.street
            );
            return Err(PredictionError::NotFound {
                query: query.to_string(),
            });
        }

        let rows = self.encoder.encode(selected.iter().copied());
        let ranking = aggregate(&rows, self.classifier.as_ref())?;

        log::info!(
            "Predicted causes for '{query}' -> '{}' from {} records",
            resolution.street,
            rows.len()
        );

        Ok(PredictionResult {
            street: resolution.street,
            matched_by: resolution.method,
            record_count: rows.len(),
            ranking,
        })
    }
}
