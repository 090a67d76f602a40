//! Classifier abstraction.

/// Errors raised during classifier inference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifierError {
    /// The feature vector does not have the length the model was trained
    /// with.
    #[error("Expected {expected} features, got {actual}")]
    FeatureCount {
        /// Features the model expects.
        expected: usize,
        /// Features that were supplied.
        actual: usize,
    },
}

/// A trained probabilistic classifier.
///
/// Implementations are immutable after loading and shared across
/// concurrent requests.
pub trait Classifier: Send + Sync {
    /// Predicts class probabilities for one feature vector.
    ///
    /// The returned vector has one entry per label in [`Self::labels`],
    /// in the same order, summing to 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the features are not shaped like the training
    /// data.
    fn predict_probabilities(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError>;

    /// The ordered label vocabulary the classifier was trained on.
    fn labels(&self) -> &[String];
}
