//! Aggregation of per-record class probabilities into a cause ranking.

use crash_cause_model::{Classifier, EncodedRow};
use crash_cause_prediction_models::{CauseProbability, CauseRanking, TOP_CAUSES};

use crate::PredictionError;

/// Runs the classifier on every row and ranks the mean distribution.
///
/// # Errors
///
/// * [`PredictionError::EmptySelection`] if `rows` is empty
/// * [`PredictionError::Classifier`] if inference fails on a row
/// * [`PredictionError::ProbabilityShape`] if a probability vector does
///   not have one entry per label
pub fn aggregate(rows: &[EncodedRow], classifier: &dyn Classifier) -> Result<CauseRanking, PredictionError> {
    if rows.is_empty() {
        return Err(PredictionError::EmptySelection);
    }

    let labels = classifier.labels();
    let mut sum = vec![0.0; labels.len()];

    for row in rows {
        let probabilities = classifier.predict_probabilities(row)?;
        if probabilities.len() != labels.len() {
            return Err(PredictionError::ProbabilityShape {
                expected: labels.len(),
                actual: probabilities.len(),
            });
        }
        for (total, p) in sum.iter_mut().zip(&probabilities) {
            *total += p;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let n = rows.len() as f64;
    let mean: Vec<f64> = sum.into_iter().map(|total| total / n).collect();

    Ok(rank(&mean, labels))
}

/// Ranks a probability distribution over `labels`.
///
/// Percentages are rounded before sorting. Equal percentages keep label
/// vocabulary order.
#[must_use]
pub fn rank(probabilities: &[f64], labels: &[String]) -> CauseRanking {
    let distribution: Vec<CauseProbability> = labels
        .iter()
        .zip(probabilities)
        .map(|(label, p)| CauseProbability {
            cause: label.clone(),
            percentage: to_percentage(*p),
        })
        .collect();

    let mut sorted = distribution.clone();
    // Stable: ties stay in vocabulary order.
    sorted.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    sorted.truncate(TOP_CAUSES);

    CauseRanking {
        top: sorted,
        distribution,
    }
}

/// Converts a probability to a percentage rounded to two decimals.
fn to_percentage(p: f64) -> f64 {
    (p * 100.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use crash_cause_model::ClassifierError;

    use super::*;

    /// Returns the probability vector at index `features[0]`.
    struct TableClassifier {
        labels: Vec<String>,
        rows: Vec<Vec<f64>>,
    }

    impl Classifier for TableClassifier {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        fn predict_probabilities(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
            Ok(self.rows[features[0] as usize].clone())
        }

        fn labels(&self) -> &[String] {
            &self.labels
        }
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    fn cause(name: &str, percentage: f64) -> CauseProbability {
        CauseProbability {
            cause: name.to_string(),
            percentage,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn index_rows(n: usize) -> Vec<EncodedRow> {
        (0..n).map(|i| vec![i as f64]).collect()
    }

    #[test]
    fn averages_rows_and_ranks_top_three() {
        let classifier = TableClassifier {
            labels: labels(&["Avançament indegut", "Excés de velocitat", "Altres"]),
            rows: vec![
                vec![0.6, 0.3, 0.1],
                vec![0.5, 0.4, 0.1],
                vec![0.7, 0.2, 0.1],
            ],
        };

        let ranking = aggregate(&index_rows(3), &classifier).unwrap();

        assert_eq!(
            ranking.top,
            vec![
                cause("Avançament indegut", 60.0),
                cause("Excés de velocitat", 30.0),
                cause("Altres", 10.0),
            ]
        );
    }

    #[test]
    fn distribution_keeps_vocabulary_order() {
        let ranking = rank(&[0.1, 0.2, 0.3, 0.4], &labels(&["a", "b", "c", "d"]));

        assert_eq!(
            ranking.distribution,
            vec![cause("a", 10.0), cause("b", 20.0), cause("c", 30.0), cause("d", 40.0)]
        );
        assert_eq!(ranking.top, vec![cause("d", 40.0), cause("c", 30.0), cause("b", 20.0)]);
    }

    #[test]
    fn ties_break_by_vocabulary_order_not_alphabet() {
        let ranking = rank(&[0.1, 0.3, 0.3, 0.3], &labels(&["w", "z", "a", "m"]));

        assert_eq!(ranking.top, vec![cause("z", 30.0), cause("a", 30.0), cause("m", 30.0)]);
    }

    #[test]
    fn rounds_to_two_decimals() {
        let ranking = rank(&[0.123_456, 0.876_544], &labels(&["a", "b"]));

        assert_eq!(ranking.distribution, vec![cause("a", 12.35), cause("b", 87.65)]);
    }

    #[test]
    fn fewer_than_three_labels() {
        let ranking = rank(&[0.25, 0.75], &labels(&["a", "b"]));
        assert_eq!(ranking.top.len(), 2);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let classifier = TableClassifier {
            labels: labels(&["a", "b", "c", "d"]),
            rows: vec![
                vec![0.25, 0.25, 0.25, 0.25],
                vec![0.1, 0.2, 0.3, 0.4],
                vec![0.4, 0.3, 0.2, 0.1],
            ],
        };
        let rows = index_rows(3);

        let first = aggregate(&rows, &classifier).unwrap();
        for _ in 0..10 {
            assert_eq!(aggregate(&rows, &classifier).unwrap(), first);
        }
    }

    #[test]
    fn empty_rows_are_rejected() {
        let classifier = TableClassifier {
            labels: labels(&["a"]),
            rows: vec![],
        };

        assert!(matches!(
            aggregate(&[], &classifier),
            Err(PredictionError::EmptySelection)
        ));
    }

    #[test]
    fn wrong_probability_length_is_rejected() {
        let classifier = TableClassifier {
            labels: labels(&["a", "b"]),
            rows: vec![vec![1.0]],
        };

        assert!(matches!(
            aggregate(&index_rows(1), &classifier),
            Err(PredictionError::ProbabilityShape {
                expected: 2,
                actual: 1
            })
        ));
    }
}
