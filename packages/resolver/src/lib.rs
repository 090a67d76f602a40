#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Street resolution for free-text queries.
//!
//! Resolves a user-entered street name to one of the street names present
//! in the historical dataset.
//!
//! # Strategy
//!
//! 1. **Exact**: the raw query is a case-insensitive substring of a
//!    record's raw street. The first such record's street is returned
//!    as-is; normalization is not involved.
//! 2. **Fuzzy**: the query and every distinct street are
//!    [normalized](normalize::normalize), and each street is scored with
//!    the [sequence-matcher ratio](similarity::ratio) of street against
//!    query. The best candidate at or above the threshold wins; ties go
//!    to the street seen first in the dataset.

pub mod normalize;
pub mod similarity;
pub mod stopwords;

use std::sync::{Arc, PoisonError, RwLock};

use crash_cause_records_models::{CrashRecord, MatchMethod};

/// Default minimum similarity ratio for a fuzzy match.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.70;

/// Errors returned by [`StreetResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No street contains the query and none is similar enough.
    #[error("No street matches '{query}'")]
    NotFound {
        /// The raw query.
        query: String,
    },
}

/// A successfully resolved street.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The street name exactly as it appears in the dataset.
    pub street: String,
    /// How the street was matched.
    pub method: MatchMethod,
}

/// Returns a predicate matching records whose raw street contains
/// `query`, case-insensitively.
///
/// The query is lowercased once; records without a street never match.
pub fn street_matcher(query: &str) -> impl Fn(&CrashRecord) -> bool + use<> {
    let needle = query.to_lowercase();
    move |record| {
        record
            .street
            .as_deref()
            .is_some_and(|street| street.to_lowercase().contains(&needle))
    }
}

/// Distinct non-empty street names in first-seen order.
#[must_use]
pub fn canonical_streets(records: &[CrashRecord]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    records
        .iter()
        .filter_map(|r| r.street.as_deref())
        .filter(|street| !street.is_empty() && seen.insert(*street))
        .collect()
}

/// A canonical street paired with its normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreetCandidate {
    /// Street name as it appears in the dataset.
    pub original: String,
    /// Normalized form used for comparison.
    pub normalized: String,
}

/// Normalized canonical street set, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct CandidateIndex {
    candidates: Vec<StreetCandidate>,
    /// Address and length of the record slice the index was built from.
    source: (usize, usize),
}

impl CandidateIndex {
    /// Builds the index over the canonical streets of `records`.
    #[must_use]
    pub fn build(records: &[CrashRecord]) -> Self {
        let candidates: Vec<StreetCandidate> = canonical_streets(records)
            .into_iter()
            .map(|street| StreetCandidate {
                original: street.to_string(),
                normalized: normalize::normalize(street),
            })
            .collect();

        log::debug!(
            "Built street candidate index: {} streets from {} records",
            candidates.len(),
            records.len()
        );

        Self {
            candidates,
            source: slice_identity(records),
        }
    }

    /// The indexed candidates.
    #[must_use]
    pub fn candidates(&self) -> &[StreetCandidate] {
        &self.candidates
    }

    /// Highest-scoring candidate for an already normalized query whose
    /// score is at least `threshold`.
    ///
    /// Ties keep the earliest candidate.
    #[must_use]
    pub fn best_match(&self, normalized_query: &str, threshold: f64) -> Option<(&StreetCandidate, f64)> {
        let mut best: Option<(&StreetCandidate, f64)> = None;

        for candidate in &self.candidates {
            let score = similarity::ratio(&candidate.normalized, normalized_query);
            if score < threshold {
                continue;
            }
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((candidate, score));
            }
        }

        best
    }
}

/// Resolves raw street queries against a record set.
///
/// Caches the normalized candidate index for the last record slice seen,
/// keyed by the slice's address and length. Repository snapshots are
/// replaced rather than mutated, so a grown or different record set
/// always rebuilds the index.
#[derive(Debug)]
pub struct StreetResolver {
    threshold: f64,
    index: RwLock<Option<Arc<CandidateIndex>>>,
}

impl Default for StreetResolver {
    fn default() -> Self {
        Self::new(DEFAULT_FUZZY_THRESHOLD)
    }
}

impl StreetResolver {
    /// Creates a resolver accepting fuzzy matches scoring at least
    /// `threshold`.
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self {
            threshold,
            index: RwLock::new(None),
        }
    }

    /// The fuzzy match threshold.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Resolves `query` to a street name present in `records`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] if the query is blank, no raw
    /// street contains it, and no normalized street reaches the
    /// threshold.
    pub fn resolve(&self, query: &str, records: &[CrashRecord]) -> Result<Resolution, ResolveError> {
        let not_found = || ResolveError::NotFound {
            query: query.to_string(),
        };

        if query.trim().is_empty() {
            return Err(not_found());
        }

        let contains_query = street_matcher(query);
        if let Some(street) = records
            .iter()
            .find(|r| contains_query(r))
            .and_then(|r| r.street.clone())
        {
            log::debug!("Exact street match for '{query}': '{street}'");
            return Ok(Resolution {
                street,
                method: MatchMethod::Exact,
            });
        }

        let normalized = normalize::normalize(query);
        if normalized.is_empty() {
            log::debug!("Query '{query}' normalizes to nothing");
            return Err(not_found());
        }

        let index = self.index_for(records);
        let Some((candidate, score)) = index.best_match(&normalized, self.threshold) else {
            log::debug!("No street within threshold {} for '{query}'", self.threshold);
            return Err(not_found());
        };

        log::debug!(
            "Fuzzy street match for '{query}' ('{normalized}'): '{}' (score {score:.3})",
            candidate.original
        );

        Ok(Resolution {
            street: candidate.original.clone(),
            method: MatchMethod::Fuzzy { score },
        })
    }

    /// Returns the cached index if it was built from `records`, otherwise
    /// rebuilds it.
    fn index_for(&self, records: &[CrashRecord]) -> Arc<CandidateIndex> {
        if let Some(index) = self
            .index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|index| index.source == slice_identity(records))
        {
            return Arc::clone(index);
        }

        let index = Arc::new(CandidateIndex::build(records));
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&index));
        index
    }
}

fn slice_identity(records: &[CrashRecord]) -> (usize, usize) {
    (records.as_ptr().addr(), records.len())
}
