//! Tokens dropped from street names before similarity comparison.
//!
//! Catalan road-type words and their abbreviations, plus the articles and
//! prepositions that join them to the street's proper name. Entries are
//! compared against already lowercased, accent-free tokens.

use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Road types and their common abbreviations.
const ROAD_TYPES: &[&str] = &[
    "carrer",
    "c",
    "avinguda",
    "av",
    "passeig",
    "pg",
    "ronda",
    "placa",
    "pl",
    "via",
    "rambla",
    "travessera",
    "ctra",
];

/// Articles and prepositions.
///
/// The multi-word entries never match a single whitespace-delimited
/// token; their words are covered by the single-word entries.
const CONNECTORS: &[&str] = &[
    "de les", "del", "de la", "de l", "dels", "de", "la", "el", "els", "les", "i",
];

static STOPWORDS: LazyLock<BTreeSet<&'static str>> =
    LazyLock::new(|| ROAD_TYPES.iter().chain(CONNECTORS).copied().collect());

/// Returns `true` if `token` should be dropped from a normalized street
/// name.
#[must_use]
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}
