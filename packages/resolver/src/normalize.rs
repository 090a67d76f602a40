//! Street name normalization.
//!
//! Provides a deterministic normalization pipeline applied symmetrically
//! to user queries and to dataset street names before fuzzy comparison.
//! This ensures that "Av. Aragó" and "CARRER D'ARAGO" both reduce to
//! "arago". Normalized forms are only ever compared, never returned to
//! callers.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::stopwords;

/// Normalizes a street name or query.
///
/// The pipeline:
/// 1. Lowercase and trim
/// 2. Unicode NFD decomposition, dropping combining marks (accents)
/// 3. Replace `.`, `-` and `'` with a space
/// 4. Drop road-type and connector tokens (see [`stopwords`])
/// 5. Join the surviving tokens with single spaces
///
/// Normalizing an already normalized string returns it unchanged.
#[must_use]
pub fn normalize(input: &str) -> String {
    let lowered = input.to_lowercase();
    let stripped: String = lowered
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            '.' | '-' | '\'' => ' ',
            c => c,
        })
        .collect();

    stripped
        .split_whitespace()
        .filter(|token| !stopwords::is_stopword(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes an optional value. A missing value normalizes to an empty
/// string.
#[must_use]
pub fn normalize_optional(input: Option<&str>) -> String {
    input.map(normalize).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_road_type_abbreviation_and_accents() {
        assert_eq!(normalize("Av. Aragó"), "arago");
    }

    #[test]
    fn strips_road_type_and_preposition() {
        assert_eq!(normalize("AVINGUDA DE SARRIÀ"), "sarria");
    }

    #[test]
    fn splits_on_apostrophe() {
        assert_eq!(normalize("Carrer d'Aragó"), "d arago");
        assert_eq!(normalize("Travessera de l'Hospital"), "l hospital");
    }

    #[test]
    fn splits_on_hyphen_and_collapses_whitespace() {
        assert_eq!(normalize("  Pg.   Sant-Joan  "), "sant joan");
    }

    #[test]
    fn drops_cedilla_before_stopword_check() {
        // "Plaça" decomposes to "placa", which is a road type.
        assert_eq!(normalize("Plaça de Catalunya"), "catalunya");
    }

    #[test]
    fn keeps_multiple_proper_name_tokens() {
        assert_eq!(
            normalize("Gran Via de les Corts Catalanes"),
            "gran corts catalanes"
        );
    }

    #[test]
    fn only_stopwords_normalize_to_empty() {
        assert_eq!(normalize("Carrer de la"), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn missing_value_normalizes_to_empty() {
        assert_eq!(normalize_optional(None), "");
        assert_eq!(normalize_optional(Some("Ronda del Mig")), "mig");
    }

    #[test]
    fn is_idempotent() {
        for input in [
            "Av. Aragó",
            "AVINGUDA DE SARRIÀ",
            "Carrer d'Aragó",
            "Passeig de Gràcia",
            "Ctra. de Sant Cugat - Rabassada",
            "Rambla del Poblenou",
            "Via Augusta",
            "Ç",
            "",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }
}
