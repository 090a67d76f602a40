#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Crash record types and dataset column definitions.
//!
//! A [`CrashRecord`] keeps every raw cell of a historical accident row so
//! that feature encoding sees exactly the text the classifier was trained
//! on. The handful of fields the pipeline reads directly (street,
//! district, year, cause, coordinates) are extracted once through
//! [`DatasetColumns`] when the record is built.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Column names of the historical accident dataset.
///
/// Defaults match the Barcelona open data accident exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetColumns {
    /// Street name column.
    pub street: String,
    /// District name column.
    pub district: String,
    /// Year column.
    pub year: String,
    /// Target label column (accident cause description).
    pub target: String,
    /// Latitude column candidates; the first one present in a row wins.
    pub latitude: Vec<String>,
    /// Longitude column candidates; the first one present in a row wins.
    pub longitude: Vec<String>,
}

impl Default for DatasetColumns {
    fn default() -> Self {
        Self {
            street: "Nom_carrer".to_string(),
            district: "Nom_districte".to_string(),
            year: "Nk_Any".to_string(),
            target: "Descripcio_causa_mediata".to_string(),
            latitude: vec!["Latitud_WGS84".to_string(), "Latitud".to_string()],
            longitude: vec!["Longitud_WGS84".to_string(), "Longitud".to_string()],
        }
    }
}

/// A single historical accident row.
///
/// Immutable once built. Empty cells are absent from [`Self::fields`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashRecord {
    /// Raw street name, exactly as it appears in the dataset.
    pub street: Option<String>,
    /// District name.
    pub district: Option<String>,
    /// Year the accident happened.
    pub year: Option<i32>,
    /// Cause description (the classifier's target label).
    pub cause: Option<String>,
    /// Latitude (WGS84).
    pub latitude: Option<f64>,
    /// Longitude (WGS84).
    pub longitude: Option<f64>,
    /// Every non-empty raw cell of the row, keyed by column name.
    pub fields: BTreeMap<String, String>,
}

impl CrashRecord {
    /// Builds a record from raw cells, extracting the typed fields named
    /// by `columns`.
    ///
    /// Cells are trimmed except the street, which keeps its raw spelling.
    /// Blank cells are dropped.
    #[must_use]
    pub fn from_fields(fields: BTreeMap<String, String>, columns: &DatasetColumns) -> Self {
        let fields: BTreeMap<String, String> = fields
            .into_iter()
            .filter_map(|(k, v)| {
                if v.trim().is_empty() {
                    return None;
                }
                let v = if k == columns.street {
                    v
                } else {
                    v.trim().to_string()
                };
                Some((k, v))
            })
            .collect();

        let text = |name: &str| fields.get(name).cloned();
        let first_number = |names: &[String]| {
            names
                .iter()
                .find_map(|name| fields.get(name).and_then(|v| v.parse::<f64>().ok()))
        };

        Self {
            street: text(&columns.street),
            district: text(&columns.district),
            year: fields.get(&columns.year).and_then(|v| parse_year(v)),
            cause: text(&columns.target),
            latitude: first_number(&columns.latitude),
            longitude: first_number(&columns.longitude),
            fields,
        }
    }

    /// Builds a freshly reported accident with no cause or feature data
    /// beyond its location.
    ///
    /// The location values are also written into [`Self::fields`] so the
    /// record encodes like any other row.
    #[must_use]
    pub fn reported(
        columns: &DatasetColumns,
        year: i32,
        district: &str,
        street: &str,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(columns.year.clone(), year.to_string());
        fields.insert(columns.district.clone(), district.to_string());
        fields.insert(columns.street.clone(), street.to_string());
        if let Some(name) = columns.latitude.first() {
            fields.insert(name.clone(), latitude.to_string());
        }
        if let Some(name) = columns.longitude.first() {
            fields.insert(name.clone(), longitude.to_string());
        }

        Self::from_fields(fields, columns)
    }

    /// Returns the raw cell for `column`, if present.
    #[must_use]
    pub fn field(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

/// Parses a year cell. Accepts float-formatted values such as `"2021.0"`,
/// which appear when a year column contained blanks at export time.
#[allow(clippy::cast_possible_truncation)]
fn parse_year(raw: &str) -> Option<i32> {
    if let Ok(year) = raw.parse::<i32>() {
        return Some(year);
    }
    let value = raw.parse::<f64>().ok()?;
    (value.fract() == 0.0 && value.abs() < f64::from(i32::MAX)).then_some(value as i32)
}

/// How a raw query was matched to a canonical street.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MatchMethod {
    /// The query was a case-insensitive substring of a raw street name.
    Exact,
    /// The query's normalized form was similar enough to a street's
    /// normalized form.
    Fuzzy {
        /// Similarity ratio in `[0, 1]`.
        score: f64,
    },
}
