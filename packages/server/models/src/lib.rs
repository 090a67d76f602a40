#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the crash cause server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the pipeline's result types so the wire contract, whose field
//! names are fixed by existing clients, can evolve independently.

use crash_cause_prediction_models::{CauseProbability, PredictionResult};
use crash_cause_records_models::CrashRecord;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Body of `POST /predict_calle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Free-text street query.
    pub nombre: String,
}

/// A ranked cause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCause {
    /// Cause description.
    pub causa: String,
    /// Probability percentage, two decimals.
    pub probabilitat: f64,
}

impl From<CauseProbability> for ApiCause {
    fn from(cause: CauseProbability) -> Self {
        Self {
            causa: cause.cause,
            probabilitat: cause.percentage,
        }
    }
}

/// Full cause distribution, serialized as a JSON object whose keys keep
/// the label vocabulary order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiDistribution(pub Vec<(String, f64)>);

impl Serialize for ApiDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (cause, percentage) in &self.0 {
            map.serialize_entry(cause, percentage)?;
        }
        map.end()
    }
}

/// Successful response of `POST /predict_calle`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiPrediction {
    /// Resolved street name.
    pub calle: String,
    /// Up to three most probable causes.
    pub top_3: Vec<ApiCause>,
    /// Every cause with its percentage.
    pub probabilitats_completes: ApiDistribution,
}

impl From<PredictionResult> for ApiPrediction {
    fn from(result: PredictionResult) -> Self {
        Self {
            calle: result.street,
            top_3: result.ranking.top.into_iter().map(ApiCause::from).collect(),
            probabilitats_completes: ApiDistribution(
                result
                    .ranking
                    .distribution
                    .into_iter()
                    .map(|c| (c.cause, c.percentage))
                    .collect(),
            ),
        }
    }
}

/// Response of `POST /predict_calle` when no street matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiNotFound {
    /// Human-readable explanation.
    pub detail: String,
    /// The query as received.
    pub nombre: String,
}

impl ApiNotFound {
    /// Builds the "no data" response for `query`.
    #[must_use]
    pub fn for_query(query: &str) -> Self {
        Self {
            detail: format!("No hay datos para '{query}'"),
            nombre: query.to_string(),
        }
    }
}

/// An accident as returned by `GET /data/accidents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiAccident {
    /// Identifier.
    pub id: i64,
    /// Year.
    #[serde(rename = "Nk_Any")]
    pub year: Option<i32>,
    /// District.
    #[serde(rename = "Nom_districte")]
    pub district: Option<String>,
    /// Street.
    #[serde(rename = "Nom_carrer")]
    pub street: Option<String>,
    /// Latitude (WGS84).
    #[serde(rename = "Latitud")]
    pub latitude: f64,
    /// Longitude (WGS84).
    #[serde(rename = "Longitud")]
    pub longitude: f64,
}

impl ApiAccident {
    /// Builds the API view of `record`.
    ///
    /// Returns `None` unless the record has a year, district, street and
    /// coordinates.
    #[must_use]
    pub fn from_record(id: i64, record: &CrashRecord) -> Option<Self> {
        Some(Self {
            id,
            year: Some(record.year?),
            district: Some(record.district.clone()?),
            street: Some(record.street.clone()?),
            latitude: record.latitude?,
            longitude: record.longitude?,
        })
    }
}

/// Body of `POST /data/afegirAccident`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccidentRequest {
    /// District.
    #[serde(rename = "Nom_districte")]
    pub district: String,
    /// Street.
    #[serde(rename = "Nom_carrer")]
    pub street: String,
    /// Latitude (WGS84).
    #[serde(rename = "Latitud")]
    pub latitude: f64,
    /// Longitude (WGS84).
    #[serde(rename = "Longitud")]
    pub longitude: f64,
}

/// Response of `POST /data/afegirAccident`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiAccidentCreated {
    /// Confirmation message.
    pub missatge: String,
    /// The stored accident.
    pub accident: ApiAccident,
}

/// Response of `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiStatus {
    /// Service status line.
    pub status: String,
    /// Enabled features.
    pub mode: String,
}

/// Response of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Generic error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error description.
    pub error: String,
}
