//! HTTP handler functions for the crash cause API.

use std::sync::PoisonError;

use actix_web::{HttpResponse, web};
use chrono::Datelike as _;
use crash_cause_records::CrashRecord;
use crash_cause_server_models::{
    ApiAccident, ApiAccidentCreated, ApiError, ApiHealth, ApiNotFound, ApiPrediction, ApiStatus,
    NewAccidentRequest, PredictRequest,
};

use crate::AppState;

/// `GET /`
pub async fn status() -> HttpResponse {
    HttpResponse::Ok().json(ApiStatus {
        status: "API ONLINE".to_string(),
        mode: "ML + accident data".to_string(),
    })
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /predict_calle`
///
/// Resolves the street in the request body and returns its most likely
/// accident causes. Inference runs on the blocking thread pool.
pub async fn predict_street(
    state: web::Data<AppState>,
    body: web::Json<PredictRequest>,
) -> HttpResponse {
    let query = body.into_inner().nombre;

    let outcome = {
        let state = state.clone();
        let query = query.clone();
        web::block(move || state.service.predict(&query, state.repository.as_ref())).await
    };

    match outcome {
        Ok(Ok(result)) => HttpResponse::Ok().json(ApiPrediction::from(result)),
        Ok(Err(e)) if e.is_not_found() => {
            log::debug!("No data for '{query}'");
            HttpResponse::NotFound().json(ApiNotFound::for_query(&query))
        }
        Ok(Err(e)) => {
            log::error!("Prediction failed for '{query}': {e}");
            HttpResponse::InternalServerError().json(ApiError {
                error: e.to_string(),
            })
        }
        Err(e) => {
            log::error!("Prediction task failed for '{query}': {e}");
            HttpResponse::InternalServerError().json(ApiError {
                error: e.to_string(),
            })
        }
    }
}

/// `GET /data/accidents`
///
/// Lists the accidents loaded at startup, numbered from 1, followed by
/// every accident added since, with the id it was created with.
pub async fn accidents(state: web::Data<AppState>) -> HttpResponse {
    let accidents = state
        .accidents
        .read()
        .unwrap_or_else(PoisonError::into_inner);

    HttpResponse::Ok().json(&*accidents)
}

/// `POST /data/afegirAccident`
///
/// Appends a reported accident, stamped with the current year. The
/// accident joins the dataset used by later predictions.
pub async fn add_accident(
    state: web::Data<AppState>,
    body: web::Json<NewAccidentRequest>,
) -> HttpResponse {
    let request = body.into_inner();
    let now = chrono::Utc::now();

    let record = CrashRecord::reported(
        &state.columns,
        now.year(),
        &request.district,
        &request.street,
        request.latitude,
        request.longitude,
    );

    let accident = ApiAccident {
        id: now.timestamp_millis(),
        year: record.year,
        district: record.district.clone(),
        street: record.street.clone(),
        latitude: request.latitude,
        longitude: request.longitude,
    };

    state.repository.append(record);
    state
        .accidents
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(accident.clone());
    log::info!(
        "Accident added on '{}' ({} records)",
        request.street,
        state.repository.len()
    );

    HttpResponse::Created().json(ApiAccidentCreated {
        missatge: "Accident afegit".to_string(),
        accident,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, RwLock};

    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use crash_cause_model::{
        Classifier, ClassifierError, ColumnOrder, EncoderTables, FeatureEncoder, ModelArtifacts,
    };
    use crash_cause_prediction::PredictionService;
    use crash_cause_records::{DatasetColumns, InMemoryRecordRepository};
    use crash_cause_resolver::StreetResolver;
    use serde_json::{Value, json};

    use super::*;
    use crate::{accident_listing, configure};

    /// Returns the same distribution for every row, or fails if `broken`.
    struct FixedClassifier {
        labels: Vec<String>,
        probabilities: Vec<f64>,
        broken: bool,
    }

    impl Classifier for FixedClassifier {
        fn predict_probabilities(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
            if self.broken {
                return Err(ClassifierError::FeatureCount {
                    expected: features.len() + 1,
                    actual: features.len(),
                });
            }
            Ok(self.probabilities.clone())
        }

        fn labels(&self) -> &[String] {
            &self.labels
        }
    }

    fn state(broken: bool, accidents_limit: usize) -> AppState {
        let columns = DatasetColumns::default();
        let classifier = FixedClassifier {
            labels: vec![
                "Avançament indegut".to_string(),
                "Excés de velocitat".to_string(),
                "Altres".to_string(),
            ],
            probabilities: vec![0.6, 0.3, 0.1],
            broken,
        };
        let artifacts = ModelArtifacts {
            classifier: Arc::new(classifier),
            encoder: FeatureEncoder::new(
                EncoderTables::new(),
                ColumnOrder::new(vec![columns.district.clone()]),
            ),
        };

        let mut without_coordinates =
            CrashRecord::reported(&columns, 2021, "Eixample", "Carrer d'Aragó", 41.39, 2.16);
        without_coordinates.longitude = None;

        let records = vec![
            CrashRecord::reported(&columns, 2022, "Les Corts", "AVINGUDA DIAGONAL", 41.38, 2.12),
            without_coordinates,
            CrashRecord::reported(&columns, 2023, "Sant Martí", "AVINGUDA DIAGONAL", 41.40, 2.19),
        ];

        AppState {
            accidents: RwLock::new(accident_listing(&records, accidents_limit)),
            repository: Arc::new(InMemoryRecordRepository::new(records)),
            service: Arc::new(PredictionService::new(artifacts, StreetResolver::default())),
            columns,
        }
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn status_and_health() {
        let app = app!(state(false, 1000));

        let status: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request())
                .await;
        assert_eq!(status["status"], "API ONLINE");

        let health: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/health").to_request(),
        )
        .await;
        assert_eq!(health["healthy"], true);
    }

    #[actix_web::test]
    async fn predicts_a_known_street() {
        let app = app!(state(false, 1000));

        let req = test::TestRequest::post()
            .uri("/predict_calle")
            .set_json(json!({ "nombre": "Av. Diagonal" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["calle"], "AVINGUDA DIAGONAL");
        assert_eq!(body["top_3"][0]["causa"], "Avançament indegut");
        assert_eq!(body["top_3"][0]["probabilitat"], 60.0);
        assert_eq!(body["top_3"].as_array().map(Vec::len), Some(3));
        assert_eq!(body["probabilitats_completes"]["Altres"], 10.0);
    }

    #[actix_web::test]
    async fn unknown_street_is_404() {
        let app = app!(state(false, 1000));

        let req = test::TestRequest::post()
            .uri("/predict_calle")
            .set_json(json!({ "nombre": "Carrer Inventat" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], "No hay datos para 'Carrer Inventat'");
        assert_eq!(body["nombre"], "Carrer Inventat");
    }

    #[actix_web::test]
    async fn classifier_failure_is_500() {
        let app = app!(state(true, 1000));

        let req = test::TestRequest::post()
            .uri("/predict_calle")
            .set_json(json!({ "nombre": "Diagonal" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn lists_only_complete_accidents() {
        let app = app!(state(false, 1000));

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/data/accidents").to_request(),
        )
        .await;

        let accidents = body.as_array().unwrap();
        assert_eq!(accidents.len(), 2);
        assert_eq!(accidents[0]["id"], 1);
        assert_eq!(accidents[1]["id"], 2);
        assert_eq!(accidents[1]["Nom_districte"], "Sant Martí");
        assert_eq!(accidents[1]["Nk_Any"], 2023);
    }

    #[actix_web::test]
    async fn accident_list_is_limited() {
        let app = app!(state(false, 1));

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/data/accidents").to_request(),
        )
        .await;

        assert_eq!(body.as_array().map(Vec::len), Some(1));
    }

    #[actix_web::test]
    async fn added_accident_is_listed_and_predictable() {
        let app = app!(state(false, 1000));

        let req = test::TestRequest::post()
            .uri("/data/afegirAccident")
            .set_json(json!({
                "Nom_districte": "Gràcia",
                "Nom_carrer": "Carrer de Verdi",
                "Latitud": 41.40,
                "Longitud": 2.16
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["missatge"], "Accident afegit");
        assert_eq!(created["accident"]["Nom_carrer"], "Carrer de Verdi");
        assert!(created["accident"]["Nk_Any"].as_i64().is_some());

        let listed: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/data/accidents").to_request(),
        )
        .await;
        assert_eq!(listed.as_array().map(Vec::len), Some(3));

        let req = test::TestRequest::post()
            .uri("/predict_calle")
            .set_json(json!({ "nombre": "Carrer de Verdi" }))
            .to_request();
        let prediction: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(prediction["calle"], "Carrer de Verdi");
    }

    #[actix_web::test]
    async fn added_accident_is_listed_beyond_the_limit_with_its_id() {
        let app = app!(state(false, 1));

        let req = test::TestRequest::post()
            .uri("/data/afegirAccident")
            .set_json(json!({
                "Nom_districte": "Gràcia",
                "Nom_carrer": "Carrer de Verdi",
                "Latitud": 41.40,
                "Longitud": 2.16
            }))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["accident"]["id"].as_i64().unwrap();

        let listed: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/data/accidents").to_request(),
        )
        .await;

        let accidents = listed.as_array().unwrap();
        assert_eq!(accidents.len(), 2);
        assert_eq!(accidents[0]["id"], 1);
        assert_eq!(accidents[0]["Nom_districte"], "Les Corts");
        assert_eq!(accidents[1]["id"], id);
        assert_eq!(accidents[1]["Nom_carrer"], "Carrer de Verdi");
    }

    #[actix_web::test]
    async fn malformed_body_is_rejected() {
        let app = app!(state(false, 1000));

        let req = test::TestRequest::post()
            .uri("/data/afegirAccident")
            .set_json(json!({ "Nom_carrer": "Carrer de Verdi" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
