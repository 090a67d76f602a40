#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for street-level accident cause prediction.
//!
//! Loads the historical crash dataset and the trained classifier once at
//! startup, then serves predictions for free-text street queries along
//! with read and append access to the accident list. The dataset lives in
//! memory; appended accidents are not persisted.

pub mod config;
mod handlers;
pub mod interactive;

use std::sync::{Arc, RwLock};

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use crash_cause_model::{ArtifactError, ArtifactPaths, ModelArtifacts};
use crash_cause_prediction::PredictionService;
use crash_cause_records::{
    CrashRecord, DatasetColumns, InMemoryRecordRepository, RecordRepository, RecordsError, loader,
};
use crash_cause_resolver::StreetResolver;
use crash_cause_server_models::ApiAccident;

pub use config::{ConfigError, ServerConfig};

/// Errors that prevent the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The historical dataset could not be loaded.
    #[error("Failed to load dataset: {0}")]
    Records(#[from] RecordsError),

    /// The model artifacts could not be loaded.
    #[error("Failed to load model artifacts: {0}")]
    Artifacts(#[from] ArtifactError),
}

impl From<StartupError> for std::io::Error {
    fn from(e: StartupError) -> Self {
        Self::other(e)
    }
}

/// Shared application state.
pub struct AppState {
    /// Historical and appended crash records.
    pub repository: Arc<dyn RecordRepository>,
    /// Prediction pipeline over the loaded model.
    pub service: Arc<PredictionService>,
    /// Dataset column names, used to build appended records.
    pub columns: DatasetColumns,
    /// Accidents served by `GET /data/accidents`: the listed part of the
    /// dataset followed by every accident added since startup.
    pub accidents: RwLock<Vec<ApiAccident>>,
}

/// Builds the initial accident listing: the first `limit` records that
/// have a year, district, street and coordinates, numbered from 1.
#[must_use]
pub fn accident_listing(records: &[CrashRecord], limit: usize) -> Vec<ApiAccident> {
    records
        .iter()
        .filter_map(|record| ApiAccident::from_record(0, record))
        .take(limit)
        .zip(1_i64..)
        .map(|(accident, id)| ApiAccident { id, ..accident })
        .collect()
}

/// Loads the dataset and model artifacts named by `config`.
///
/// # Errors
///
/// * [`StartupError::Records`] if the CSV directory cannot be read
/// * [`StartupError::Artifacts`] if the model artifacts are missing or
///   inconsistent
pub fn build_state(config: &ServerConfig) -> Result<AppState, StartupError> {
    log::info!("Loading dataset from {}...", config.data_dir.display());
    let records = loader::load_csv_dir(&config.data_dir, &config.columns)?;

    log::info!("Loading model artifacts from {}...", config.model_dir.display());
    let artifacts = ModelArtifacts::load(
        &ArtifactPaths::in_dir(&config.model_dir),
        &config.columns.target,
    )?;

    let service = PredictionService::new(artifacts, StreetResolver::new(config.fuzzy_threshold));

    let accidents = accident_listing(&records, config.accidents_limit);

    Ok(AppState {
        repository: Arc::new(InMemoryRecordRepository::new(records)),
        service: Arc::new(service),
        columns: config.columns.clone(),
        accidents: RwLock::new(accidents),
    })
}

/// Registers every route of the API.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::status))
        .route("/predict_calle", web::post().to(handlers::predict_street))
        .service(web::scope("/api").route("/health", web::get().to(handlers::health)))
        .service(
            web::scope("/data")
                .route("/accidents", web::get().to(handlers::accidents))
                .route("/afegirAccident", web::post().to(handlers::add_accident)),
        );
}

/// Starts the API server with configuration from the config file and the
/// environment.
///
/// The caller is responsible for initializing logging and providing the
/// async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if startup fails, or if the HTTP
/// server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let config = ServerConfig::load(None)
        .inspect_err(|e| log::error!("{e}"))
        .map_err(StartupError::from)?;

    run_server_with(config).await
}

/// Starts the API server with an explicit configuration.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the dataset or model cannot be
/// loaded, or if the HTTP server fails to bind or encounters a runtime
/// error.
#[allow(clippy::future_not_send)]
pub async fn run_server_with(config: ServerConfig) -> std::io::Result<()> {
    let state = build_state(&config).inspect_err(|e| log::error!("Startup failed: {e}"))?;
    let state = web::Data::new(state);

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}
