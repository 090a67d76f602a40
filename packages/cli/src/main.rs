#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line interface for the crash cause toolchain.
//!
//! Runs street predictions locally, inspects the street set and the
//! normalizer, or starts the API server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crash_cause_records::{MatchMethod, loader};
use crash_cause_resolver::{canonical_streets, normalize::normalize};
use crash_cause_server::{ConfigError, ServerConfig, build_state};
use crash_cause_server_models::{ApiNotFound, ApiPrediction};

#[derive(Parser)]
#[command(name = "crash_cause", about = "Street-level accident cause prediction")]
struct Cli {
    /// Configuration file (overrides `CRASH_CAUSE_CONFIG`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory of historical accident CSV files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Directory of model artifacts
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the most likely accident causes on a street
    Predict {
        /// Street name, free text (e.g., "Av. Diagonal")
        query: String,
        /// Print the API JSON response instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List the distinct street names in the dataset
    Streets {
        /// Print the normalized form next to each street
        #[arg(long)]
        normalized: bool,
    },
    /// Print the normalized form of a street name
    Normalize {
        /// Text to normalize
        text: String,
    },
    /// Start the API server
    Serve {
        /// Prompt for bind address, port, and data locations first
        #[arg(long)]
        interactive: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let Cli {
        config,
        data_dir,
        model_dir,
        command,
    } = Cli::parse();

    let load_config = move || -> Result<ServerConfig, ConfigError> {
        let mut config = ServerConfig::load(config.as_deref())?;
        if let Some(dir) = data_dir {
            config.data_dir = dir;
        }
        if let Some(dir) = model_dir {
            config.model_dir = dir;
        }
        Ok(config)
    };

    match command {
        Commands::Normalize { text } => {
            println!("{}", normalize(&text));
        }
        Commands::Predict { query, json } => {
            let state = build_state(&load_config()?)?;

            match state.service.predict(&query, state.repository.as_ref()) {
                Ok(result) => {
                    if json {
                        let body = ApiPrediction::from(result);
                        println!("{}", serde_json::to_string_pretty(&body)?);
                    } else {
                        let matched = match result.matched_by {
                            MatchMethod::Exact => "exact".to_string(),
                            MatchMethod::Fuzzy { score } => format!("fuzzy, {score:.2}"),
                        };
                        println!(
                            "{} ({matched}, {} accidents)",
                            result.street, result.record_count
                        );
                        println!("{}", "-".repeat(50));
                        for (rank, cause) in result.ranking.top.iter().enumerate() {
                            println!("{}. {:<38} {:>6.2}%", rank + 1, cause.cause, cause.percentage);
                        }
                    }
                }
                Err(e) if e.is_not_found() => {
                    eprintln!("{}", ApiNotFound::for_query(&query).detail);
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Streets { normalized } => {
            let config = load_config()?;
            let records = loader::load_csv_dir(&config.data_dir, &config.columns)?;
            for street in canonical_streets(&records) {
                if normalized {
                    println!("{street:<50} {}", normalize(street));
                } else {
                    println!("{street}");
                }
            }
        }
        Commands::Serve { interactive } => {
            let config = load_config()?;
            // No outer runtime here; the server owns its actix System.
            if interactive {
                actix_web::rt::System::new()
                    .block_on(crash_cause_server::interactive::run(config))?;
            } else {
                actix_web::rt::System::new()
                    .block_on(crash_cause_server::run_server_with(config))?;
            }
        }
    }

    Ok(())
}
