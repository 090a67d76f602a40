//! Server configuration.
//!
//! Built from defaults, then an optional TOML file, then environment
//! variables. The TOML file is the one named by `CRASH_CAUSE_CONFIG`, or
//! `crash_cause.toml` in the working directory if present.
//!
//! ```toml
//! bind_addr = "0.0.0.0"
//! port = 8000
//! data_dir = "data"
//! model_dir = "model"
//! fuzzy_threshold = 0.7
//!
//! [columns]
//! street = "Nom_carrer"
//! target = "Descripcio_causa_mediata"
//! ```

use std::path::{Path, PathBuf};

use crash_cause_records::DatasetColumns;
use crash_cause_resolver::DEFAULT_FUZZY_THRESHOLD;
use serde::{Deserialize, Serialize};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "CRASH_CAUSE_CONFIG";

/// Configuration file read when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "crash_cause.toml";

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML of the expected shape.
    #[error("Invalid configuration file {path}: {source}")]
    Toml {
        /// File path.
        path: String,
        /// Underlying parse error.
        source: toml::de::Error,
    },

    /// An environment variable holds an unusable value.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },

    /// A setting is out of range.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// Description.
        message: String,
    },
}

/// Runtime configuration of the server and CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind (`BIND_ADDR`).
    pub bind_addr: String,
    /// Port to bind (`PORT`).
    pub port: u16,
    /// Directory of historical CSV files (`DATA_DIR`).
    pub data_dir: PathBuf,
    /// Directory of model artifacts (`MODEL_DIR`).
    pub model_dir: PathBuf,
    /// Minimum similarity for fuzzy street matches.
    pub fuzzy_threshold: f64,
    /// Maximum number of accidents returned by `GET /data/accidents`.
    pub accidents_limit: usize,
    /// Dataset column names.
    pub columns: DatasetColumns,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("data"),
            model_dir: PathBuf::from("model"),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            accidents_limit: 1000,
            columns: DatasetColumns::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from the configuration file (if any) and the
    /// process environment.
    ///
    /// `explicit_file` takes precedence over [`CONFIG_ENV`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed, or
    /// if a setting is invalid.
    pub fn load(explicit_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = explicit_file
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.is_file().then_some(default)
            });

        let mut config = match file {
            Some(path) => {
                log::info!("Reading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML configuration file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        toml::from_str(&text).map_err(|e| ConfigError::Toml {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Applies `BIND_ADDR`, `PORT`, `DATA_DIR` and `MODEL_DIR` as looked
    /// up through `get`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if `PORT` is not a port number.
    pub fn apply_overrides(
        &mut self,
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(bind_addr) = get("BIND_ADDR") {
            self.bind_addr = bind_addr;
        }
        if let Some(port) = get("PORT") {
            self.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "PORT",
                value: port.clone(),
            })?;
        }
        if let Some(dir) = get("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("MODEL_DIR") {
            self.model_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the fuzzy threshold is outside
    /// `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "fuzzy_threshold must be within [0, 1], got {}",
                    self.fuzzy_threshold
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            port = 9000
            [columns]
            street = "Carrer"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.columns.street, "Carrer");
        assert_eq!(config.columns.target, "Descripcio_causa_mediata");
        assert!((config.fuzzy_threshold - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = ServerConfig {
            port: 9000,
            ..ServerConfig::default()
        };

        config
            .apply_overrides(env(&[
                ("BIND_ADDR", "0.0.0.0"),
                ("PORT", "8000"),
                ("MODEL_DIR", "/srv/model"),
            ]))
            .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.model_dir, PathBuf::from("/srv/model"));
        assert_eq!(config.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = ServerConfig::default()
            .apply_overrides(env(&[("PORT", "eighty")]))
            .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidEnv { name: "PORT", .. }));
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let config = ServerConfig {
            fuzzy_threshold: 1.5,
            ..ServerConfig::default()
        };

        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = ServerConfig::from_file(Path::new("/nonexistent/crash_cause.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
