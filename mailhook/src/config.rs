//! Relay configuration.
//!
//! A single JSON object; every key is optional:
//!
//! ```json
//! {
//!     "api_url": "https://hooks.example.com/report_email",
//!     "listen": "0.0.0.0:25",
//!     "workers": 3
//! }
//! ```

use std::{
    io,
    path::{Path, PathBuf},
};

use mailhook_common::internal;
use mailhook_delivery::DeliveryConfig;
use mailhook_smtp::SmtpConfig;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "MAILHOOK_CONFIG";

/// Used when neither `--config` nor [`CONFIG_ENV`] is given
pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file {0} does not exist")]
    NotFound(PathBuf),

    #[error("Failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct RelayConfig {
    #[serde(flatten)]
    pub smtp: SmtpConfig,
    #[serde(flatten)]
    pub delivery: DeliveryConfig,
}

impl RelayConfig {
    /// Load the configuration using the following precedence:
    /// 1. `cli`, the `--config` argument
    /// 2. `MAILHOOK_CONFIG` environment variable
    /// 3. `./config.json`, where a missing file means defaults
    ///
    /// # Errors
    /// If an explicitly named file is missing, or any file is unreadable or malformed.
    pub fn load(cli: Option<PathBuf>) -> Result<Self, ConfigError> {
        let env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);

        match locate(cli, env, Path::new(DEFAULT_CONFIG_PATH))? {
            Some(path) => Self::from_file(&path),
            None => {
                internal!(
                    level = INFO,
                    "No configuration found at {DEFAULT_CONFIG_PATH}, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    /// # Errors
    /// If the file cannot be read or is not a valid configuration.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        internal!(
            level = INFO,
            "Loaded config from {}: api_url = {}",
            path.display(),
            config.delivery.api_url
        );

        Ok(config)
    }
}

/// Pick the file to load. `Ok(None)` means "use the defaults".
fn locate(
    cli: Option<PathBuf>,
    env: Option<PathBuf>,
    default: &Path,
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = cli.or(env) {
        return if path.exists() {
            Ok(Some(path))
        } else {
            Err(ConfigError::NotFound(path))
        };
    }

    Ok(default.exists().then(|| default.to_path_buf()))
}
