use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat, Source};
use serde::Deserialize;
use tomme_renosyd::DEFAULT_BASE_URL;

const ENV_PREFIX: &str = "TOMME";
const CONFIG_PATH_VAR: &str = "TOMME_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "tomme.yaml";

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) nummer: String,
    pub(crate) state_file: PathBuf,
    pub(crate) base_url: String,
    #[serde(with = "humantime_serde")]
    pub(crate) timeout: Duration,
    pub(crate) max_retries: u32,
    #[serde(with = "humantime_serde")]
    pub(crate) backoff_base: Duration,
    #[serde(with = "humantime_serde")]
    pub(crate) refresh_interval: Duration,
    pub(crate) run_once: bool,
    pub(crate) display: DisplaySettings,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct DisplaySettings {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) output: PathBuf,
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("A collection point number is required (set TOMME_NUMMER or `nummer`)")]
    MissingNummer,
    #[error("refresh_interval must be greater than zero")]
    ZeroRefreshInterval,
}

impl Settings {
    /// Defaults, then the YAML file (if present), then `TOMME_*` variables.
    ///
    /// Only the format is checked here; see [`Settings::validate`].
    pub(crate) fn load() -> Result<Self, ConfigurationError> {
        let path =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
        Self::from_sources(
            File::new(&path, FileFormat::Yaml).required(false),
            environment(),
        )
    }

    fn from_sources<F, E>(file: F, env: E) -> Result<Self, ConfigurationError>
    where
        F: Source + Send + Sync + 'static,
        E: Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .set_default("nummer", "")?
            .set_default("state_file", "state.json")?
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("timeout", "15s")?
            .set_default("max_retries", 3_i64)?
            .set_default("backoff_base", "1s")?
            .set_default("refresh_interval", "1h")?
            .set_default("run_once", false)?
            .set_default("display.width", 250_i64)?
            .set_default("display.height", 122_i64)?
            .set_default("display.output", "display.png")?
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Check the values needed to run display cycles.
    pub(crate) fn validate(&self) -> Result<(), ConfigurationError> {
        if self.nummer.trim().is_empty() {
            return Err(ConfigurationError::MissingNummer);
        }
        if self.refresh_interval.is_zero() {
            return Err(ConfigurationError::ZeroRefreshInterval);
        }
        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}
