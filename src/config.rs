//! Application configuration: data directory layout and oracle provider
//! selection from the environment.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::oracle::{gemini, openai, Classifier, GeminiClient, OpenAiCompatClient};

pub const APP_NAME: &str = "Standalign";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

const ENV_PROVIDER: &str = "STANDALIGN_ORACLE_PROVIDER";
const ENV_MODEL: &str = "STANDALIGN_ORACLE_MODEL";
const ENV_API_KEY: &str = "STANDALIGN_ORACLE_API_KEY";
const ENV_BASE_URL: &str = "STANDALIGN_ORACLE_BASE_URL";
const ENV_TIMEOUT: &str = "STANDALIGN_ORACLE_TIMEOUT_SECS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine user data directory")]
    NoDataDir,

    #[error("Unknown oracle provider '{0}', expected 'gemini' or 'openai'")]
    UnknownProvider(String),

    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for {variable}: {value}")]
    InvalidEnv {
        variable: &'static str,
        value: String,
    },
}

/// Application data directory, `~/Standalign` by convention.
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(APP_NAME))
        .ok_or(ConfigError::NoDataDir)
}

pub fn database_path() -> Result<PathBuf, ConfigError> {
    Ok(app_data_dir()?.join("standalign.db"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleProvider {
    Gemini,
    OpenAiCompat,
}

impl OracleProvider {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAiCompat),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Oracle connection settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub provider: OracleProvider,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl OracleConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = match std::env::var(ENV_PROVIDER) {
            Ok(value) => OracleProvider::parse(&value)?,
            Err(_) => OracleProvider::Gemini,
        };

        let api_key =
            std::env::var(ENV_API_KEY).map_err(|_| ConfigError::MissingEnv(ENV_API_KEY))?;

        let (default_model, default_base_url) = match provider {
            OracleProvider::Gemini => (gemini::DEFAULT_MODEL, gemini::DEFAULT_BASE_URL),
            OracleProvider::OpenAiCompat => (openai::DEFAULT_MODEL, openai::DEFAULT_BASE_URL),
        };

        let model = std::env::var(ENV_MODEL).unwrap_or_else(|_| default_model.to_string());
        let base_url = std::env::var(ENV_BASE_URL).unwrap_or_else(|_| default_base_url.to_string());

        let timeout_secs = match std::env::var(ENV_TIMEOUT) {
            Ok(value) => value.parse().map_err(|_| ConfigError::InvalidEnv {
                variable: ENV_TIMEOUT,
                value,
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            provider,
            model,
            api_key,
            base_url,
            timeout_secs,
        })
    }

    pub fn build_classifier(&self) -> Arc<dyn Classifier> {
        match self.provider {
            OracleProvider::Gemini => Arc::new(GeminiClient::new(
                &self.base_url,
                &self.api_key,
                &self.model,
                self.timeout_secs,
            )),
            OracleProvider::OpenAiCompat => Arc::new(OpenAiCompatClient::new(
                &self.base_url,
                &self.api_key,
                &self.model,
                self.timeout_secs,
            )),
        }
    }
}
