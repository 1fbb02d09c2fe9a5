//! services/scribe/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which inference adapter answers the side panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InferenceBackend {
    /// The remote `/solve` HTTP endpoint.
    Solve,
    /// Direct chat completions through the OpenAI API.
    OpenAi,
}

impl FromStr for InferenceBackend {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "solve" => Ok(InferenceBackend::Solve),
            "openai" => Ok(InferenceBackend::OpenAi),
            other => Err(format!("'{}' is not one of solve, openai", other)),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub allowed_origin: Option<String>,
    pub inference_backend: InferenceBackend,
    pub solve_endpoint: String,
    pub openai_api_key: Option<String>,
    pub qa_model: String,
    pub token_store_path: PathBuf,
    pub oauth_redirect_prefix: String,
    pub options_page_url: String,
    pub extractor_poll: Duration,
    pub extractor_max_attempts: Option<u32>,
    pub observer_debounce: Duration,
    pub popup_retries: u32,
    pub popup_retry_delay: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Load Server and Database Settings ---
        let bind_address =
            parse_or("BIND_ADDRESS", &lookup, "127.0.0.1:8787".parse::<SocketAddr>())?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin = lookup("ALLOWED_ORIGIN");

        // --- Load Inference Settings ---
        let inference_backend = match lookup("INFERENCE_BACKEND") {
            Some(raw) => raw
                .parse::<InferenceBackend>()
                .map_err(|e| ConfigError::InvalidValue("INFERENCE_BACKEND".to_string(), e))?,
            None => InferenceBackend::Solve,
        };
        let solve_endpoint = lookup("SOLVE_ENDPOINT")
            .unwrap_or_else(|| "http://127.0.0.1:8000/solve".to_string());
        let openai_api_key = lookup("OPENAI_API_KEY");
        if inference_backend == InferenceBackend::OpenAi && openai_api_key.is_none() {
            return Err(ConfigError::MissingVar("OPENAI_API_KEY".to_string()));
        }
        let qa_model = lookup("QA_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());

        // --- Load Extension Storage and Auth Settings ---
        let token_store_path = lookup("TOKEN_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./scribe-storage.json"));
        let oauth_redirect_prefix = lookup("OAUTH_REDIRECT_PREFIX")
            .unwrap_or_else(|| "http://localhost:3000/".to_string());
        let options_page_url =
            lookup("OPTIONS_PAGE_URL").unwrap_or_else(|| "options.html".to_string());

        // --- Load Content Script and Popup Timing ---
        let extractor_poll =
            Duration::from_millis(parse_or("EXTRACTOR_POLL_MS", &lookup, Ok::<_, std::convert::Infallible>(500))?);
        let extractor_max_attempts = match lookup("EXTRACTOR_MAX_ATTEMPTS") {
            Some(raw) => Some(raw.parse::<u32>().map_err(|e| {
                ConfigError::InvalidValue("EXTRACTOR_MAX_ATTEMPTS".to_string(), e.to_string())
            })?),
            None => None,
        };
        let observer_debounce =
            Duration::from_millis(parse_or("OBSERVER_DEBOUNCE_MS", &lookup, Ok::<_, std::convert::Infallible>(300))?);
        let popup_retries = parse_or("POPUP_RETRIES", &lookup, Ok::<_, std::convert::Infallible>(5))?;
        let popup_retry_delay =
            Duration::from_millis(parse_or("POPUP_RETRY_DELAY_MS", &lookup, Ok::<_, std::convert::Infallible>(500))?);

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            allowed_origin,
            inference_backend,
            solve_endpoint,
            openai_api_key,
            qa_model,
            token_store_path,
            oauth_redirect_prefix,
            options_page_url,
            extractor_poll,
            extractor_max_attempts,
            observer_debounce,
            popup_retries,
            popup_retry_delay,
        })
    }
}

/// Parses `key` when set, otherwise returns `default`.
fn parse_or<T, E, F>(key: &str, lookup: &F, default: Result<T, E>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    E: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => default.map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
    }
}
