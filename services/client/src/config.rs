//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use docustream_core::ExtractionProfile;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: Url,
    pub log_level: Level,
    /// Applied to uploads, fetches, listing and deletes. Never to the chat stream.
    pub request_timeout: Duration,
    pub max_upload_bytes: Option<u64>,
    pub default_profile: Option<ExtractionProfile>,
    pub location_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Url::parse("http://localhost:8000/api/")
                .expect("default base url is valid"),
            log_level: Level::INFO,
            request_timeout: Duration::from_secs(30),
            max_upload_bytes: None,
            default_profile: None,
            location_file: PathBuf::from(".docustream/location"),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // --- Backend ---
        let api_base_url = match lookup("DOCUSTREAM_API_URL") {
            Some(raw) => parse_base_url(&raw)?,
            None => defaults.api_base_url,
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let request_timeout = match lookup("DOCUSTREAM_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("DOCUSTREAM_REQUEST_TIMEOUT_SECS", &raw)?),
            None => defaults.request_timeout,
        };

        // --- Session defaults ---
        let max_upload_bytes = lookup("DOCUSTREAM_MAX_UPLOAD_BYTES")
            .map(|raw| parse_number("DOCUSTREAM_MAX_UPLOAD_BYTES", &raw))
            .transpose()?;

        let default_profile = lookup("DOCUSTREAM_PROFILE")
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| {
                raw.parse::<ExtractionProfile>().map_err(|e| {
                    ConfigError::InvalidValue("DOCUSTREAM_PROFILE".to_string(), e.to_string())
                })
            })
            .transpose()?;

        let location_file = lookup("DOCUSTREAM_LOCATION_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.location_file);

        Ok(Self {
            api_base_url,
            log_level,
            request_timeout,
            max_upload_bytes,
            default_profile,
            location_file,
        })
    }
}

/// Parses the base url, forcing a trailing slash so relative joins keep the path.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized)
        .map_err(|e| ConfigError::InvalidValue("DOCUSTREAM_API_URL".to_string(), e.to_string()))
}

fn parse_number(var: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string()))
}
