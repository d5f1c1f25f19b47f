//! Configuration types, built from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{DEFAULT_MODEL, LlmConfig};
use crate::mail::DEFAULT_GMAIL_ENDPOINT;

/// Default number of inbox messages fetched per run.
pub const DEFAULT_MAX_RESULTS: u32 = 20;

/// Upper bound accepted by the Gmail list endpoint.
const MAX_RESULTS_LIMIT: u32 = 500;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Generative model settings.
    pub llm: LlmConfig,
    /// Gmail API root URL.
    pub gmail_endpoint: String,
    /// Number of inbox messages to fetch.
    pub max_results: u32,
    /// Directory summaries are written to.
    pub output_dir: PathBuf,
    /// Cached OAuth token (read and rewritten on refresh).
    pub token_path: PathBuf,
    /// OAuth client secrets downloaded from the Google Cloud console.
    pub credentials_path: PathBuf,
    /// Pre-issued bearer token; bypasses the token file when set.
    pub access_token: Option<SecretString>,
    /// Per-call timeout for the mail and token endpoints.
    pub http_timeout: Duration,
}

impl AppConfig {
    /// Build config from the process environment.
    ///
    /// Fails before any network call when `GEMINI_API_KEY` is absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = non_empty("GEMINI_API_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let model = non_empty("MAILMIND_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let max_results = match non_empty("MAILMIND_MAX_RESULTS") {
            Some(raw) => parse_max_results(&raw)?,
            None => DEFAULT_MAX_RESULTS,
        };

        let http_timeout = match non_empty("MAILMIND_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "MAILMIND_HTTP_TIMEOUT_SECS".to_string(),
                    message: format!("'{raw}' is not a whole number of seconds"),
                })?;
                Duration::from_secs(secs.max(1))
            }
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            llm: LlmConfig {
                api_key: SecretString::from(api_key),
                model,
            },
            gmail_endpoint: non_empty("MAILMIND_GMAIL_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_GMAIL_ENDPOINT.to_string()),
            max_results,
            output_dir: non_empty("MAILMIND_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("summaries")),
            token_path: non_empty("MAILMIND_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("token.json")),
            credentials_path: non_empty("MAILMIND_CREDENTIALS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("credentials.json")),
            access_token: non_empty("MAILMIND_ACCESS_TOKEN").map(SecretString::from),
            http_timeout,
        })
    }
}

fn parse_max_results(raw: &str) -> Result<u32, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: "MAILMIND_MAX_RESULTS".to_string(),
        message,
    };
    let value: u32 = raw
        .parse()
        .map_err(|_| invalid(format!("'{raw}' is not a positive integer")))?;
    if value == 0 || value > MAX_RESULTS_LIMIT {
        return Err(invalid(format!(
            "{value} is outside the accepted range 1-{MAX_RESULTS_LIMIT}"
        )));
    }
    Ok(value)
}
