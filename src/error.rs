//! Error types for MailMind.
//!
//! Every component owns a `thiserror` enum. The top-level [`Error`] wraps them
//! and [`Error::kind`] folds each variant into the user-facing taxonomy that
//! `main` uses to pick a remedy hint and the exit status.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// User-facing failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Authentication,
    TransientNetwork,
    RateLimit,
    MalformedResponse,
    Request,
    Persistence,
}

impl ErrorKind {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Authentication => "authentication",
            Self::TransientNetwork => "network",
            Self::RateLimit => "rate_limit",
            Self::MalformedResponse => "malformed_response",
            Self::Request => "request",
            Self::Persistence => "persistence",
        }
    }

    /// What the user should do about it.
    pub fn remedy(&self) -> &'static str {
        match self {
            Self::Configuration => {
                "Check your .env file: GEMINI_API_KEY must be set.\n\
                 Get an API key from https://aistudio.google.com/app/apikey"
            }
            Self::Authentication => {
                "Verify that your credentials are valid and still authorized.\n\
                 Delete token.json and authorize again if access was revoked."
            }
            Self::TransientNetwork => "Check your internet connection and try again.",
            Self::RateLimit => {
                "You have exceeded your API quota or rate limit.\n\
                 Wait a while before trying again."
            }
            Self::MalformedResponse => {
                "The provider returned data that could not be understood. Try again later."
            }
            Self::Request => {
                "The provider rejected the request. Check MAILMIND_MODEL and the\n\
                 endpoint settings in your .env file."
            }
            Self::Persistence => {
                "Check permissions and free disk space for the output directory."
            }
        }
    }
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Auth(e) => e.kind(),
            Self::Mail(e) => e.kind(),
            Self::Llm(e) => e.kind(),
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Credential acquisition errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("No cached token at {}. {hint}", path.display())]
    TokenMissing { path: PathBuf, hint: String },

    #[error("Cached token at {} has expired and carries no refresh token", path.display())]
    NoRefreshToken { path: PathBuf },

    #[error("OAuth client credentials not usable at {}: {reason}", path.display())]
    InvalidCredentials { path: PathBuf, reason: String },

    #[error("Access was revoked or the refresh token is invalid: {reason}")]
    Revoked { reason: String },

    #[error("Token refresh failed: {reason}")]
    RefreshFailed { reason: String },

    #[error("Network error talking to the token endpoint: {0}")]
    Network(String),

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::TransientNetwork,
            Self::InvalidResponse(_) => ErrorKind::MalformedResponse,
            _ => ErrorKind::Authentication,
        }
    }
}

/// Mail provider errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MailError {
    #[error("Mail provider rejected the credentials: {reason}")]
    AuthFailed { reason: String },

    #[error("Mail provider rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Network error talking to the mail provider: {reason}")]
    Network { reason: String },

    #[error("Mail request failed with status {status}: {reason}")]
    RequestFailed { status: u16, reason: String },

    #[error("Invalid response from the mail provider: {reason}")]
    InvalidResponse { reason: String },
}

impl MailError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthFailed { .. } => ErrorKind::Authentication,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Network { .. } => ErrorKind::TransientNetwork,
            Self::RequestFailed { .. } => ErrorKind::Request,
            Self::InvalidResponse { .. } => ErrorKind::MalformedResponse,
        }
    }

    /// Whether the retry policy may try again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

/// LLM provider errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("No API key configured for provider {provider}")]
    MissingApiKey { provider: String },

    #[error("Authentication failed for provider {provider}: {reason}")]
    AuthFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Network error talking to provider {provider}: {reason}")]
    Network { provider: String, reason: String },

    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl LlmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingApiKey { .. } => ErrorKind::Configuration,
            Self::AuthFailed { .. } => ErrorKind::Authentication,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Network { .. } => ErrorKind::TransientNetwork,
            Self::RequestFailed { .. } => ErrorKind::Request,
            Self::InvalidResponse { .. } => ErrorKind::MalformedResponse,
        }
    }

    /// Whether the retry policy may try again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

/// Summary file errors.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write summary file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for MailMind.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let err: Error = LlmError::MissingApiKey {
            provider: "gemini".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn rate_limits_are_not_merged_with_network_errors() {
        let limited: Error = LlmError::RateLimited {
            provider: "gemini".into(),
            retry_after: None,
        }
        .into();
        let network: Error = LlmError::Network {
            provider: "gemini".into(),
            reason: "connection reset".into(),
        }
        .into();
        assert_eq!(limited.kind(), ErrorKind::RateLimit);
        assert_eq!(network.kind(), ErrorKind::TransientNetwork);
        assert_ne!(limited.kind().remedy(), network.kind().remedy());
    }

    #[test]
    fn only_network_errors_are_transient() {
        assert!(
            MailError::Network {
                reason: "timeout".into()
            }
            .is_transient()
        );
        assert!(!MailError::RateLimited { retry_after: None }.is_transient());
        assert!(
            !LlmError::AuthFailed {
                provider: "gemini".into(),
                reason: "bad key".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn mail_auth_failure_maps_to_authentication() {
        let err: Error = MailError::AuthFailed {
            reason: "401".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(err.kind().label(), "authentication");
    }

    #[test]
    fn rejected_requests_are_not_reported_as_network_trouble() {
        let model: Error = LlmError::RequestFailed {
            provider: "gemini".into(),
            reason: "404: models/gemini-9 is not found".into(),
        }
        .into();
        let mail: Error = MailError::RequestFailed {
            status: 404,
            reason: "Not Found".into(),
        }
        .into();
        assert_eq!(model.kind(), ErrorKind::Request);
        assert_eq!(mail.kind(), ErrorKind::Request);
        assert_ne!(model.kind().remedy(), ErrorKind::TransientNetwork.remedy());
        assert!(model.kind().remedy().contains("MAILMIND_MODEL"));
    }

    #[test]
    fn persistence_error_keeps_filesystem_reason() {
        let err = PersistenceError::Write {
            path: PathBuf::from("summaries/summary.txt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let text = err.to_string();
        assert!(text.contains("summaries/summary.txt"));
        assert!(text.contains("denied"));
    }
}
