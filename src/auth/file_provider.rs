//! Credential provider backed by a cached `token.json`.
//!
//! Loads the cached token and, when it is near expiry, has yup-oauth2 run the
//! refresh-token grant for it, then writes the refreshed token back. The
//! interactive consent flow is not run here; without a cached token the
//! provider fails with a hint on how to create one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use tracing::{debug, info, warn};
use yup_oauth2::authorized_user::AuthorizedUserSecret;
use yup_oauth2::error::AuthErrorCode;

use crate::auth::CredentialProvider;
use crate::auth::token::StoredToken;
use crate::error::AuthError;

const TOKEN_MISSING_HINT: &str = "Authorize MailMind with Google once to create it, \
     or set MAILMIND_ACCESS_TOKEN to a valid bearer token.";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Reads, refreshes and rewrites the cached OAuth token.
pub struct TokenFileProvider {
    token_path: PathBuf,
    credentials_path: PathBuf,
    scope: String,
    timeout: Duration,
    cached: Option<StoredToken>,
}

impl TokenFileProvider {
    pub fn new(
        token_path: impl Into<PathBuf>,
        credentials_path: impl Into<PathBuf>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            token_path: token_path.into(),
            credentials_path: credentials_path.into(),
            scope: scope.into(),
            timeout: DEFAULT_TIMEOUT,
            cached: None,
        }
    }

    /// Upper bound on one refresh round trip.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn load(&self) -> Result<StoredToken, AuthError> {
        let raw = match tokio::fs::read_to_string(&self.token_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuthError::TokenMissing {
                    path: self.token_path.clone(),
                    hint: TOKEN_MISSING_HINT.to_string(),
                });
            }
            Err(e) => {
                return Err(AuthError::InvalidCredentials {
                    path: self.token_path.clone(),
                    reason: e.to_string(),
                });
            }
        };
        let token: StoredToken =
            serde_json::from_str(&raw).map_err(|e| AuthError::InvalidCredentials {
                path: self.token_path.clone(),
                reason: e.to_string(),
            })?;

        if !token.has_scope(&self.scope) {
            warn!(
                path = %self.token_path.display(),
                scope = %self.scope,
                "Cached token was not issued for the read-only mail scope"
            );
        }
        Ok(token)
    }

    /// Client id/secret from the token file, else from `credentials.json`.
    async fn client_secrets(&self, token: &StoredToken) -> Result<(String, String), AuthError> {
        if let Some(client) = token.client() {
            return Ok(client);
        }
        let secret = yup_oauth2::read_application_secret(&self.credentials_path)
            .await
            .map_err(|e| AuthError::InvalidCredentials {
                path: self.credentials_path.clone(),
                reason: e.to_string(),
            })?;
        Ok((secret.client_id, secret.client_secret))
    }

    async fn refresh(&self, mut token: StoredToken) -> Result<StoredToken, AuthError> {
        let refresh_token = token
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::NoRefreshToken {
                path: self.token_path.clone(),
            })?;
        let (client_id, client_secret) = self.client_secrets(&token).await?;

        info!("Refreshing expired access token");

        let secret = AuthorizedUserSecret {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            refresh_token,
            key_type: "authorized_user".to_string(),
        };
        let auth = yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
            .build()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let issued = tokio::time::timeout(self.timeout, auth.token(&[self.scope.as_str()]))
            .await
            .map_err(|_| AuthError::Network("token endpoint timed out".to_string()))?
            .map_err(classify_refresh_failure)?;

        let access = issued
            .token()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AuthError::InvalidResponse("token endpoint returned no access token".to_string())
            })?
            .to_string();
        let expiry = issued
            .expiration_time()
            .and_then(|t| DateTime::from_timestamp(t.unix_timestamp(), 0));

        token.apply(access, expiry);
        if token.client().is_none() {
            token.client_id = Some(client_id);
            token.client_secret = Some(client_secret);
        }
        Ok(token)
    }

    /// Write the token back. Failure only costs a refresh on the next run.
    async fn persist(&self, token: &StoredToken) {
        let result = match serde_json::to_string_pretty(token) {
            Ok(json) => write_file(&self.token_path, json).await,
            Err(e) => Err(std::io::Error::other(e)),
        };
        match result {
            Ok(()) => debug!(path = %self.token_path.display(), "Saved refreshed token"),
            Err(e) => warn!(
                path = %self.token_path.display(),
                error = %e,
                "Failed to save refreshed token"
            ),
        }
    }
}

async fn write_file(path: &Path, contents: String) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await
}

#[async_trait]
impl CredentialProvider for TokenFileProvider {
    async fn access_token(&mut self) -> Result<SecretString, AuthError> {
        let token = match self.cached.take() {
            Some(token) => token,
            None => self.load().await?,
        };

        let token = if token.is_usable_at(Utc::now()) {
            debug!("Using cached access token");
            token
        } else {
            let refreshed = self.refresh(token).await?;
            self.persist(&refreshed).await;
            refreshed
        };

        let access = token.access_token.clone().unwrap_or_default();
        self.cached = Some(token);
        Ok(SecretString::from(access))
    }
}

/// Map a failed refresh grant onto the auth taxonomy.
fn classify_refresh_failure(err: yup_oauth2::Error) -> AuthError {
    match err {
        yup_oauth2::Error::AuthError(e) if matches!(e.error, AuthErrorCode::InvalidGrant) => {
            AuthError::Revoked {
                reason: e.to_string(),
            }
        }
        yup_oauth2::Error::AuthError(e) => AuthError::RefreshFailed {
            reason: e.to_string(),
        },
        yup_oauth2::Error::HttpError(e) => AuthError::Network(e.to_string()),
        yup_oauth2::Error::JSONError(e) => AuthError::InvalidResponse(e.to_string()),
        other => AuthError::RefreshFailed {
            reason: other.to_string(),
        },
    }
}
