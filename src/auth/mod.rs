//! Credential acquisition for the mail provider.
//!
//! The pipeline only sees `CredentialProvider`. `TokenFileProvider` works off
//! a cached OAuth token and lets yup-oauth2 refresh it; `StaticTokenProvider`
//! hands out a token supplied in configuration.

pub mod file_provider;
pub mod token;

pub use file_provider::TokenFileProvider;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::AuthError;

/// Read-only Gmail scope. Grants no write or send capability.
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Source of a currently-valid bearer token for the mail API.
#[async_trait]
pub trait CredentialProvider: Send {
    /// A token that is valid right now, refreshing it if needed.
    async fn access_token(&mut self) -> Result<SecretString, AuthError>;
}

/// Provider for a token obtained out of band.
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn access_token(&mut self) -> Result<SecretString, AuthError> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[tokio::test]
    async fn static_provider_returns_its_token() {
        let mut provider = StaticTokenProvider::new(SecretString::from("ya29.static"));
        assert_eq!(provider.access_token().await.unwrap().expose_secret(), "ya29.static");
    }
}
