//! Cached OAuth token file format.
//!
//! `token.json` uses the authorized-user layout written by Google's client
//! libraries, so a token created by any of them can be reused here and the
//! refreshed file stays readable by them. Unknown keys are carried through.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Refresh this long before the recorded expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Contents of `token.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredToken {
    /// Current access token.
    #[serde(rename = "token", alias = "access_token", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    /// Access token expiry in UTC. Absent means "no known expiry".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StoredToken {
    /// Whether the access token is present and not within the skew of expiry.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        let has_token = self.access_token.as_deref().is_some_and(|t| !t.is_empty());
        has_token && !self.is_expired_at(now)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .is_some_and(|exp| now + Duration::seconds(EXPIRY_SKEW_SECS) >= exp)
    }

    /// Whether the token carries the given scope. Tokens with no recorded
    /// scopes are assumed to have been issued for the scope requested.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.is_empty() || self.scopes.iter().any(|s| s == scope)
    }

    /// Client id and secret recorded in the token file, when both are there.
    pub fn client(&self) -> Option<(String, String)> {
        let id = self.client_id.clone().filter(|s| !s.is_empty())?;
        let secret = self.client_secret.clone().filter(|s| !s.is_empty())?;
        Some((id, secret))
    }

    /// Record a freshly issued access token. The refresh token is kept.
    pub fn apply(&mut self, access_token: String, expiry: Option<DateTime<Utc>>) {
        self.access_token = Some(access_token);
        self.expiry = expiry;
    }
}
