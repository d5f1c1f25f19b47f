//! Gmail API v1 client: list inbox message ids, then fetch Subject/From
//! metadata for each, through the `google-gmail1` hub.
//!
//! Each call goes through the mail retry policy. A message whose metadata
//! fetch fails is skipped, unless the failure means every later call would
//! fail too (rejected credentials, rate limiting).

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use google_gmail1::api::{Message, Scope};
use google_gmail1::hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use google_gmail1::hyper_util::client::legacy::Client;
use google_gmail1::hyper_util::client::legacy::connect::HttpConnector;
use google_gmail1::hyper_util::rt::TokioExecutor;
use google_gmail1::{Gmail, common};
use tracing::{debug, info, warn};

use crate::error::MailError;
use crate::mail::MessageLister;
use crate::retry::RetryPolicy;
use crate::summary::HeaderRecord;

type Connector = HttpsConnector<HttpConnector>;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Gmail client scoped to the signed-in user's inbox.
pub struct GmailClient {
    client: common::Client<Connector>,
    base_url: String,
    timeout: Duration,
    policy: RetryPolicy,
}

impl GmailClient {
    /// Client for the Gmail API rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, MailError> {
        // Several TLS backends are linked in; pick one before any handshake.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let connector = HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| MailError::Network {
                reason: format!("no usable TLS root certificates: {e}"),
            })?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            client,
            base_url,
            timeout: DEFAULT_TIMEOUT,
            policy: RetryPolicy::mail_endpoint(),
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Upper bound on each API call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn hub(&self, access_token: &str) -> Gmail<Connector> {
        let mut hub = Gmail::new(self.client.clone(), access_token.to_string());
        hub.base_url(self.base_url.clone());
        hub
    }

    async fn list_ids(
        &self,
        hub: &Gmail<Connector>,
        max_results: u32,
    ) -> Result<Vec<String>, MailError> {
        let list = self
            .policy
            .run(
                "gmail.list",
                || {
                    self.call(
                        hub.users()
                            .messages_list("me")
                            .add_label_ids("INBOX")
                            .max_results(max_results)
                            .add_scope(Scope::Readonly)
                            .doit(),
                    )
                },
                MailError::is_transient,
            )
            .await?;
        Ok(list
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.id)
            .collect())
    }

    async fn fetch_metadata(&self, hub: &Gmail<Connector>, id: &str) -> Result<HeaderRecord, MailError> {
        let message = self
            .policy
            .run(
                "gmail.get",
                || {
                    self.call(
                        hub.users()
                            .messages_get("me", id)
                            .format("metadata")
                            .add_metadata_headers("Subject")
                            .add_metadata_headers("From")
                            .add_scope(Scope::Readonly)
                            .doit(),
                    )
                },
                MailError::is_transient,
            )
            .await?;
        Ok(header_record(&message))
    }

    /// Await one hub call under the timeout and classify its failure.
    async fn call<T>(
        &self,
        request: impl Future<Output = google_gmail1::Result<(common::Response, T)>>,
    ) -> Result<T, MailError> {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok((_, body))) => Ok(body),
            Ok(Err(e)) => Err(classify_error(e)),
            Err(_) => Err(MailError::Network {
                reason: format!("no response within {}s", self.timeout.as_secs()),
            }),
        }
    }
}

#[async_trait]
impl MessageLister for GmailClient {
    async fn list_headers(
        &self,
        access_token: &str,
        max_results: u32,
    ) -> Result<Vec<HeaderRecord>, MailError> {
        let hub = self.hub(access_token);
        let ids = self.list_ids(&hub, max_results).await?;
        if ids.is_empty() {
            info!("No messages in inbox");
            return Ok(Vec::new());
        }
        info!(count = ids.len(), "Fetching message metadata");

        let mut records = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.fetch_metadata(&hub, id).await {
                Ok(record) => records.push(record),
                Err(e @ (MailError::AuthFailed { .. } | MailError::RateLimited { .. })) => {
                    return Err(e);
                }
                Err(e) => {
                    warn!(id = %id, error = %e, "Skipping message");
                }
            }
        }

        debug!(fetched = records.len(), listed = ids.len(), "Metadata fetch complete");
        Ok(records)
    }
}

/// First header named `name`, compared case-insensitively.
fn header<'a>(message: &'a Message, name: &str) -> Option<&'a str> {
    message
        .payload
        .as_ref()?
        .headers
        .as_ref()?
        .iter()
        .find(|h| h.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
        .and_then(|h| h.value.as_deref())
}

fn header_record(message: &Message) -> HeaderRecord {
    HeaderRecord::from_headers(header(message, "Subject"), header(message, "From"))
}

fn classify_error(err: google_gmail1::Error) -> MailError {
    match err {
        google_gmail1::Error::BadRequest(body) => {
            let code = body["error"]["code"].as_u64().unwrap_or(400) as u16;
            classify_status(code, &body)
        }
        google_gmail1::Error::Failure(response) => {
            classify_status(response.status().as_u16(), &serde_json::Value::Null)
        }
        google_gmail1::Error::HttpError(e) => MailError::Network {
            reason: e.to_string(),
        },
        google_gmail1::Error::Io(e) => MailError::Network {
            reason: e.to_string(),
        },
        google_gmail1::Error::MissingToken(e) => MailError::AuthFailed {
            reason: e.to_string(),
        },
        google_gmail1::Error::JsonDecodeError(_, e) => MailError::InvalidResponse {
            reason: e.to_string(),
        },
        other => MailError::RequestFailed {
            status: 0,
            reason: other.to_string(),
        },
    }
}

/// Map a failed status and Google error body to the error taxonomy.
///
/// Gmail reports per-user quota exhaustion as 403 with a rate limit reason,
/// so the body is consulted before treating 403 as an auth failure.
fn classify_status(status: u16, body: &serde_json::Value) -> MailError {
    let error = &body["error"];
    let message = error["message"].as_str().unwrap_or_default().to_string();
    let rate_limited = error["errors"].as_array().is_some_and(|errors| {
        errors.iter().any(|e| {
            e["reason"]
                .as_str()
                .is_some_and(|r| r.ends_with("ateLimitExceeded"))
        })
    });

    match status {
        429 => MailError::RateLimited { retry_after: None },
        403 if rate_limited => MailError::RateLimited { retry_after: None },
        401 | 403 => MailError::AuthFailed { reason: message },
        s if s >= 500 || s == 408 => MailError::Network {
            reason: format!("{s}: {message}"),
        },
        s => MailError::RequestFailed {
            status: s,
            reason: message,
        },
    }
}
