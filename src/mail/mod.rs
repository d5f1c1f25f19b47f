//! Inbox header listing.

pub mod gmail;

pub use gmail::GmailClient;

use async_trait::async_trait;

use crate::error::MailError;
use crate::summary::HeaderRecord;

/// Default Gmail API root; the hub appends `gmail/v1/...`.
pub const DEFAULT_GMAIL_ENDPOINT: &str = "https://gmail.googleapis.com/";

/// Lists the most recent inbox messages as header records.
#[async_trait]
pub trait MessageLister: Send + Sync {
    /// Up to `max_results` records, newest first as the provider orders them.
    /// Bodies and attachments are never requested.
    async fn list_headers(
        &self,
        access_token: &str,
        max_results: u32,
    ) -> Result<Vec<HeaderRecord>, MailError>;
}
