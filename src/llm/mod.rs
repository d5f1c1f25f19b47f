//! LLM integration for MailMind.
//!
//! Uses the rig-core crate for the Gemini transport and the `RigAdapter` to
//! bridge rig's `CompletionModel` trait to our `LlmProvider` trait. The
//! summary engine only sees `LlmProvider`; the provider it gets is wrapped
//! in a `RetryProvider` that gives network-class failures one more attempt.

mod costs;
pub mod provider;
pub(crate) mod retry;
mod rig_adapter;

pub use costs::estimate as estimate_cost;
pub use provider::*;
pub use retry::RetryProvider;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::LlmError;
use crate::retry::RetryPolicy;

/// Default model: fast and cheap enough for a header-only batch.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Create the retrying Gemini provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::gemini;

    if config.api_key.expose_secret().trim().is_empty() {
        return Err(LlmError::MissingApiKey {
            provider: "gemini".to_string(),
        });
    }

    let client: rig::client::Client<gemini::client::GeminiExt> =
        gemini::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "gemini".to_string(),
                reason: format!("Failed to create Gemini client: {}", e),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using Gemini (model: {})", config.model);
    Ok(Arc::new(RetryProvider::new(
        Arc::new(RigAdapter::new(model, &config.model, "gemini")),
        RetryPolicy::model_endpoint(),
    )))
}
