//! Bridges rig-core's `CompletionModel` to our `LlmProvider` trait.
//!
//! rig owns the wire format and the HTTP transport. This adapter maps our
//! request onto rig's request builder and folds rig's `CompletionError` into
//! the `LlmError` taxonomy.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use rig::completion::{CompletionError, CompletionModel};
use rig::message::{AssistantContent, Message};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::error::LlmError;
use crate::llm::costs;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};

/// A 4xx/5xx status code quoted in a transport error message.
static STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([45]\d{2})\b").expect("status regex is valid"));

/// `LlmProvider` over any rig completion model.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: &'static str,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: impl Into<String>, provider: &'static str) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            provider,
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        costs::model_cost(&self.model_name).unwrap_or((Decimal::ZERO, Decimal::ZERO))
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let turns = Turns::from_messages(&request.messages).ok_or_else(|| {
            LlmError::RequestFailed {
                provider: self.provider.to_string(),
                reason: "request must end with a user message".to_string(),
            }
        })?;
        debug!(
            model = %self.model_name,
            history = turns.history.len(),
            "Sending completion request"
        );

        let mut builder = self
            .model
            .completion_request(turns.prompt)
            .messages(turns.history);
        if let Some(preamble) = turns.preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_error(self.provider, e))?;

        let content = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        let input_tokens = u32::try_from(response.usage.input_tokens).unwrap_or(u32::MAX);
        let output_tokens = u32::try_from(response.usage.output_tokens).unwrap_or(u32::MAX);

        // rig does not surface the stop reason generically; hitting the
        // output budget is the only truncation we can see.
        let finish_reason = match request.max_tokens {
            Some(limit) if output_tokens >= limit => FinishReason::Length,
            _ => FinishReason::Stop,
        };

        Ok(CompletionResponse {
            content,
            input_tokens,
            output_tokens,
            finish_reason,
        })
    }
}

/// Our message list in rig's shape: system text becomes the preamble and the
/// final user message becomes the prompt.
struct Turns {
    preamble: Option<String>,
    history: Vec<Message>,
    prompt: Message,
}

impl Turns {
    fn from_messages(messages: &[ChatMessage]) -> Option<Self> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        let preamble = (!system.is_empty()).then(|| system.join("\n\n"));

        let mut turns: Vec<&ChatMessage> =
            messages.iter().filter(|m| m.role != Role::System).collect();
        let last = turns.pop().filter(|m| m.role == Role::User)?;

        let history = turns
            .into_iter()
            .map(|m| match m.role {
                Role::Assistant => Message::assistant(m.content.clone()),
                _ => Message::user(m.content.clone()),
            })
            .collect();

        Some(Self {
            preamble,
            history,
            prompt: Message::user(last.content.clone()),
        })
    }
}

// ── Error mapping ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

fn classify_error(provider: &str, err: CompletionError) -> LlmError {
    match err {
        CompletionError::ProviderError(body) => classify_failure(provider, &body, false),
        CompletionError::HttpError(e) => classify_failure(provider, &e.to_string(), true),
        CompletionError::JsonError(e) => LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason: e.to_string(),
        },
        CompletionError::ResponseError(reason) => LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason,
        },
        other => LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Map a provider error body or transport message to the error taxonomy.
///
/// Gemini reports a bad key as 400 with an "API key" message, so the message
/// is consulted as well as the status. A transport failure with no
/// recognizable status is a connection-level problem.
fn classify_failure(provider: &str, text: &str, transport: bool) -> LlmError {
    let (code, status, message) = match serde_json::from_str::<ErrorEnvelope>(text) {
        Ok(env) => (env.error.code, env.error.status, env.error.message),
        Err(_) => (
            STATUS_RE
                .captures(text)
                .and_then(|caps| caps[1].parse::<u16>().ok()),
            String::new(),
            text.chars().take(300).collect(),
        ),
    };
    let provider = provider.to_string();
    let lower = message.to_ascii_lowercase();

    let auth = matches!(code, Some(401 | 403))
        || matches!(status.as_str(), "UNAUTHENTICATED" | "PERMISSION_DENIED")
        || lower.contains("api key");
    let limited = code == Some(429) || status == "RESOURCE_EXHAUSTED";
    let overloaded = code.is_some_and(|c| c >= 500 || c == 408)
        || matches!(status.as_str(), "UNAVAILABLE" | "INTERNAL" | "DEADLINE_EXCEEDED");

    if auth {
        LlmError::AuthFailed {
            provider,
            reason: message,
        }
    } else if limited {
        LlmError::RateLimited {
            provider,
            retry_after: None,
        }
    } else if overloaded || (transport && code.is_none()) {
        LlmError::Network {
            provider,
            reason: message,
        }
    } else {
        LlmError::RequestFailed {
            provider,
            reason: match code {
                Some(code) => format!("{code}: {message}"),
                None => message,
            },
        }
    }
}
