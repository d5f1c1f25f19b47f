//! Summary engine: one model call turns a batch of header records into a
//! validated `SummaryReport`.
//!
//! 1. Build the categorization prompt
//! 2. Single completion through the provider (retries live in the provider)
//! 3. Parse and repair the reply against the input records
//! 4. Log coverage, the degraded flag and the estimated cost

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, FinishReason, LlmProvider, estimate_cost};
use crate::summary::parser::parse_reply;
use crate::summary::prompt::build_prompt;
use crate::summary::types::{HeaderRecord, SummaryReport};

/// Low temperature keeps the three-section layout stable.
const SUMMARY_TEMPERATURE: f32 = 0.2;

/// Room for one bullet per record plus section headers.
const SUMMARY_MAX_TOKENS: u32 = 4096;

/// Turns header records into a prioritized report.
pub struct SummaryEngine {
    llm: Arc<dyn LlmProvider>,
}

impl SummaryEngine {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Summarize `records` with exactly one logical model request.
    ///
    /// An empty batch returns three empty buckets without contacting the
    /// model. A malformed reply never fails; it degrades.
    pub async fn summarize(&self, records: &[HeaderRecord]) -> Result<SummaryReport, LlmError> {
        if records.is_empty() {
            debug!("No records to summarize, skipping model call");
            return Ok(SummaryReport::empty());
        }

        let request = CompletionRequest::new(vec![ChatMessage::user(build_prompt(records))])
            .with_temperature(SUMMARY_TEMPERATURE)
            .with_max_tokens(SUMMARY_MAX_TOKENS);

        info!(
            count = records.len(),
            model = self.llm.model_name(),
            "Requesting summary"
        );
        let response = self.llm.complete(request).await?;

        if response.finish_reason == FinishReason::Length {
            warn!("Model reply was truncated at the token limit");
        }
        let cost = estimate_cost(
            self.llm.cost_per_token(),
            response.input_tokens,
            response.output_tokens,
        );
        debug!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            cost_usd = %cost,
            "Summary call complete"
        );

        let report = SummaryReport::new(parse_reply(&response.content, records), records.len());
        let coverage = report.coverage(records);

        if report.is_degraded() {
            warn!(
                missing = coverage.missing.len(),
                "Model reply had no priority sections, keeping raw text"
            );
        } else {
            if !coverage.is_complete() {
                warn!(
                    missing = coverage.missing.len(),
                    total = records.len(),
                    "Some records were not placed in any bucket"
                );
            }
            if coverage.unverified > 0 {
                info!(
                    unverified = coverage.unverified,
                    "Bullets could not be traced to an input record"
                );
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::llm::CompletionResponse;
    use crate::summary::types::Priority;

    /// Mock LLM that returns a fixed reply and records every request.
    struct MockSummaryLlm {
        response: Result<String, LlmError>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockSummaryLlm {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(text.to_string()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing(err: LlmError) -> Arc<Self> {
            Arc::new(Self {
                response: Err(err),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmProvider for MockSummaryLlm {
        fn model_name(&self) -> &str {
            "mock-summary"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            self.response.clone().map(|content| CompletionResponse {
                content,
                input_tokens: 100,
                output_tokens: 50,
                finish_reason: FinishReason::Stop,
            })
        }
    }

    fn records() -> Vec<HeaderRecord> {
        vec![
            HeaderRecord::new("Server Down", "alerts@x.com"),
            HeaderRecord::new("Newsletter", "news@y.com"),
        ]
    }

    #[tokio::test]
    async fn empty_batch_skips_the_model() {
        let llm = MockSummaryLlm::replying("unused");
        let engine = SummaryEngine::new(llm.clone());
        let report = engine.summarize(&[]).await.unwrap();
        assert_eq!(report, SummaryReport::empty());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn reply_without_medium_section_leaves_it_empty() {
        let llm = MockSummaryLlm::replying(
            "High Priority:\n- Server Down from alerts@x.com\nLow Priority:\n- Newsletter from news@y.com",
        );
        let engine = SummaryEngine::new(llm.clone());
        let report = engine.summarize(&records()).await.unwrap();

        let high = report.bucket(Priority::High);
        assert_eq!(high.len(), 1);
        assert!(high[0].text.contains("Server Down"));
        assert!(high[0].text.contains("alerts@x.com"));
        assert!(report.bucket(Priority::Medium).is_empty());
        let low = report.bucket(Priority::Low);
        assert!(low[0].text.contains("Newsletter"));
        assert!(low[0].text.contains("news@y.com"));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn prompt_carries_every_record() {
        let llm = MockSummaryLlm::replying("High Priority:\nNone");
        let engine = SummaryEngine::new(llm.clone());
        engine.summarize(&records()).await.unwrap();

        let requests = llm.requests.lock().unwrap();
        let prompt = &requests[0].messages[0].content;
        assert!(prompt.contains("Server Down"));
        assert!(prompt.contains("news@y.com"));
        assert_eq!(requests[0].temperature, Some(SUMMARY_TEMPERATURE));
    }

    #[tokio::test]
    async fn unlabelled_reply_is_degraded_not_an_error() {
        let llm = MockSummaryLlm::replying("Sorry, I can't help with that.");
        let engine = SummaryEngine::new(llm);
        let report = engine.summarize(&records()).await.unwrap();
        assert!(report.is_degraded());
        assert_eq!(report.degraded_text(), Some("Sorry, I can't help with that."));
        assert_eq!(report.record_count(), 2);
    }

    #[tokio::test]
    async fn provider_error_propagates() {
        let llm = MockSummaryLlm::failing(LlmError::AuthFailed {
            provider: "mock".into(),
            reason: "bad key".into(),
        });
        let engine = SummaryEngine::new(llm);
        let err = engine.summarize(&records()).await.unwrap_err();
        assert!(matches!(err, LlmError::AuthFailed { .. }));
    }
}
