//! One summarization run: credentials → inbox headers → summary → file.
//!
//! Strictly sequential; every step awaits the previous one. The first failure
//! ends the run and is returned for `main` to report.

use std::path::PathBuf;
use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing::info;

use crate::auth::CredentialProvider;
use crate::error::Result;
use crate::mail::MessageLister;
use crate::sink::SummarySink;
use crate::summary::{SummaryEngine, SummaryReport, render};

/// What a successful run produced.
#[derive(Debug)]
pub enum RunOutcome {
    /// The inbox listing was empty; nothing was summarized or written.
    NoMessages,
    Summarized(RunSummary),
}

#[derive(Debug)]
pub struct RunSummary {
    pub report: SummaryReport,
    /// Text that was printed and persisted.
    pub rendered: String,
    pub saved_to: PathBuf,
}

/// Wires the collaborators for one run.
pub struct Pipeline {
    credentials: Box<dyn CredentialProvider>,
    lister: Arc<dyn MessageLister>,
    engine: SummaryEngine,
    sink: SummarySink,
    max_results: u32,
}

impl Pipeline {
    pub fn new(
        credentials: Box<dyn CredentialProvider>,
        lister: Arc<dyn MessageLister>,
        engine: SummaryEngine,
        sink: SummarySink,
        max_results: u32,
    ) -> Self {
        Self {
            credentials,
            lister,
            engine,
            sink,
            max_results,
        }
    }

    pub async fn run(&mut self) -> Result<RunOutcome> {
        info!("Authenticating with the mail provider");
        let token = self.credentials.access_token().await?;

        info!(max_results = self.max_results, "Fetching inbox headers");
        let records = self
            .lister
            .list_headers(token.expose_secret(), self.max_results)
            .await?;
        if records.is_empty() {
            info!("Inbox is empty, nothing to summarize");
            return Ok(RunOutcome::NoMessages);
        }

        info!(
            count = records.len(),
            model = self.engine.model_name(),
            "Summarizing"
        );
        let report = self.engine.summarize(&records).await?;
        let rendered = render(&report, &records);
        let saved_to = self.sink.save(&rendered)?;

        Ok(RunOutcome::Summarized(RunSummary {
            report,
            rendered,
            saved_to,
        }))
    }
}
