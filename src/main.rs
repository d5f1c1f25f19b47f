use std::process::ExitCode;
use std::sync::Arc;

use tracing::{Instrument, error, info_span};
use uuid::Uuid;

use mailmind::auth::{
    CredentialProvider, GMAIL_READONLY_SCOPE, StaticTokenProvider, TokenFileProvider,
};
use mailmind::config::AppConfig;
use mailmind::error::Result;
use mailmind::llm::create_provider;
use mailmind::mail::GmailClient;
use mailmind::pipeline::{Pipeline, RunOutcome};
use mailmind::sink::SummarySink;
use mailmind::summary::SummaryEngine;

const RULE_WIDTH: usize = 60;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Install rustls crypto provider before any TLS usage
    let _ = rustls::crypto::ring::default_provider().install_default();

    // Existing environment wins over .env.
    dotenv::dotenv().ok();

    // Logs go to stderr; stdout carries only the summary.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    eprintln!("MailMind v{}", env!("CARGO_PKG_VERSION"));

    let run_id = Uuid::new_v4();
    match run().instrument(info_span!("run", run_id = %run_id)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(kind = e.kind().label(), "{e}");
            eprintln!("\nError: {e}");
            eprintln!("{}", e.kind().remedy());
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = AppConfig::from_env()?;

    let llm = create_provider(&config.llm)?;

    let credentials: Box<dyn CredentialProvider> = match &config.access_token {
        Some(token) => Box::new(StaticTokenProvider::new(token.clone())),
        None => Box::new(
            TokenFileProvider::new(
                &config.token_path,
                &config.credentials_path,
                GMAIL_READONLY_SCOPE,
            )
            .with_timeout(config.http_timeout),
        ),
    };
    let lister =
        Arc::new(GmailClient::new(&config.gmail_endpoint)?.with_timeout(config.http_timeout));

    let mut pipeline = Pipeline::new(
        credentials,
        lister,
        SummaryEngine::new(llm),
        SummarySink::new(&config.output_dir),
        config.max_results,
    );

    match pipeline.run().await? {
        RunOutcome::NoMessages => println!("No emails to summarize."),
        RunOutcome::Summarized(summary) => {
            let rule = "=".repeat(RULE_WIDTH);
            println!("\n{rule}\nEMAIL SUMMARY\n{rule}\n");
            println!("{}", summary.rendered);
            println!("\n{rule}");
            println!("Summary saved to: {}", summary.saved_to.display());
        }
    }
    Ok(())
}
