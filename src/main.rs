use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use draftly::api;
use draftly::config::{DraftConfig, MailboxConfig, ServerConfig};
use draftly::drafts::{DraftGenerator, DraftOrchestrator};
use draftly::llm::{LlmConfig, create_provider};
use draftly::mail::{GmailProvider, MailboxGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let server_config = ServerConfig::from_env();

    // Keep the guard alive for the lifetime of the process so buffered
    // log lines are flushed on exit.
    let _log_guard = init_tracing(server_config.log_dir.as_deref());

    let llm_config = LlmConfig::from_env().context("LLM configuration")?;
    let mailbox_config = MailboxConfig::from_env();
    let draft_config = DraftConfig::from_env();

    eprintln!("✉️  Draftly v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", llm_config.model);
    eprintln!("   Gmail API: {}", mailbox_config.api_base);
    eprintln!("   HTTP: http://0.0.0.0:{}", server_config.port);
    eprintln!("   CORS origin: {}", server_config.cors_origin);
    if let Some(dir) = &server_config.log_dir {
        eprintln!("   Logs: {}", dir);
    }

    // Create LLM provider
    let llm = create_provider(&llm_config)?;

    // ── Mailbox ─────────────────────────────────────────────────────────
    let gmail = Arc::new(GmailProvider::new(&mailbox_config)?);
    let gateway = Arc::new(MailboxGateway::new(gmail, mailbox_config));

    // ── Drafting ────────────────────────────────────────────────────────
    let generator = DraftGenerator::new(llm, draft_config);
    let orchestrator = Arc::new(DraftOrchestrator::new(gateway, generator));

    let app = api::app(orchestrator, &server_config.cors_origin);

    let addr = format!("0.0.0.0:{}", server_config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Draftly listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down cleanly");
    Ok(())
}

/// Set up tracing to stderr, or to a daily rolling file when `log_dir` is set.
fn init_tracing(log_dir: Option<&str>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "draftly.log");
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_target(false))
                .init();
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
