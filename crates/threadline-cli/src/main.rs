mod config;

use clap::{Parser, Subcommand};
use config::ThreadlineConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use threadline_assistant::{AssistantApi, HttpAssistantClient, RunOrchestrator};
use threadline_core::DiagnosticLog;
use threadline_gateway::{AppState, ChatServer};
use threadline_session::{ConversationStore, FileRecordBackend};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Variable holding the log filter directives.
const LOG_ENV: &str = "RUST_LOG";

#[derive(Parser)]
#[command(name = "threadline", about = "Threadline: chat proxy for thread-based assistants")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "threadline.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the chat server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Validate the config file and print the effective settings
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(load_env_filter(None, LOG_ENV))
        .json()
        .init();

    let cli = Cli::parse();

    let config_str = tokio::fs::read_to_string(&cli.config).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to read config file '{}': {}",
            cli.config.display(),
            e
        )
    })?;
    let mut config = ThreadlineConfig::from_toml(&config_str)?;
    config.apply_env(|name| std::env::var(name).ok());
    let config_dir = cli
        .config
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    config.rebase(&config_dir);
    config.validate()?;

    match cli.command {
        Commands::Serve { host, port } => serve(config, host, port).await?,
        Commands::Check => {
            println!("Config OK: {}", cli.config.display());
            println!("  API base:      {}", config.assistant.base_url());
            println!("  Assistant:     {}", config.assistant.assistant_id);
            println!(
                "  Polling:       {} x {} ms",
                config.polling.max_attempts, config.polling.interval_ms
            );
            println!("  Records:       {}", config.threads_dir().display());
            println!("  Diagnostic log: {}", config.log_path().display());
        }
    }

    Ok(())
}

async fn serve(
    config: ThreadlineConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let threads_dir = config.threads_dir();
    let diagnostics = Arc::new(DiagnosticLog::new(config.log_path()));
    let assistant_id = config.assistant.assistant_id.clone();
    let api: Arc<dyn AssistantApi> = Arc::new(HttpAssistantClient::new(config.assistant)?);
    let orchestrator = Arc::new(RunOrchestrator::new(
        api.clone(),
        assistant_id,
        config.polling,
        diagnostics.clone(),
    ));

    let backend = FileRecordBackend::new(threads_dir);
    info!(dir = %backend.dir().display(), "Conversation records");
    let store = Arc::new(ConversationStore::new(Arc::new(backend), diagnostics.clone()));

    let app = ChatServer::build(AppState {
        api,
        orchestrator,
        store,
        diagnostics,
        session: config.session,
    });

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Threadline listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Threadline stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Loads `.env` (or `dotenv` when given), then builds the log filter from
/// `var`. Falls back to `info`.
fn load_env_filter(dotenv: Option<&Path>, var: &str) -> EnvFilter {
    let _ = match dotenv {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new("info"))
}
