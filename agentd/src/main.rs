//! agentd entry point: serve the HTTP task-intake API, or probe a running
//! instance's health endpoint.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info};

use agentd::cli::{Cli, Command};
use agentd::config::Config;
use agentd::llm::create_client;
use agentd::service::{self, AppState, TaskRegistry, WebhookSender};

/// Writes every log line to both the rotating log file and stdout, so
/// container deployments can tail stdout while the file persists locally.
struct TeeWriter {
    file: fs::File,
}

impl std::io::Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        std::io::Write::write_all(&mut std::io::stdout(), buf)?;
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::Write::flush(&mut std::io::stdout())?;
        self.file.flush()
    }
}

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("agentd").join("logs");
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let level = match cli_log_level.map(|s| s.to_uppercase()) {
        Some(ref s) if s == "TRACE" => tracing::Level::TRACE,
        Some(ref s) if s == "DEBUG" => tracing::Level::DEBUG,
        Some(ref s) if s == "WARN" || s == "WARNING" => tracing::Level::WARN,
        Some(ref s) if s == "ERROR" => tracing::Level::ERROR,
        Some(ref s) if s == "INFO" => tracing::Level::INFO,
        Some(s) => {
            eprintln!("Warning: Unknown log-level '{s}', defaulting to INFO");
            tracing::Level::INFO
        }
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("agentd.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(move || TeeWriter { file: log_file.try_clone().expect("log file handle clones") })
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level.as_deref()).context("Failed to setup logging")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => cmd_serve(cli.config.as_ref()).await,
        Command::Healthcheck { url } => cmd_healthcheck(&url).await,
    }
}

async fn cmd_serve(config_path: Option<&PathBuf>) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    let llm_config = config.resolve_llm().context("Failed to resolve LLM configuration")?;
    let llm = create_client(&llm_config).context("Failed to build LLM client")?;

    debug!(bind_addr = %config.service.bind_addr, "cmd_serve: starting HTTP server");

    let webhook = match (&config.service.webhook_base_url, &config.service.webhook_secret) {
        (Some(base_url), Some(secret)) => Some(Arc::new(WebhookSender::new(base_url.clone(), secret.clone()))),
        _ => {
            info!("No webhook base URL/secret configured; task lifecycle reporting is disabled");
            None
        }
    };

    let bind_addr = config.service.bind_addr.clone();
    let state = Arc::new(AppState { config: Arc::new(config), llm, registry: TaskRegistry::new(), webhook });

    let app = service::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.context(format!("Failed to bind {bind_addr}"))?;
    info!(%bind_addr, "agentd listening");
    axum::serve(listener, app).await.context("HTTP server exited with an error")?;

    Ok(())
}

async fn cmd_healthcheck(url: &str) -> Result<()> {
    let endpoint = format!("{}/health", url.trim_end_matches('/'));
    let response = reqwest::get(&endpoint).await.context(format!("Failed to reach {endpoint}"))?;

    if response.status().is_success() {
        println!("{}", response.text().await.unwrap_or_default());
        Ok(())
    } else {
        eyre::bail!("healthcheck failed with status {}", response.status());
    }
}
