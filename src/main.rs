use anyhow::{Context, Result};
use clap::Parser;
use odbc_notebook::config::redact_connection_string;
use odbc_notebook::{ConfigLoader, LaunchArgs, NotebookServer, OdbcSession};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

fn setup_logging(log_level: &str, log_file: Option<PathBuf>) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    if let Some(log_path) = log_file {
        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file {}", log_path.display()))?;
        subscriber.with_writer(file).init();
    } else {
        subscriber.with_writer(std::io::stderr).init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = LaunchArgs::parse();

    let (settings, settings_path) =
        ConfigLoader::load(args.config.as_deref()).context("Failed to load settings")?;

    setup_logging(
        &args.effective_log_level(&settings),
        args.effective_log_file(&settings),
    )?;

    info!("Starting odbc-server v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = settings_path {
        info!("Loaded settings from {}", path.display());
    }

    let config = args
        .to_server_config(&settings)
        .context("Invalid configuration")?;
    info!(
        "Connecting with {}",
        redact_connection_string(&config.connection_string)
    );

    let session = OdbcSession::open(&config.connection_string)
        .await
        .context("Failed to open ODBC connection")?;

    let shutdown = CancellationToken::new();
    let server = NotebookServer::bind(&config, Arc::new(session), shutdown)
        .await
        .context("Failed to start server")?;

    server.run().await.context("Server error")?;

    info!("odbc-server shut down");

    Ok(())
}
