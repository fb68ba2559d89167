//! Zentinel SOAP server binary.
//!
//! Run with: `zentinel-soap-server --config config.yaml`
//!
//! Serves the demonstration `testService`; its WSDL is at
//! `http://<listen>/testService?wsdl`.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use zentinel_soap_server::demo::test_service;
use zentinel_soap_server::{SoapServer, SoapServerConfig};

/// SOAP server exposing Rust services over HTTP.
///
/// POST an envelope to `/<service>` to call an operation, or
/// GET `/<service>?wsdl` for the service description.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Listen address, overrides `settings.listen` (e.g. "0.0.0.0:1337")
    #[arg(long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting Zentinel SOAP server v{}", env!("CARGO_PKG_VERSION"));
    info!("Config file: {}", args.config.display());

    // Load configuration
    let mut config: SoapServerConfig = if args.config.exists() {
        let content = tokio::fs::read_to_string(&args.config)
            .await
            .context("Failed to read config file")?;
        serde_yaml::from_str(&content).context("Failed to parse config file")?
    } else {
        info!("Config file not found, using defaults");
        SoapServerConfig::default()
    };

    if let Some(listen) = args.listen {
        config.settings.listen = listen;
    }

    info!(
        listen = %config.settings.listen,
        target_namespace = %config.settings.target_namespace,
        xxe_prevention = config.xxe_prevention.enabled,
        debug_headers = config.settings.debug_headers,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.settings.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.settings.listen))?;

    let mut server = SoapServer::new(config);
    server.add_service(test_service().build());

    Arc::new(server)
        .serve(listener, shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server");
}
