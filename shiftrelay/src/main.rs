//! shiftrelay - Workforce relay and schedule-image import service
//!
//! Proxies employee/shift requests to the workforce API and turns uploaded
//! schedule images into shifts via a generative model.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use shiftrelay::{build_router, AppState};
use shiftrelay_common::config::{load_toml_config, ConfigOverrides, RelayConfig};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for shiftrelay
#[derive(Parser, Debug)]
#[command(name = "shiftrelay")]
#[command(about = "Workforce API relay with schedule-image shift import")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "SHIFTRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind
    #[arg(long, env = "SHIFTRELAY_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SHIFTRELAY_PORT")]
    port: Option<u16>,

    /// Workforce API base URL
    #[arg(long, env = "WORKFORCE_API_URL")]
    workforce_url: Option<String>,

    /// Workforce API bearer token
    #[arg(long, env = "WORKFORCE_API_TOKEN", hide_env_values = true)]
    workforce_token: Option<String>,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_API_URL")]
    gemini_url: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL")]
    gemini_model: Option<String>,
}

impl From<Args> for ConfigOverrides {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            workforce_url: args.workforce_url,
            workforce_token: args.workforce_token,
            gemini_url: args.gemini_url,
            gemini_api_key: args.gemini_api_key,
            gemini_model: args.gemini_model,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config file is read before tracing so its log level can seed the filter
    let toml = load_toml_config(args.config.as_deref()).context("Failed to load config file")?;
    let default_filter = format!("shiftrelay={0},shiftrelay_common={0},tower_http=info", toml.logging.level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting shiftrelay v{}", env!("CARGO_PKG_VERSION"));

    let config = RelayConfig::resolve(args.into(), toml).context("Invalid configuration")?;
    info!("Workforce API: {}", config.workforce.base_url);
    info!("Model: {} via {}", config.gemini.model, config.gemini.base_url);

    let state = AppState::from_config(&config).context("Failed to initialize upstream clients")?;
    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
