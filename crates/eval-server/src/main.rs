//! Position evaluation server.
//!
//! Serves `GET /eval` and `GET /health` over HTTP, backed by one Stockfish
//! process and a result cache.

use anyhow::{Context, Result};
use chess_eval::config::DEFAULT_CONFIG_FILE;
use chess_eval::{Config, EvalService};
use clap::Parser;
use eval_server::{app, AppState};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML). Missing file means defaults.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Address to listen on, overrides `server.bind`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Engine executable, overrides `engine.path`.
    #[arg(short, long)]
    engine: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(engine) = args.engine {
        config.engine.path = engine;
    }
    let default_depth = config.default_depth()?;

    let service = EvalService::from_config(&config).await;
    let state = AppState::new(service.clone(), default_depth);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;
    tracing::info!(
        addr = %config.server.bind,
        engine = %config.engine.path.display(),
        cache = ?config.cache.backend,
        "Server running"
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    service.shutdown().await;
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
