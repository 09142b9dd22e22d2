//! Crackscan inference server binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crackscan_server::{app, default_model_path, AppState};

/// Crack detection inference service
#[derive(Parser)]
#[command(name = "crackscan-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Model artifact path (defaults to crackscan.safetensors next to the binary)
    #[arg(long, env = "CRACKSCAN_MODEL")]
    model: Option<PathBuf>,

    /// Maximum upload size in bytes
    #[arg(long, default_value_t = 16 * 1024 * 1024)]
    body_limit: usize,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.verbose {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let model_path = cli.model.unwrap_or_else(default_model_path);
    info!("Loading model from {}", model_path.display());

    // A failed load serves degraded rather than exiting
    let state = Arc::new(AppState::load(&model_path));

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app(state, cli.body_limit))
        .await
        .context("Server error")?;

    Ok(())
}
