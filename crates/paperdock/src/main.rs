mod auth;
mod mem;
mod range;
mod web;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use shelf::{BlobDirectory, RecordStore, ShelfConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The Paperdock document server
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The directory holding documents and the record store.
    /// Defaults to PAPERDOCK_DATA_PATH or ~/.paperdock.
    #[arg(short, long)]
    state_dir: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Browser origin allowed to call the API
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match cli.state_dir {
        Some(dir) => ShelfConfig::with_base_path(dir),
        None => ShelfConfig::from_env()?,
    };
    std::fs::create_dir_all(&config.base_path).context("failed to create state directory")?;
    tracing::info!("using state directory: {}", config.base_path.display());

    let blobs = Arc::new(
        BlobDirectory::new(config.clone()).context("failed to initialize blob directory")?,
    );
    let records: Arc<dyn RecordStore> = Arc::new(
        shelf::FileStore::new(config.records_path()).context("failed to initialize record store")?,
    );
    tracing::info!(
        "record store ready: {} documents",
        records.count().unwrap_or(0)
    );

    let api_key = std::env::var("PAPERDOCK_API_KEY").ok();
    if api_key.is_none() {
        tracing::warn!("PAPERDOCK_API_KEY is not set; upload/list/delete are disabled");
    }

    let cors_origin: HeaderValue = cli
        .cors_origin
        .parse()
        .context("invalid --cors-origin value")?;

    let state = web::WebState {
        records: records.clone(),
        blobs,
        api_key,
    };
    let app = web::app(state, cors_origin);

    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("paperdock listening on http://{}", addr);
    tracing::info!("   Upload:  POST http://{}/upload-pdf", addr);
    tracing::info!("   List:    GET http://{}/list-pdf", addr);
    tracing::info!("   Delete:  DELETE http://{}/delete-pdf/:id", addr);
    tracing::info!("   Stream:  GET http://{}/stream-pdf/:id", addr);
    tracing::info!("   Health:  GET http://{}/health", addr);

    let shutdown_token = CancellationToken::new();

    let server_token = shutdown_token.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        server_token.cancelled().await;
        tracing::info!("server shutdown signal received");
    });

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.await {
            tracing::error!("server shutdown with error: {:?}", e);
        }
    });

    // Handle both SIGINT (Ctrl+C) and SIGTERM (systemd, container runtimes)
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down gracefully...");
            shutdown_token.cancel();
        }
        _ = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate()).expect("failed to set up SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            tracing::info!("received SIGTERM, shutting down gracefully...");
            shutdown_token.cancel();
        }
    }

    server_handle.await?;

    if let Err(e) = records.flush() {
        tracing::warn!("failed to persist record store during shutdown: {}", e);
    }
    tracing::info!("shutdown complete");

    Ok(())
}
