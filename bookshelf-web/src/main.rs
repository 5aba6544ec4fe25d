//! bookshelf-web - book catalog service
//!
//! Startup: resolve configuration, initialize logging, open the database and
//! storage directory, then serve HTTP until Ctrl+C or SIGTERM.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookshelf_common::config::{AppConfig, CliOverrides};
use bookshelf_common::db::init_database;
use bookshelf_common::form::BOOK_FORM;
use bookshelf_common::sink::JsonFileSink;
use bookshelf_common::storage::StorageDir;
use bookshelf_web::{build_router, AppState};

/// Command-line arguments for bookshelf-web
#[derive(Parser, Debug)]
#[command(name = "bookshelf-web")]
#[command(about = "Book catalog web service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for books.json and uploaded files [env: BOOKSHELF_STORAGE_DIR]
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// SQLite database file [env: BOOKSHELF_DATABASE]
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Address to bind [env: BOOKSHELF_HOST]
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on [env: BOOKSHELF_PORT]
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::resolve(&CliOverrides {
        config_file: args.config,
        storage_dir: args.storage_dir,
        database_path: args.database,
        host: args.host,
        port: args.port,
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("bookshelf_web={0},bookshelf_common={0},tower_http=info", config.log_level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting bookshelf-web v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("Storage directory: {}", config.storage_dir.display());
    info!("Database path: {}", config.database_path.display());

    let storage = StorageDir::new(&config.storage_dir);
    JsonFileSink::new(storage.clone())
        .ensure_primary_file()
        .await
        .context("Failed to prepare storage directory")?;

    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database ready");

    let year_bound = BOOK_FORM
        .fields()
        .iter()
        .find(|f| f.name == "year")
        .map(|f| format!("{:?}", f.kind))
        .unwrap_or_default();
    info!("Book form built with {} fields (year: {})", BOOK_FORM.fields().len(), year_bound);

    let app = build_router(AppState::new(pool, storage));

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", config.host, config.port))?;
    info!("bookshelf-web listening on http://{}", listener.local_addr()?);
    info!("Health check: http://{}/health", listener.local_addr()?);

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
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
