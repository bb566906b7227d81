//! QPAS Storage Daemon
//!
//! Serves the archive's HTTP API over a local SQLite database.
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults
//! qpas-storage
//!
//! # Start with custom config
//! qpas-storage --config /path/to/config.toml
//!
//! # Custom port and storage directory
//! qpas-storage --http-port 9000 --storage-dir /data/qpas
//!
//! # Throwaway database, nothing written to disk
//! qpas-storage --in-memory
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use qpas_storage::{ArchiveDb, Config, HttpServer, Services};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "qpas-storage")]
#[command(about = "Record service for the question paper archive")]
struct Args {
    /// Path to config file
    #[arg(short, long, env = "QPAS_CONFIG")]
    config: Option<PathBuf>,

    /// Storage directory
    #[arg(long, env = "QPAS_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// HTTP API port
    #[arg(long, env = "QPAS_HTTP_PORT")]
    http_port: Option<u16>,

    /// Use an in-memory database
    #[arg(long, env = "QPAS_IN_MEMORY")]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("qpas_storage=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    // Apply CLI overrides
    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    config.validate().context("Invalid configuration")?;

    info!(
        storage_dir = %config.storage_dir.display(),
        http_port = config.http_port,
        in_memory = args.in_memory,
        "Starting qpas-storage"
    );

    let db = if args.in_memory {
        ArchiveDb::open_in_memory()?
    } else {
        let db = ArchiveDb::open(&config.database_path())?;

        let config_path = config.config_path();
        if !config_path.exists() {
            config.save(&config_path)?;
            info!(path = %config_path.display(), "Created default config");
        }
        db
    };

    let services = Arc::new(Services::new(Arc::new(db), &config));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let server = Arc::new(HttpServer::new(services, addr));

    server.run().await?;
    Ok(())
}
