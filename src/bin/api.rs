//! Kodigo API Server
//!
//! Run with: cargo run --bin kodigo-api
//!
//! # Configuration
//!
//! Read from the first of `~/.config/kodigo/config.toml`,
//! `/etc/kodigo/config.toml`, `./config.toml`, then overridden by:
//! - `KODIGO_DATA_DIR`: Data directory
//! - `KODIGO_PERSIST`: Keep documents on disk (default: true)
//! - `KODIGO_API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `KODIGO_API_PORT`: Port to listen on (default: 8090)
//! - `KODIGO_LOG_FORMAT`: `pretty` or `json`
//! - `KODIGO_LOG_FILE`: Also append logs to this file
//! - `RUST_LOG`: Log filter (default: kodigo=info,tower_http=debug)

use kodigo::api::{serve, AppState};
use kodigo::config::{Config, LoggingConfig};
use kodigo::store::MemoryStore;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_default();
    init_tracing(&config.logging);

    tracing::info!("Starting Kodigo API server v{}", env!("CARGO_PKG_VERSION"));

    let store_config = config.store.memory_store_config();
    match &store_config.data_dir {
        Some(dir) => tracing::info!("Data directory: {:?}", dir),
        None => tracing::info!("Persistence disabled, documents live in memory only"),
    }
    if !store_config.collections.is_empty() {
        tracing::info!("Collections: {}", store_config.collections.join(", "));
    }

    let store = Arc::new(MemoryStore::new(store_config)?);
    tracing::info!("Document store opened ({})", store.stats());

    let flush_task = store.start_background_flush();

    let state = AppState::new(Arc::clone(&store), config.api.clone());

    tracing::info!("Starting server on {}", config.api.addr());
    serve(state, &config.api).await?;

    tracing::info!("Shutting down document store...");
    flush_task.abort();
    store.shutdown()?;
    tracing::info!("Kodigo API server stopped");

    Ok(())
}

/// Registry + env filter + pretty or JSON fmt layer, plus an optional file
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("kodigo={},tower_http=debug", logging.level).into()
    });

    let file_layer = match logging.open_file() {
        Ok(file) => file.map(|file| {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
        }),
        Err(e) => {
            eprintln!("Cannot open log file {:?}: {}", logging.file, e);
            None
        }
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
