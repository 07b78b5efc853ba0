use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use tally::api;
use tally::config::{Config, StoreBackend};
use tally::stats::VisitRecorder;
use tally::store::{AggregateStore, FsBlobStore, HttpBlobStore, MemoryStore, SqliteKvStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize the aggregate store
    let store: Arc<dyn AggregateStore> = match config.store.backend {
        StoreBackend::Blob => {
            info!("Using blob storage: {}", config.store.blob_path);
            Arc::new(FsBlobStore::new(&config.store.blob_path))
        }
        StoreBackend::Kv => {
            info!("Using key-value storage: {}", config.store.database_url);
            Arc::new(SqliteKvStore::new(&config.store.database_url).await?)
        }
        StoreBackend::Http => {
            let url = config.store.remote_store_url.as_deref().ok_or_else(|| {
                anyhow::anyhow!("REMOTE_STORE_URL must be set when STORE_BACKEND=http")
            })?;
            info!("Using remote blob storage: {url}");
            Arc::new(HttpBlobStore::new(url)?)
        }
        StoreBackend::Memory => {
            warn!("No durable backend bound - stats will read as zeros after a restart");
            Arc::new(MemoryStore::new())
        }
    };
    store.init().await?;

    let recorder = VisitRecorder::new(Arc::clone(&store));
    let router = api::create_router(recorder);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Visitor tracking server listening on http://{addr}");
    info!("   - Stats endpoint at http://{addr}/api/track-visit");

    axum::serve(listener, router).await?;

    Ok(())
}
