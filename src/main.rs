use dotenvy::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use nss_server::config::Config;
use nss_server::routes::create_routes;
use nss_server::store::{MemoryStore, PgStore, RecordStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let store: Arc<dyn RecordStore> = match &config.database_url {
        Some(database_url) => {
            Arc::new(PgStore::connect(database_url, config.database_max_connections).await?)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, records are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };
    tracing::info!(backend = store.backend(), "Record store ready");

    let app = create_routes(store, &config);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server running at http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
