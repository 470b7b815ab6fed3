use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod monitor;
pub mod notify;
pub mod service;
pub mod store;

#[cfg(test)]
mod testutil;

use crate::config::{EngineConfig, EngineTables};
use crate::monitor::SlaMonitor;
use crate::notify::{LogNotifier, Notifier};
use crate::store::{MemoryStore, PERMISSIONS_DOC, PIPELINE_DOC, PgStore, Store, collections};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Atelier engine...");

    // Engine tables: pipeline seed, branch catalog, checkpoints, SLA settings
    let config = match std::env::var("ATELIER_CONFIG") {
        Ok(path) => {
            tracing::info!("Loading engine config from {}", path);
            EngineConfig::load(std::path::Path::new(&path)).expect("Failed to load engine config")
        }
        Err(_) => {
            tracing::info!("ATELIER_CONFIG not set, using built-in defaults");
            config::default_config()
        }
    };

    // Backend is chosen once at startup; everything downstream sees `dyn Store`
    let store: Arc<dyn Store> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            tracing::info!("Connecting to database...");
            let pg = PgStore::connect(&url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");
            Arc::new(pg)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using in-memory store (volatile)");
            Arc::new(MemoryStore::new())
        }
    };

    seed_if_absent(store.as_ref(), &config)
        .await
        .expect("Failed to seed configuration documents");

    let tables = Arc::new(EngineTables::from_config(&config));
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    // Background SLA scan at the configured cadence
    let sla_monitor = Arc::new(SlaMonitor::new(
        store.clone(),
        tables.clone(),
        notifier.clone(),
    ));
    sla_monitor.spawn();

    // Build router with all API endpoints
    let app = api::create_router(api::AppState {
        store,
        tables,
        notifier,
    });

    // Get bind address
    let addr = std::env::var("ATELIER_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

/// Write the pipeline definition and permission table documents on first
/// boot. Existing documents win: live edits survive restarts.
async fn seed_if_absent(
    store: &dyn Store,
    config: &EngineConfig,
) -> Result<(), crate::store::StoreError> {
    if store.get(collections::CONFIG, PIPELINE_DOC).await?.is_none() {
        tracing::info!("Seeding pipeline definition");
        crate::store::save(
            store,
            collections::CONFIG,
            PIPELINE_DOC,
            &config.pipeline_definition(),
        )
        .await?;
    }
    if store
        .get(collections::CONFIG, PERMISSIONS_DOC)
        .await?
        .is_none()
    {
        tracing::info!("Seeding permission table");
        crate::store::save(
            store,
            collections::CONFIG,
            PERMISSIONS_DOC,
            &config.permission_table(),
        )
        .await?;
    }
    Ok(())
}
