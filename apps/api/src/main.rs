mod automation_client;
mod config;
mod db;
mod errors;
mod models;
mod orchestrator;
mod records;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::automation_client::{AutomationBackends, AutomationClient};
use crate::config::Config;
use crate::db::create_pool;
use crate::orchestrator::{AutomationDeps, FixedDelay, SessionRegistry};
use crate::records::{InMemoryRecordStore, PgRecordStore, RecordStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobX API v{}", env!("CARGO_PKG_VERSION"));

    // Application record store
    let records: Arc<dyn RecordStore> = match &config.database_url {
        Some(url) => Arc::new(PgRecordStore::new(create_pool(url).await?)),
        None => {
            warn!("DATABASE_URL not set; application records are kept in memory only");
            Arc::new(InMemoryRecordStore::new())
        }
    };

    // Automation backend client
    let client = AutomationClient::new(&config.automation)?;
    info!(
        "Automation backend: {} (apply delay {}ms, max {} jobs)",
        client.base_url(),
        config.automation.apply_delay.as_millis(),
        config.automation.max_jobs
    );

    let automation = AutomationDeps {
        backends: AutomationBackends::from_client(client),
        records: records.clone(),
        pacer: Arc::new(FixedDelay::new(config.automation.apply_delay)),
        max_jobs: config.automation.max_jobs,
    };

    let state = AppState {
        config: config.clone(),
        records,
        automation,
        sessions: SessionRegistry::new(config.automation.session_idle_timeout),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the dashboard origin once it is configurable

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
