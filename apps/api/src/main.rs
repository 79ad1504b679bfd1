mod auth;
mod carbon;
mod config;
mod db;
mod errors;
mod extraction;
mod llm_client;
mod records;
mod reporting;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::carbon::{CarbonCalculator, EmissionFactorTable};
use crate::config::Config;
use crate::db::create_pool;
use crate::extraction::ExtractionAdapter;
use crate::llm_client::{LlmClient, TextModel};
use crate::records::archive::UploadArchive;
use crate::records::{MemoryRecordStore, PgRecordStore, RecordPipeline, RecordStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
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

    info!("Starting CarbonKind API v{}", env!("CARGO_PKG_VERSION"));

    // Record store: PostgreSQL when configured, otherwise process-local
    let store: Arc<dyn RecordStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            info!("PostgreSQL record store initialized");
            Arc::new(PgRecordStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set; records are kept in memory and lost on restart");
            Arc::new(MemoryRecordStore::new())
        }
    };

    // Text model: first reachable candidate, or none (fallback matcher only)
    let llm_timeout = Duration::from_secs(config.llm_timeout_secs);
    let model: Option<Arc<dyn TextModel>> = match &config.anthropic_api_key {
        Some(key) => match LlmClient::connect(key.clone(), &config.llm_models, llm_timeout).await
        {
            Ok(client) => {
                let client: Arc<dyn TextModel> = Arc::new(client);
                Some(client)
            }
            Err(e) => {
                warn!("AI extraction unavailable: {e}");
                None
            }
        },
        None => {
            warn!("ANTHROPIC_API_KEY not set; uploads use the fallback matcher");
            None
        }
    };

    // Optional archive of original uploads
    let archive = match &config.archive {
        Some(archive_config) => {
            let archive = UploadArchive::from_config(archive_config).await;
            info!("Upload archive initialized (bucket: {})", archive_config.s3_bucket);
            Some(archive)
        }
        None => None,
    };

    let factors = Arc::new(EmissionFactorTable::standard());
    let pipeline = RecordPipeline::new(
        store,
        ExtractionAdapter::new(model, factors.clone(), llm_timeout),
        CarbonCalculator::new(factors),
        archive,
    );

    // Build app state
    let state = AppState {
        pipeline,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the frontend host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
