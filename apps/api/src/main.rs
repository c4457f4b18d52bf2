mod assistant;
mod config;
mod errors;
mod inference;
mod llm_client;
mod models;
mod records;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::inference::advance::ResumeAdvanceScorer;
use crate::inference::registry::ModelRegistry;
use crate::llm_client::LlmClient;
use crate::records::store::PgDocumentStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Recruit API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let store = Arc::new(PgDocumentStore::connect(&config.database_url).await?);

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Tabular bundles load on demand; the advance network loads once here.
    let mut models = ModelRegistry::new(
        config.salary_model_path.clone(),
        config.priority_model_path.clone(),
        config.advance_model_path.clone(),
        config.cache_bundles,
    );
    let advance_path = models.advance_path().to_path_buf();
    let embedder = config.embedder;
    match tokio::task::spawn_blocking(move || ResumeAdvanceScorer::load(&advance_path, embedder)).await? {
        Ok(scorer) => models = models.with_advance_scorer(scorer),
        Err(e) => warn!("Resume-advance model unavailable: {e}"),
    }
    info!(
        "Model registry ready (bundle cache {})",
        if config.cache_bundles { "on" } else { "off" }
    );

    // Build app state
    let state = AppState {
        store,
        chat: Arc::new(llm),
        models: Arc::new(models),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS once the client origin is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
