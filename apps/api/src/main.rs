mod config;
mod documents;
mod errors;
mod llm_client;
mod matching;
mod routes;
mod scoring;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::documents::hrflow::HrflowParser;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::scoring::ReviewedHybridScorer;
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

    info!("Starting staffing API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(config.openai_api_key.clone(), config.openai_base_url.clone());
    info!(
        "LLM client initialized (review: {}, analysis: {}, embeddings: {})",
        llm_client::REVIEW_MODEL,
        llm_client::ANALYSIS_MODEL,
        llm_client::EMBEDDING_MODEL
    );

    // Document parser. Scoring requests fail with CONFIGURATION_ERROR until credentials are set.
    let parser = Arc::new(HrflowParser::new(&config.hrflow));
    if config.hrflow.credentials().is_none() {
        warn!("HRFlow credentials missing: /api/scoring will reject requests");
    }

    let scorer = Arc::new(ReviewedHybridScorer::new(llm.clone()));

    // Build app state
    let state = AppState {
        llm,
        config: config.clone(),
        parser,
        scorer,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the front-end host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
