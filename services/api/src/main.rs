mod config;
mod error;
mod routes;

use crate::config::Config;
use crate::routes::{AppState, router};
use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use intervu_core::evaluator::LlmEvaluator;
use intervu_core::prompts::PromptSet;
use intervu_core::question_source::LlmQuestionSource;
use intervu_core::store::JsonDirStore;
use intervu_gemini::GeminiClient;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(config.log_level.into()))
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting InterVu API...");

    // --- 3. Load Prompts ---
    let prompts = match &config.prompts_dir {
        Some(dir) => PromptSet::from_dir(dir).context("Failed to load LLM prompts")?,
        None => PromptSet::default(),
    };

    // --- 4. Initialize Collaborators ---
    let llm = Arc::new(GeminiClient::new(
        config.gemini_api_key,
        config.gemini_model.clone(),
    ));
    tracing::info!("Using Gemini model '{}'", llm.model());

    let store = JsonDirStore::open(config.data_dir.clone())
        .await
        .with_context(|| format!("Failed to open data directory {}", config.data_dir.display()))?;

    let state = AppState {
        store: Arc::new(store),
        questions: Arc::new(LlmQuestionSource::new(llm.clone(), prompts.clone())),
        evaluator: Arc::new(LlmEvaluator::new(llm, prompts)),
    };

    // --- 5. Build the Router ---
    let origins = config
        .app_origins
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid entry in APP_ORIGINS")?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    let app = router(state).layer(cors);

    // --- 6. Serve ---
    tracing::info!("Listening on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
