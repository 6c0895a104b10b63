//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, HttpSummarizer, JwtTokenService, LocalFileStager, MemoryStore},
    config::Config,
    error::ApiError,
    web::{router, state::AppState},
};
use docsum_core::ports::{CredentialStore, DocumentStore, SummaryStore};
use docsum_core::DocumentPipeline;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    let (users, documents, summaries): (
        Arc<dyn CredentialStore>,
        Arc<dyn DocumentStore>,
        Arc<dyn SummaryStore>,
    ) = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = Arc::new(DbAdapter::new(db_pool));
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            (db_adapter.clone(), db_adapter.clone(), db_adapter)
        }
        None => {
            warn!("DATABASE_URL is not set, data will be kept in memory only");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store.clone(), store)
        }
    };

    // --- 3. Initialize Service Adapters ---
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let stager = Arc::new(LocalFileStager::new(
        config.upload_dir.clone(),
        config.max_upload_bytes,
    ));
    let summarizer = Arc::new(
        HttpSummarizer::new(
            config.ai_base_url.clone(),
            config.ai_timeout,
            config.ai_health_check,
            config.ai_health_timeout,
        )
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?,
    );
    let tokens = Arc::new(JwtTokenService::new(
        &config.jwt_secret,
        config.jwt_expires_in,
    ));
    info!("Summarization service at {}", config.ai_base_url);

    // --- 4. Build the Shared AppState ---
    let pipeline = DocumentPipeline::new(documents, summaries, stager, summarizer);
    let app_state = Arc::new(AppState::new(config.clone(), users, tokens, pipeline));

    // --- 5. Create the Web Router ---
    let app = router(app_state)?;

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
