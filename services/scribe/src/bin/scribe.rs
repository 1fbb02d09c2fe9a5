//! services/scribe/src/bin/scribe.rs

use async_openai::{config::OpenAIConfig, Client};
use scribe_core::{InferenceService, PanelHost};
use scribe_lib::{
    adapters::{
        BroadcastPanelHost, DbAdapter, FileTokenStore, OpenAiInferenceAdapter, SolveHttpAdapter,
    },
    config::{Config, InferenceBackend},
    content::SourceRouter,
    error::ApiError,
    relay::{Relay, RelaySettings},
    web::{self, state::AppState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
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
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let inference: Arc<dyn InferenceService> = match config.inference_backend {
        InferenceBackend::Solve => {
            info!("Using the solve endpoint at {}.", config.solve_endpoint);
            Arc::new(SolveHttpAdapter::new(
                reqwest::Client::new(),
                config.solve_endpoint.clone(),
            ))
        }
        InferenceBackend::OpenAi => {
            let api_key = config
                .openai_api_key
                .as_ref()
                .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?;
            let openai_client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
            info!("Using OpenAI model {}.", config.qa_model);
            Arc::new(OpenAiInferenceAdapter::new(openai_client, config.qa_model.clone()))
        }
    };
    let tokens = Arc::new(FileTokenStore::new(config.token_store_path.clone()));
    let host = BroadcastPanelHost::default();

    // --- 4. Start the Background Relay ---
    let panel_host: Arc<dyn PanelHost> = Arc::new(host.clone());
    let (relay, _relay_task) = Relay::new(
        panel_host,
        tokens.clone(),
        RelaySettings {
            oauth_redirect_prefix: config.oauth_redirect_prefix.clone(),
            options_page_url: config.options_page_url.clone(),
        },
    )
    .spawn();

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        relay,
        inference,
        store: db_adapter.clone(),
        identity: db_adapter,
        tokens,
        host,
        router: Arc::new(SourceRouter::standard()),
    });

    // --- 6. Create the Web Router ---
    let app = web::router(app_state);

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
