mod chat;
mod contracts;
mod sessions;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use legal_core::{AgentCatalog, ChatRequest, ChatResponse, RuntimeConfig, SessionOrchestrator};
use legal_llm_gemini::GeminiModelClient;
use legal_storage::{Database, FilesystemBlobStore};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok", version: env!("CARGO_PKG_VERSION") })
}

#[derive(OpenApi)]
#[openapi(
    paths(chat::chat, contracts::upload_contract, sessions::list_messages),
    components(schemas(
        ChatRequest,
        ChatResponse,
        legal_core::entities::Citation,
        legal_core::entities::Contract,
        legal_core::entities::ContractStatus,
        legal_core::entities::ComplianceStatus,
        legal_core::entities::Party,
        legal_core::entities::Message,
        legal_core::entities::MessageRole,
        legal_core::entities::ToolCallSummary,
    )),
    tags(
        (name = "chat", description = "Conversational orchestration endpoint"),
        (name = "contracts", description = "Contract upload"),
        (name = "sessions", description = "Session message history"),
    ),
    info(
        title = "Legal Document Analysis API",
        version = "0.1.0",
        description = "Multi-agent orchestration runtime for legal document analysis",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "legal_api=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RuntimeConfig::from_env().context("invalid runtime configuration")?;
    tracing::info!(provider = %config.model_provider, grounded = config.use_grounded_backend, "legal-api starting");

    let db = Database::from_url(&config.database_url).await.context("failed to connect to database")?;
    db.migrate().await.context("failed to run database migrations")?;
    tracing::info!("connected to database and applied migrations");

    let store: Arc<dyn legal_core::Store> = Arc::new(db);
    let blobs: Arc<dyn legal_core::BlobStore> = Arc::new(FilesystemBlobStore::new(&config.blob_storage_root));

    let model: Arc<dyn legal_core::ModelClient> = match config.model_provider.as_str() {
        "gemini" => Arc::new(GeminiModelClient::from_env().context("failed to configure Gemini model client")?),
        other => {
            return Err(anyhow::anyhow!("unknown MODEL_PROVIDER: {other}"));
        }
    };

    let mut registry = legal_core::ToolRegistry::new();
    legal_core::register_builtins(&mut registry, store.clone(), blobs.clone());
    let tools = Arc::new(registry);

    let catalog = Arc::new(AgentCatalog::with_builtins(config.max_tool_iterations_default));

    let orchestrator = Arc::new(SessionOrchestrator::new(
        store.clone(),
        model,
        tools,
        catalog,
        config.history_window_pairs,
        config.agent_turn_timeout,
        config.request_timeout,
        config.use_grounded_backend,
    ));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .merge(chat::routes(chat::AppState { orchestrator }))
        .merge(contracts::routes(contracts::AppState { store: store.clone(), blobs }))
        .merge(sessions::routes(sessions::AppState { store }))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await.context("failed to bind to address")?;
    tracing::info!(address = %config.bind_address, "listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
