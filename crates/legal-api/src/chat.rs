use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;

use legal_core::{ChatRequest, ChatResponse, SessionOrchestrator};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SessionOrchestrator>,
}

#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses((status = 200, description = "Chat turn result", body = ChatResponse)),
    tag = "chat"
)]
pub async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Json<ChatResponse> {
    Json(state.orchestrator.handle_chat(request).await)
}

pub fn routes(state: AppState) -> Router {
    Router::new().route("/api/chat", post(chat)).with_state(state)
}
