use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use legal_core::entities::Message;
use legal_core::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub before: Option<DateTime<Utc>>,
}

fn default_limit() -> usize {
    50
}

#[utoipa::path(
    get,
    path = "/api/sessions/{session_id}/messages",
    params(("session_id" = Uuid, Path, description = "Session id")),
    responses((status = 200, description = "Messages, oldest first", body = [Message])),
    tag = "sessions"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<ListMessagesParams>,
) -> Result<Json<Vec<Message>>, (StatusCode, String)> {
    let messages = state
        .store
        .list_messages(session_id, params.limit, params.before)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(messages))
}

pub fn routes(state: AppState) -> Router {
    Router::new().route("/api/sessions/:session_id/messages", get(list_messages)).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_messages_params_defaults_limit_when_omitted() {
        let params: ListMessagesParams = serde_urlencoded::from_str("").unwrap();
        assert_eq!(params.limit, 50);
        assert_eq!(params.before, None);
    }

    #[test]
    fn list_messages_params_reads_an_explicit_limit_and_cursor() {
        let params: ListMessagesParams =
            serde_urlencoded::from_str("limit=10&before=2024-01-01T00%3A00%3A00Z").unwrap();
        assert_eq!(params.limit, 10);
        assert_eq!(params.before, Some("2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap()));
    }
}
