use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;

use legal_core::entities::{ComplianceStatus, Contract, ContractStatus};
use legal_core::{BlobStore, Store};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub blobs: Arc<dyn BlobStore>,
}

#[utoipa::path(
    post,
    path = "/api/contracts",
    responses((status = 200, description = "Uploaded contract record", body = legal_core::entities::Contract)),
    tag = "contracts"
)]
pub async fn upload_contract(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Contract>, (StatusCode, String)> {
    let mut title: Option<String> = None;
    let mut contract_type: Option<String> = None;
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name = "contract.pdf".to_string();

    while let Some(field) = multipart.next_field().await.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))? {
        match field.name().unwrap_or_default() {
            "title" => title = Some(field.text().await.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?),
            "contract_type" => {
                contract_type = Some(field.text().await.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?)
            }
            "file" => {
                if let Some(name) = field.file_name() {
                    file_name = name.to_string();
                }
                file_bytes =
                    Some(field.bytes().await.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?.to_vec());
            }
            _ => {}
        }
    }

    let title = title.ok_or((StatusCode::BAD_REQUEST, "missing title field".to_string()))?;
    let bytes = file_bytes.ok_or((StatusCode::BAD_REQUEST, "missing file field".to_string()))?;

    let contract_id = Uuid::now_v7();
    let key = format!("contracts/{contract_id}/{file_name}");
    let file_uri = state
        .blobs
        .put(&key, bytes, "application/octet-stream")
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let contract = Contract {
        id: contract_id,
        title,
        contract_type,
        parties: Vec::new(),
        uploaded_at: chrono::Utc::now(),
        file_uri,
        status: ContractStatus::Uploaded,
        overall_risk_score: None,
        compliance_status: ComplianceStatus::Unknown,
    };

    let saved = state.store.save_contract(contract).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(saved))
}

pub fn routes(state: AppState) -> Router {
    Router::new().route("/api/contracts", post(upload_contract)).with_state(state)
}
