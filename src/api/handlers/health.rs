use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use crate::AppState;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub transformer: String,
    pub transformer_status: String,
    pub remote_uploads: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (transformer, reachable) = state.image_service.transformer_status().await;

    let transformer_status = if reachable { "connected" } else { "disconnected" };

    let remote_uploads = if state.image_service.remote_enabled() {
        "enabled"
    } else {
        "disabled"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        transformer: transformer.to_string(),
        transformer_status: transformer_status.to_string(),
        remote_uploads: remote_uploads.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
