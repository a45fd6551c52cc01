use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;

use crate::app_state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub engine: String,
}

#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses(
        (status = 200, description = "Rendering engine is up", body = HealthResponse),
        (status = 503, description = "Rendering engine is gone")
    )
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let engine = state.session.name();
    if state.session.is_alive().await {
        info!(engine, "health check passed");
        Ok(Json(HealthResponse {
            status: "OK".to_string(),
            engine: engine.to_string(),
        }))
    } else {
        error!(engine, "rendering engine health check failed");
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
