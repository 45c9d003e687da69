//! # GET /health

use axum::Json;
use pluto_types::HealthResponse;

pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
