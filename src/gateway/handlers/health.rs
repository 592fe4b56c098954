//! Liveness probe.

use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::gateway::state::AppState;
use crate::gateway::types::ApiResponse;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

/// Health check
///
/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service health", body = ApiResponse<HealthStatus>)),
    tag = "Health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthStatus>> {
    let database = match state.db.health_check().await {
        Ok(()) => "up",
        Err(e) => {
            tracing::warn!("health check: database unreachable: {e}");
            "down"
        }
    };
    Json(ApiResponse::success(HealthStatus {
        status: "ok",
        database,
        version: env!("CARGO_PKG_VERSION"),
    }))
}
