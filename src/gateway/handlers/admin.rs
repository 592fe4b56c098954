//! Superadmin surface: sync trigger/status and settings.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::gateway::state::AppState;
use crate::gateway::types::ApiResponse;
use crate::importer::{SyncLog, sync_log};
use crate::settings::{ApiSettings, NotifierSettings};

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncTriggered {
    pub sync_log_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SyncStatus {
    pub latest: Option<SyncLog>,
    pub last_sync_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_sync_status: Option<String>,
}

/// Trigger a sync now
///
/// POST /api/admin/sync. Claims the single-flight slot synchronously
/// (so a busy sync answers 409 immediately) and runs the fetch in the
/// background; poll the status endpoint for the outcome.
#[utoipa::path(
    post,
    path = "/api/admin/sync",
    responses(
        (status = 202, description = "Sync started", body = ApiResponse<SyncTriggered>),
        (status = 409, description = "A sync is already in progress")
    ),
    tag = "Admin"
)]
pub async fn post_sync(
    State(state): State<Arc<AppState>>,
) -> AppResult<(StatusCode, Json<ApiResponse<SyncTriggered>>)> {
    let log_id = state.sync.try_begin().await?;

    let engine = state.sync.clone();
    tokio::spawn(async move {
        // Outcome lands in the sync log either way.
        let _ = engine.run(log_id).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(SyncTriggered { sync_log_id: log_id })),
    ))
}

/// Latest sync run and last-sync stamp
///
/// GET /api/admin/sync-status
#[utoipa::path(
    get,
    path = "/api/admin/sync-status",
    responses((status = 200, description = "Sync status", body = ApiResponse<SyncStatus>)),
    tag = "Admin"
)]
pub async fn get_sync_status(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<SyncStatus>>> {
    let latest = sync_log::latest(state.db.pool()).await?;
    let api = state.settings.api().await?;
    Ok(Json(ApiResponse::success(SyncStatus {
        latest,
        last_sync_at: api.last_sync_at,
        last_sync_status: api.last_sync_status,
    })))
}

/// Read upstream API settings
///
/// GET /api/admin/settings
#[utoipa::path(
    get,
    path = "/api/admin/settings",
    responses((status = 200, description = "API settings", body = ApiResponse<ApiSettings>)),
    tag = "Admin"
)]
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ApiSettings>>> {
    Ok(Json(ApiResponse::success(state.settings.api().await?)))
}

/// Update upstream API settings
///
/// PUT /api/admin/settings
#[utoipa::path(
    put,
    path = "/api/admin/settings",
    request_body = ApiSettings,
    responses((status = 200, description = "Updated", body = ApiResponse<ApiSettings>)),
    tag = "Admin"
)]
pub async fn put_settings(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ApiSettings>,
) -> AppResult<Json<ApiResponse<ApiSettings>>> {
    let updated = state.settings.update_api(req).await?;
    tracing::info!("upstream api settings updated");
    Ok(Json(ApiResponse::success(updated)))
}

/// Read SMTP/SMS settings
///
/// GET /api/admin/email-sms-settings
#[utoipa::path(
    get,
    path = "/api/admin/email-sms-settings",
    responses((status = 200, description = "Notifier settings", body = ApiResponse<NotifierSettings>)),
    tag = "Admin"
)]
pub async fn get_notifier_settings(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<NotifierSettings>>> {
    Ok(Json(ApiResponse::success(state.settings.notifier().await?)))
}

/// Update SMTP/SMS settings
///
/// PUT /api/admin/email-sms-settings
#[utoipa::path(
    put,
    path = "/api/admin/email-sms-settings",
    request_body = NotifierSettings,
    responses((status = 200, description = "Updated", body = ApiResponse<NotifierSettings>)),
    tag = "Admin"
)]
pub async fn put_notifier_settings(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NotifierSettings>,
) -> AppResult<Json<ApiResponse<NotifierSettings>>> {
    let updated = state.settings.update_notifier(req).await?;
    tracing::info!("notifier settings updated");
    Ok(Json(ApiResponse::success(updated)))
}
