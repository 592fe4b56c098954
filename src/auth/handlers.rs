//! Authentication endpoints.

use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::gateway::state::AppState;
use crate::gateway::types::ApiResponse;

use super::models::User;
use super::service::{AuthResponse, Claims};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Login with username + password
///
/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let resp = state.auth.login(&req.username, &req.password).await?;
    tracing::info!(user = %req.username, "login");
    Ok(Json(ApiResponse::success(resp)))
}

/// Logout
///
/// POST /api/auth/logout. Tokens are stateless; the client discards
/// them. The endpoint exists so the UI has a uniform call to make.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Logged out")),
    tag = "Auth"
)]
pub async fn logout(Extension(claims): Extension<Claims>) -> Json<ApiResponse<()>> {
    tracing::info!(user = %claims.username, "logout");
    Json(ApiResponse::success(()))
}

/// Exchange a refresh token for a new token pair
///
/// POST /api/auth/refresh
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid refresh token")
    ),
    tag = "Auth"
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let resp = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(ApiResponse::success(resp)))
}

/// Current user
///
/// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<User>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = state.auth.get_user(claims.user_id()?).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// Change own password
///
/// POST /api/auth/change-password
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 401, description = "Current password incorrect")
    ),
    tag = "Auth"
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<()>>)> {
    state
        .auth
        .change_password(claims.user_id()?, &req.current_password, &req.new_password)
        .await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(()))))
}
