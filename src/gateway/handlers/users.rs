//! Admin user management.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{Claims, Role, User};
use crate::error::{AppError, AppResult};
use crate::gateway::state::AppState;
use crate::gateway::types::ApiResponse;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 8))]
    pub new_password: String,
}

/// List users
///
/// GET /api/users
#[utoipa::path(
    get,
    path = "/api/users",
    responses((status = 200, description = "Users", body = ApiResponse<Vec<User>>)),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<User>>>> {
    Ok(Json(ApiResponse::success(state.auth.list_users().await?)))
}

/// Create a user
///
/// POST /api/users
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<User>),
        (status = 409, description = "Username taken")
    ),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    // Admins may not mint accounts above their own rank.
    if !claims.role.allows(req.role) {
        return Err(AppError::Forbidden(
            "cannot create a user with a higher role than your own".into(),
        ));
    }
    let user = state
        .auth
        .create_user(&req.username, &req.password, req.role)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// Change a user's role
///
/// PUT /api/users/{id}
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses((status = 200, description = "Updated", body = ApiResponse<User>)),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    if !claims.role.allows(req.role) {
        return Err(AppError::Forbidden(
            "cannot grant a higher role than your own".into(),
        ));
    }
    Ok(Json(ApiResponse::success(
        state.auth.update_user_role(id, req.role).await?,
    )))
}

/// Delete a user
///
/// DELETE /api/users/{id}
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 400, description = "Cannot delete yourself or the last superadmin")
    ),
    tag = "Users"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.auth.delete_user(id, claims.user_id()?).await?;
    Ok(Json(ApiResponse::success(())))
}

/// Reset another user's password
///
/// POST /api/users/{id}/reset-password
#[utoipa::path(
    post,
    path = "/api/users/{id}/reset-password",
    params(("id" = i64, Path, description = "User id")),
    request_body = ResetPasswordRequest,
    responses((status = 200, description = "Password reset")),
    tag = "Users"
)]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    state.auth.reset_password(id, &req.new_password).await?;
    Ok(Json(ApiResponse::success(())))
}
