//! Bearer-token extraction and role gates.
//!
//! `jwt_auth_middleware` verifies the access token and injects [`Claims`]
//! into request extensions; the role gates sit on top of it per route
//! group.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::AppError;
use crate::gateway::state::AppState;

use super::models::Role;
use super::service::{Claims, TokenKind};

pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing Authorization header".into()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("invalid token format".into()))?;

    let claims = state.auth.verify_token(token)?;
    if claims.kind != TokenKind::Access {
        return Err(AppError::Unauthorized("not an access token".into()));
    }

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

fn require_role(request: &Request<Body>, required: Role) -> Result<(), AppError> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::Unauthorized("not authenticated".into()))?;
    if !claims.role.allows(required) {
        return Err(AppError::Forbidden(format!(
            "requires {} role",
            required.as_str()
        )));
    }
    Ok(())
}

pub async fn require_admin(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    require_role(&request, Role::Admin)?;
    Ok(next.run(request).await)
}

pub async fn require_superadmin(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    require_role(&request, Role::Superadmin)?;
    Ok(next.run(request).await)
}
