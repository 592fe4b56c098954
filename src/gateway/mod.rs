//! HTTP gateway: router assembly and server startup.
//!
//! Route groups carry their role gates as layers; handlers stay thin and
//! the engines own the transactions.

pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post, put},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::middleware::{jwt_auth_middleware, require_admin, require_superadmin};
use crate::config::AppConfig;
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    // Unauthenticated: login + token refresh.
    let auth_public = Router::new()
        .route("/auth/login", post(crate::auth::handlers::login))
        .route("/auth/refresh", post(crate::auth::handlers::refresh));

    // Any authenticated role.
    let staff_routes = Router::new()
        .route("/auth/logout", post(crate::auth::handlers::logout))
        .route("/auth/me", get(crate::auth::handlers::me))
        .route(
            "/auth/change-password",
            post(crate::auth::handlers::change_password),
        )
        // Pick floor
        .route("/picklist", get(handlers::picklist::get_picklist))
        .route(
            "/picklist/{sku}/orders",
            get(handlers::picklist::get_sku_orders),
        )
        .route("/pick", post(handlers::picklist::post_pick))
        .route("/not-in-stock", post(handlers::picklist::post_not_in_stock))
        .route("/picked-items", get(handlers::picklist::get_picked_items))
        .route(
            "/picked-items/{id}/revert",
            post(handlers::picklist::post_revert),
        )
        // Order boards + packing
        .route("/orders/status", get(handlers::orders::get_status))
        .route(
            "/orders/ready-to-pack",
            get(handlers::orders::get_ready_to_pack),
        )
        .route("/orders/packed", get(handlers::orders::get_packed))
        .route("/orders/{id}", get(handlers::orders::get_order))
        .route(
            "/orders/{id}/mark-packed",
            post(handlers::orders::post_mark_packed),
        )
        .route(
            "/orders/{id}/update-message",
            patch(handlers::orders::patch_update_message),
        )
        // Shortage backlog
        .route("/out-of-stock", get(handlers::stock::get_out_of_stock))
        .route("/out-of-stock/export", get(handlers::stock::get_export))
        .route("/out-of-stock/send", post(handlers::stock::post_send))
        .route(
            "/out-of-stock/{id}/resolve",
            post(handlers::stock::post_resolve),
        )
        .route(
            "/out-of-stock/{id}/toggle-ordered",
            post(handlers::stock::post_toggle_ordered),
        )
        .route(
            "/out-of-stock/{id}/toggle-na-cancel",
            post(handlers::stock::post_toggle_na_cancel),
        )
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    // Admin and up: state reversals, split, user management.
    let admin_routes = Router::new()
        .route(
            "/orders/{id}/revert-to-picking",
            post(handlers::orders::post_revert_to_picking),
        )
        .route(
            "/orders/{id}/change-state",
            post(handlers::orders::post_change_state),
        )
        .route("/orders/{id}/split", post(handlers::orders::post_split))
        .route("/orders/{id}/unsplit", post(handlers::orders::post_unsplit))
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/{id}",
            put(handlers::users::update_user).delete(handlers::users::delete_user),
        )
        .route(
            "/users/{id}/reset-password",
            post(handlers::users::reset_password),
        )
        .layer(from_fn(require_admin))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    // Superadmin only: upstream credentials, notifier credentials, sync.
    let superadmin_routes = Router::new()
        .route("/admin/sync", post(handlers::admin::post_sync))
        .route("/admin/sync-status", get(handlers::admin::get_sync_status))
        .route(
            "/admin/settings",
            get(handlers::admin::get_settings).put(handlers::admin::put_settings),
        )
        .route(
            "/admin/email-sms-settings",
            get(handlers::admin::get_notifier_settings)
                .put(handlers::admin::put_notifier_settings),
        )
        .layer(from_fn(require_superadmin))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    let api = auth_public
        .merge(staff_routes)
        .merge(admin_routes)
        .merge(superadmin_routes);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api", api)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Bind and serve until the process is stopped.
pub async fn run_server(config: &AppConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.bind_addr, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;

    tracing::info!("gateway listening on http://{addr}");
    tracing::info!("api docs at http://{addr}/docs");

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("server error: {e}"))
}
