//! Order boards and operator transitions.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::Claims;
use crate::error::AppResult;
use crate::gateway::state::AppState;
use crate::gateway::types::ApiResponse;
use crate::orders::store::LineDetail;
use crate::orders::{Order, OrderStatus};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<LineDetail>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeStateRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMessageRequest {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SplitAssignment {
    pub line_id: i64,
    pub batch: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SplitRequest {
    pub assignments: Vec<SplitAssignment>,
}

/// Open + picking orders, oldest first
///
/// GET /api/orders/status
#[utoipa::path(
    get,
    path = "/api/orders/status",
    responses((status = 200, description = "Active orders", body = ApiResponse<Vec<Order>>)),
    tag = "Orders"
)]
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    Ok(Json(ApiResponse::success(state.orders.active().await?)))
}

/// Orders whose current shipment is complete
///
/// GET /api/orders/ready-to-pack
#[utoipa::path(
    get,
    path = "/api/orders/ready-to-pack",
    responses((status = 200, description = "Ready-to-pack orders", body = ApiResponse<Vec<Order>>)),
    tag = "Orders"
)]
pub async fn get_ready_to_pack(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    Ok(Json(ApiResponse::success(
        state.orders.ready_to_pack().await?,
    )))
}

/// Packed orders, newest first, paged
///
/// GET /api/orders/packed
#[utoipa::path(
    get,
    path = "/api/orders/packed",
    params(
        ("limit" = Option<i64>, Query, description = "Page size (default 50)"),
        ("offset" = Option<i64>, Query, description = "Page offset")
    ),
    responses((status = 200, description = "Packed orders", body = ApiResponse<Vec<Order>>)),
    tag = "Orders"
)]
pub async fn get_packed(
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    Ok(Json(ApiResponse::success(
        state.orders.packed(page.limit, page.offset).await?,
    )))
}

/// Order detail with lines and product info
///
/// GET /api/orders/{id}
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order detail", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Unknown order")
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let (order, lines) = state.orders.detail(id).await?;
    Ok(Json(ApiResponse::success(OrderDetail { order, lines })))
}

/// Pack the current shipment batch
///
/// POST /api/orders/{id}/mark-packed
#[utoipa::path(
    post,
    path = "/api/orders/{id}/mark-packed",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Packed (or advanced to next batch)", body = ApiResponse<Order>),
        (status = 409, description = "Order is not ready to pack")
    ),
    tag = "Orders"
)]
pub async fn post_mark_packed(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.mark_packed(id, &claims.username).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Admin: push a ready order back to picking
///
/// POST /api/orders/{id}/revert-to-picking
#[utoipa::path(
    post,
    path = "/api/orders/{id}/revert-to-picking",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order back in picking", body = ApiResponse<Order>),
        (status = 409, description = "Order is not ready_to_pack")
    ),
    tag = "Orders"
)]
pub async fn post_revert_to_picking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.revert_to_picking(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Admin: move a packed order back to an earlier state
///
/// POST /api/orders/{id}/change-state
#[utoipa::path(
    post,
    path = "/api/orders/{id}/change-state",
    params(("id" = i64, Path, description = "Order id")),
    request_body = ChangeStateRequest,
    responses(
        (status = 200, description = "State changed", body = ApiResponse<Order>),
        (status = 409, description = "Order is not packed")
    ),
    tag = "Orders"
)]
pub async fn post_change_state(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ChangeStateRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.change_state(id, req.status).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Update the customer-facing message on an order
///
/// PATCH /api/orders/{id}/update-message
#[utoipa::path(
    patch,
    path = "/api/orders/{id}/update-message",
    params(("id" = i64, Path, description = "Order id")),
    request_body = UpdateMessageRequest,
    responses((status = 200, description = "Message updated", body = ApiResponse<Order>)),
    tag = "Orders"
)]
pub async fn patch_update_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateMessageRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.update_message(id, req.message).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Admin: partition the order's lines into shipment batches
///
/// POST /api/orders/{id}/split
#[utoipa::path(
    post,
    path = "/api/orders/{id}/split",
    params(("id" = i64, Path, description = "Order id")),
    request_body = SplitRequest,
    responses(
        (status = 200, description = "Order split", body = ApiResponse<Order>),
        (status = 400, description = "Invalid batch assignment")
    ),
    tag = "Orders"
)]
pub async fn post_split(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<SplitRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let assignments: Vec<(i64, i32)> = req
        .assignments
        .iter()
        .map(|a| (a.line_id, a.batch))
        .collect();
    let order = state.orders.split(id, &assignments).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// Admin: collapse all shipment batches back into one
///
/// POST /api/orders/{id}/unsplit
#[utoipa::path(
    post,
    path = "/api/orders/{id}/unsplit",
    params(("id" = i64, Path, description = "Order id")),
    responses((status = 200, description = "Order unsplit", body = ApiResponse<Order>)),
    tag = "Orders"
)]
pub async fn post_unsplit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.unsplit(id).await?;
    Ok(Json(ApiResponse::success(order)))
}
