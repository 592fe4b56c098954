//! Pick-floor endpoints: the aggregated pick list, pick/short actions,
//! and the picked-items review with revert.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;
use validator::Validate;

use crate::auth::Claims;
use crate::error::{AppError, AppResult};
use crate::gateway::state::AppState;
use crate::gateway::types::ApiResponse;
use crate::picking::{
    MarkShortRequest, PickRequest, PickResult, PickRow, PickedItemRow, RevertRequest,
    RevertResult, ShortResult, SkuOrderRow,
};

/// Aggregated outstanding demand per SKU
///
/// GET /api/picklist
#[utoipa::path(
    get,
    path = "/api/picklist",
    responses((status = 200, description = "Pick list", body = ApiResponse<Vec<PickRow>>)),
    tag = "Picking"
)]
pub async fn get_picklist(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<PickRow>>>> {
    let rows = state.picking.pick_list().await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// FIFO queue of order lines behind one pick row
///
/// GET /api/picklist/{sku}/orders
#[utoipa::path(
    get,
    path = "/api/picklist/{sku}/orders",
    params(("sku" = String, Path, description = "SKU")),
    responses((status = 200, description = "Order lines in FIFO order", body = ApiResponse<Vec<SkuOrderRow>>)),
    tag = "Picking"
)]
pub async fn get_sku_orders(
    State(state): State<Arc<AppState>>,
    Path(sku): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<SkuOrderRow>>>> {
    let rows = state.picking.orders_for_sku(&sku).await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// Pick units of a SKU; allocation is FIFO across orders
///
/// POST /api/pick
#[utoipa::path(
    post,
    path = "/api/pick",
    request_body = PickRequest,
    responses(
        (status = 200, description = "Allocation applied", body = ApiResponse<PickResult>),
        (status = 409, description = "Demand exceeds remaining supply")
    ),
    tag = "Picking"
)]
pub async fn post_pick(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PickRequest>,
) -> AppResult<Json<ApiResponse<PickResult>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let result = state
        .picking
        .pick(&req.sku, req.qty, &claims.username, req.notes.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// Report a shortage against specific orders
///
/// POST /api/not-in-stock
#[utoipa::path(
    post,
    path = "/api/not-in-stock",
    request_body = MarkShortRequest,
    responses(
        (status = 200, description = "Shortage recorded", body = ApiResponse<ShortResult>),
        (status = 400, description = "Allocation exceeds remaining demand")
    ),
    tag = "Picking"
)]
pub async fn post_not_in_stock(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MarkShortRequest>,
) -> AppResult<Json<ApiResponse<ShortResult>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let result = state
        .picking
        .mark_short(&req.sku, &req.allocations, &claims.username, req.notes.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// Lines with picked units on orders not yet shipped
///
/// GET /api/picked-items
#[utoipa::path(
    get,
    path = "/api/picked-items",
    responses((status = 200, description = "Picked items", body = ApiResponse<Vec<PickedItemRow>>)),
    tag = "Picking"
)]
pub async fn get_picked_items(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<PickedItemRow>>>> {
    let rows = state.picking.picked_items().await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// Revert picked units on one line
///
/// POST /api/picked-items/{id}/revert
#[utoipa::path(
    post,
    path = "/api/picked-items/{id}/revert",
    params(("id" = i64, Path, description = "Order line id")),
    request_body = RevertRequest,
    responses(
        (status = 200, description = "Revert applied", body = ApiResponse<RevertResult>),
        (status = 409, description = "Order already packed")
    ),
    tag = "Picking"
)]
pub async fn post_revert(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(line_id): Path<i64>,
    Json(req): Json<RevertRequest>,
) -> AppResult<Json<ApiResponse<RevertResult>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let result = state
        .picking
        .revert_picked_item(line_id, req.qty, &claims.username, req.notes.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(result)))
}
