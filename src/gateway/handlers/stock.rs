//! Out-of-stock backlog endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::AppResult;
use crate::gateway::state::AppState;
use crate::gateway::types::ApiResponse;
use crate::shortage::{ExceptionFilter, StockException};

/// Filtered stock-exception list
///
/// GET /api/out-of-stock
#[utoipa::path(
    get,
    path = "/api/out-of-stock",
    params(
        ("resolved" = Option<bool>, Query, description = "Filter by resolved flag"),
        ("from" = Option<String>, Query, description = "Reported-at lower bound (RFC 3339)"),
        ("to" = Option<String>, Query, description = "Reported-at upper bound (RFC 3339)"),
        ("search" = Option<String>, Query, description = "Free text over sku/title/vendor/order numbers"),
        ("sort" = Option<String>, Query, description = "timestamp | sku | qty_short | vendor"),
        ("dir" = Option<String>, Query, description = "asc | desc")
    ),
    responses((status = 200, description = "Exceptions", body = ApiResponse<Vec<StockException>>)),
    tag = "OutOfStock"
)]
pub async fn get_out_of_stock(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ExceptionFilter>,
) -> AppResult<Json<ApiResponse<Vec<StockException>>>> {
    let rows = state.shortage.list(&filter).await?;
    Ok(Json(ApiResponse::success(rows)))
}

/// CSV export of the current filter result
///
/// GET /api/out-of-stock/export
#[utoipa::path(
    get,
    path = "/api/out-of-stock/export",
    responses((status = 200, description = "CSV body")),
    tag = "OutOfStock"
)]
pub async fn get_export(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ExceptionFilter>,
) -> AppResult<Response> {
    let csv = state.shortage.export_csv(&filter).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"out-of-stock.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

/// Send the unresolved backlog through the notifier
///
/// POST /api/out-of-stock/send
#[utoipa::path(
    post,
    path = "/api/out-of-stock/send",
    responses((status = 200, description = "Report sent; returns covered count", body = ApiResponse<usize>)),
    tag = "OutOfStock"
)]
pub async fn post_send(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<usize>>> {
    let count = state.shortage.send_report().await?;
    Ok(Json(ApiResponse::success(count)))
}

/// Mark an exception resolved (idempotent)
///
/// POST /api/out-of-stock/{id}/resolve
#[utoipa::path(
    post,
    path = "/api/out-of-stock/{id}/resolve",
    params(("id" = i64, Path, description = "Exception id")),
    responses((status = 200, description = "Resolved", body = ApiResponse<StockException>)),
    tag = "OutOfStock"
)]
pub async fn post_resolve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<StockException>>> {
    Ok(Json(ApiResponse::success(state.shortage.resolve(id).await?)))
}

/// Toggle the ordered-from-company flag
///
/// POST /api/out-of-stock/{id}/toggle-ordered
#[utoipa::path(
    post,
    path = "/api/out-of-stock/{id}/toggle-ordered",
    params(("id" = i64, Path, description = "Exception id")),
    responses((status = 200, description = "Toggled", body = ApiResponse<StockException>)),
    tag = "OutOfStock"
)]
pub async fn post_toggle_ordered(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<StockException>>> {
    Ok(Json(ApiResponse::success(
        state.shortage.toggle_ordered(id).await?,
    )))
}

/// Toggle the not-available/cancel flag
///
/// POST /api/out-of-stock/{id}/toggle-na-cancel
#[utoipa::path(
    post,
    path = "/api/out-of-stock/{id}/toggle-na-cancel",
    params(("id" = i64, Path, description = "Exception id")),
    responses((status = 200, description = "Toggled", body = ApiResponse<StockException>)),
    tag = "OutOfStock"
)]
pub async fn post_toggle_na_cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<StockException>>> {
    Ok(Json(ApiResponse::success(
        state.shortage.toggle_na_cancel(id).await?,
    )))
}
