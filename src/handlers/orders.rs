use axum::{
    extract::{Path, State},
    response::Json,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    clients::OrderGateway,
    handlers::{track, AppState},
    models::{Order, OrderStatusUpdate},
    ApiResponse, ApiResult,
};

/// List every order, sorted by order number
pub async fn list_orders(
    State(state): State<AppState>,
) -> ApiResult<Vec<Order>> {
    let orders = track("list_orders", state.backend.get_orders().await)?;
    Ok(Json(ApiResponse::success(orders)))
}

/// Store a new status together with the item ids flagged as shipped
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<OrderStatusUpdate>,
) -> ApiResult<Order> {
    let status = request.status;
    let order = track(
        "update_order_status",
        state.backend.update_order_status(id, request).await,
    )?;
    info!(order_id = %id, %status, "Order status updated");
    Ok(Json(ApiResponse::success(order)))
}
