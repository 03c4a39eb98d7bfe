use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    clients::QuoteGateway,
    errors::ServiceError,
    handlers::{track, AppState},
    models::{Quote, QuoteInput, QuoteStatus},
    ApiResponse, ApiResult,
};

#[derive(Debug, Deserialize)]
pub struct UpdateQuoteStatusRequest {
    pub status: QuoteStatus,
}

pub async fn list_quotes(
    State(state): State<AppState>,
) -> ApiResult<Vec<Quote>> {
    let quotes = track("list_quotes", state.backend.list_quotes().await)?;
    Ok(Json(ApiResponse::success(quotes)))
}

pub async fn get_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Quote> {
    let quote = track("get_quote", state.backend.get_quote(id).await)?;
    Ok(Json(ApiResponse::success(quote)))
}

/// Create a draft quote; the backend assigns the number and recomputes totals
pub async fn create_quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteInput>,
) -> Result<(StatusCode, Json<ApiResponse<Quote>>), ServiceError> {
    let quote = track("create_quote", state.backend.create_quote(request).await)?;
    info!(quote_number = %quote.quote_number, "Quote created via API");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(quote))))
}

pub async fn update_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<QuoteInput>,
) -> ApiResult<Quote> {
    let quote = track("update_quote", state.backend.update_quote(id, request).await)?;
    Ok(Json(ApiResponse::success(quote)))
}

/// Set a quote's status; any status may follow any other
pub async fn update_quote_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateQuoteStatusRequest>,
) -> ApiResult<Quote> {
    let quote = track(
        "update_quote_status",
        state.backend.update_quote_status(id, request.status).await,
    )?;
    info!(quote_number = %quote.quote_number, status = %quote.status, "Quote status updated");
    Ok(Json(ApiResponse::success(quote)))
}
