use axum::{extract::State, response::Json};

use crate::{
    clients::ContractGateway,
    handlers::{track, AppState},
    models::Contract,
    ApiResponse, ApiResult,
};

pub async fn list_contracts(
    State(state): State<AppState>,
) -> ApiResult<Vec<Contract>> {
    let contracts = track("list_contracts", state.backend.list_contracts().await)?;
    Ok(Json(ApiResponse::success(contracts)))
}
