//! Approval API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use shared::ApprovalState;

use crate::core::AppState;
use crate::utils::{AppResponse, AppResult, ok};

/// The resolver's current verdict for the signed-in operator
pub async fn status(State(state): State<AppState>) -> AppResult<Json<AppResponse<ApprovalState>>> {
    Ok(ok(state.approval.state()))
}

#[derive(Debug, Deserialize)]
pub struct OperatorRequest {
    #[serde(rename = "storeId")]
    pub store_id: String,
}

/// Grant an operator access to a store
pub async fn approve(
    State(state): State<AppState>,
    Path(operator_id): Path<String>,
    Json(payload): Json<OperatorRequest>,
) -> AppResult<Json<AppResponse<()>>> {
    state
        .procedures
        .approve_operator(&operator_id, &payload.store_id)
        .await?;
    Ok(ok(()))
}

/// Explicitly deny an operator; wins over any standing approval
pub async fn suspend(
    State(state): State<AppState>,
    Path(operator_id): Path<String>,
    Json(payload): Json<OperatorRequest>,
) -> AppResult<Json<AppResponse<()>>> {
    state
        .procedures
        .suspend_operator(&operator_id, &payload.store_id)
        .await?;
    Ok(ok(()))
}
