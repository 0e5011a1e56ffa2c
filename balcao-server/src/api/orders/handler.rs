//! Order API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::OrderStatus;

use crate::core::AppState;
use crate::orders::{OrderListing, with_staleness};
use crate::utils::{AppResponse, AppResult, ok};

/// List a store's orders, sorted by creation time descending, each
/// carrying its staleness flag
pub async fn list(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> AppResult<Json<AppResponse<Vec<OrderListing>>>> {
    let feed = state.feed_for(&store_id).await;
    Ok(ok(with_staleness(feed.orders(), shared::now_millis())))
}

#[derive(Serialize)]
pub struct AdvanceResponse {
    pub status: OrderStatus,
}

/// Move an order one step along the pipeline
pub async fn advance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<AdvanceResponse>>> {
    let status = state.actions.advance(&id).await?;
    Ok(ok(AdvanceResponse { status }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

/// Cancel an order, optionally recording a reason
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Option<Json<CancelRequest>>,
) -> AppResult<Json<AppResponse<()>>> {
    let reason = payload.and_then(|Json(p)| p.reason);
    state.actions.cancel(&id, reason).await?;
    state.notifier.info(format!("Pedido {id} cancelado"));
    Ok(ok(()))
}
