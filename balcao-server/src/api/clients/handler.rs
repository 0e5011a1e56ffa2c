//! Client API handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::core::AppState;
use crate::orders::ClientGroup;
use crate::utils::{AppResponse, AppResult, ok};

/// Orders grouped by client, most recently active first, display names
/// enriched through the profile directory
pub async fn list(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> AppResult<Json<AppResponse<Vec<ClientGroup>>>> {
    let feed = state.client_feed_for(&store_id).await;
    Ok(ok(feed.groups().await))
}
