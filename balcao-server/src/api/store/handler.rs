//! Store API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::completeness::Verdict;
use crate::core::AppState;
use crate::store::ToggleOutcome;
use crate::utils::{AppResponse, AppResult, ok};

/// The persisted status record; a store that was never evaluated
/// reads as offline and unconfigured
pub async fn status(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> AppResult<Json<AppResponse<shared::StoreStatus>>> {
    let record = state
        .store
        .read(&format!("tenants/{store_id}/status"))?
        .map(serde_json::from_value)
        .transpose()
        .map_err(crate::realtime::StoreError::from)?
        .unwrap_or_default();
    Ok(ok(record))
}

/// Current completeness verdict, nothing persisted
pub async fn completeness(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> AppResult<Json<AppResponse<Verdict>>> {
    let verdict = state.toggle.completeness(&store_id)?;
    Ok(ok(verdict))
}

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ToggleResponse {
    Toggled { online: bool },
    Blocked { missing: Vec<&'static str> },
}

/// Flip the online switch, gated by a fresh completeness evaluation
pub async fn toggle(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> AppResult<Json<AppResponse<ToggleResponse>>> {
    let response = match state.toggle.toggle(&store_id)? {
        ToggleOutcome::Toggled { online } => {
            state.notifier.success(if online {
                "Loja aberta"
            } else {
                "Loja fechada"
            });
            ToggleResponse::Toggled { online }
        }
        ToggleOutcome::Blocked { missing } => {
            let labels: Vec<&'static str> = missing.iter().map(shared::Section::label).collect();
            state.notifier.warning(format!(
                "Complete o cadastro para abrir a loja: {}",
                labels.join(", ")
            ));
            ToggleResponse::Blocked { missing: labels }
        }
    };
    Ok(ok(response))
}

/// Force the store offline
pub async fn set_offline(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> AppResult<Json<AppResponse<()>>> {
    state.toggle.set_offline(&store_id)?;
    state.notifier.info("Loja fechada");
    Ok(ok(()))
}
