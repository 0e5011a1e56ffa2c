//! Store completeness and online switch

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/store", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/{store_id}/status", get(handler::status))
        .route("/{store_id}/completeness", get(handler::completeness))
        .route("/{store_id}/toggle", post(handler::toggle))
        .route("/{store_id}/offline", post(handler::set_offline))
}
