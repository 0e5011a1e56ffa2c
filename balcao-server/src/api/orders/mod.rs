//! Order API module
//!
//! Listing reads the live aggregation; mutations go through the guarded
//! actions and return the confirmed state, never an optimistic one.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/store/{store_id}", get(handler::list))
        .route("/{id}/advance", post(handler::advance))
        .route("/{id}/cancel", post(handler::cancel))
}
