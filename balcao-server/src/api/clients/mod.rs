//! Client-grouped order listing

mod handler;

use axum::{Router, routing::get};

use crate::core::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/clients/store/{store_id}", get(handler::list))
}
