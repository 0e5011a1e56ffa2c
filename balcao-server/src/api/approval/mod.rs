//! Operator approval routes

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/approval", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(handler::status))
        .route("/{operator_id}/approve", post(handler::approve))
        .route("/{operator_id}/suspend", post(handler::suspend))
}
