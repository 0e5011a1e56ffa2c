//! Unified error handling
//!
//! Application-level error enum and the JSON response envelope used by
//! every API handler.
//!
//! # Error code ranges
//!
//! | Prefix | Category | Example |
//! |--------|----------|---------|
//! | E0xxx  | General  | E0003 not found |
//! | E2xxx  | Permission | E2001 operator not approved |
//! | E4xxx  | Order    | E4001 nothing to advance |
//! | E9xxx  | System   | E9002 store backend failure |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::realtime::StoreError;
use crate::rpc::RpcError;

/// API response envelope
///
/// ```json
/// {
///   "code": "E0000",
///   "message": "Success",
///   "data": { ... }
/// }
/// ```
pub type AppResponse<T> = shared::ApiResponse<T>;

/// Application error enum
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Permission (4xx) ==========
    #[error("Permission denied: {0}")]
    Forbidden(String),

    // ========== Business logic (4xx) ==========
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    // ========== Collaborators (5xx) ==========
    #[error("Realtime store error: {0}")]
    Store(#[from] StoreError),

    #[error("Remote procedure failed: {0}")]
    Rpc(#[from] RpcError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Stable error code for the envelope
    pub fn code(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "E2001",
            Self::NotFound(_) => "E0003",
            Self::Validation(_) => "E0002",
            Self::BusinessRule(_) => "E0005",
            Self::Rpc(RpcError::NothingToAdvance { .. }) => "E4001",
            Self::Rpc(RpcError::OrderNotFound(_)) => "E4002",
            Self::Rpc(_) => "E9003",
            Self::Store(_) => "E9002",
            Self::Internal(_) => "E9001",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) | Self::Rpc(RpcError::OrderNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::BusinessRule(_) | Self::Rpc(RpcError::NothingToAdvance { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Store(_) | Self::Rpc(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), "{}", self);
        }
        let body: AppResponse<()> = AppResponse::error(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}

/// Result alias for handlers and services
pub type AppResult<T> = Result<T, AppError>;

/// Helper to build a success envelope
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse::ok(data))
}
