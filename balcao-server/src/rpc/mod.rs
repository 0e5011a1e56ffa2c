//! Remote procedures — atomic, server-validated mutations
//!
//! The dashboard never mutates orders or operator gates by writing the
//! realtime tree directly; every transition goes through one of these
//! procedures so validation happens in exactly one place. A failed call
//! is surfaced to the caller as an error and the caller must keep
//! displaying the last confirmed state — optimistic local mutation is
//! forbidden.

mod local;

pub use local::LocalProcedures;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::OrderStatus;

use crate::realtime::StoreError;

/// Remote procedure errors
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order {order_id} is already at '{status}', nothing to advance to")]
    NothingToAdvance {
        order_id: String,
        status: OrderStatus,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Remote call failed: {0}")]
    Remote(String),
}

pub type RpcResult<T> = Result<T, RpcError>;

/// Minimal client profile returned by the batched lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientProfile {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub name: String,
}

/// Callable remote procedures
#[async_trait]
pub trait Procedures: Send + Sync {
    /// Advance an order one position along the status pipeline
    async fn advance_order(&self, order_id: &str) -> RpcResult<OrderStatus>;

    /// Cancel an order unconditionally (any current status)
    async fn cancel_order(&self, order_id: &str, reason: Option<String>) -> RpcResult<()>;

    /// Approve an operator for a store
    async fn approve_operator(&self, operator_id: &str, store_id: &str) -> RpcResult<()>;

    /// Suspend an operator (explicit deny, wins over any approve)
    async fn suspend_operator(&self, operator_id: &str, store_id: &str) -> RpcResult<()>;

    /// Batched display-name lookup. Best effort: callers must fall back
    /// to the name embedded in the order when this fails.
    async fn get_client_profiles(
        &self,
        store_id: &str,
        user_ids: &[String],
    ) -> RpcResult<Vec<ClientProfile>>;

    /// Bounded bulk listing of a store's orders, enriched projections
    /// in raw wire shape (normalization happens at ingestion)
    async fn list_store_orders_enriched(
        &self,
        store_id: &str,
        limit: usize,
    ) -> RpcResult<Vec<(String, Value)>>;
}
