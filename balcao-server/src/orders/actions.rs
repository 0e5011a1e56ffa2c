//! Order lifecycle actions
//!
//! Guarded entry points for the two mutations an operator can apply to
//! an order. `advance` checks the pipeline locally before calling the
//! remote procedure, so a no-op never leaves the process; the actual
//! state is only ever what the procedure confirms — no optimistic
//! local mutation.

use crate::realtime::RealtimeStore;
use crate::rpc::{Procedures, RpcError, RpcResult};
use shared::OrderStatus;
use std::sync::Arc;
use tracing::info;

pub struct OrderActions {
    store: Arc<dyn RealtimeStore>,
    procedures: Arc<dyn Procedures>,
}

impl OrderActions {
    pub fn new(store: Arc<dyn RealtimeStore>, procedures: Arc<dyn Procedures>) -> Self {
        Self { store, procedures }
    }

    /// Move an order one step along the pipeline. Terminal or
    /// already-delivered orders are reported as `NothingToAdvance`
    /// without touching the remote side.
    pub async fn advance(&self, order_id: &str) -> RpcResult<OrderStatus> {
        let record = self
            .store
            .read(&format!("orders/{order_id}"))?
            .ok_or_else(|| RpcError::OrderNotFound(order_id.to_string()))?;
        let current = record["status"]
            .as_str()
            .map(OrderStatus::from_wire)
            .unwrap_or_default();

        if current.next().is_none() {
            return Err(RpcError::NothingToAdvance {
                order_id: order_id.to_string(),
                status: current,
            });
        }

        self.procedures.advance_order(order_id).await
    }

    /// Cancel an order with an optional reason. Unconditional: the
    /// pipeline position is not checked, cancel is reachable from any
    /// status.
    pub async fn cancel(&self, order_id: &str, reason: Option<String>) -> RpcResult<()> {
        self.procedures.cancel_order(order_id, reason.clone()).await?;
        info!(order_id, reason = reason.as_deref(), "order cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::MemoryStore;
    use crate::rpc::LocalProcedures;
    use serde_json::json;

    fn setup() -> (Arc<MemoryStore>, OrderActions) {
        let store = Arc::new(MemoryStore::new());
        let procedures = Arc::new(LocalProcedures::new(store.clone() as Arc<dyn RealtimeStore>));
        let actions = OrderActions::new(store.clone(), procedures);
        (store, actions)
    }

    #[tokio::test]
    async fn test_advance_walks_the_whole_pipeline_then_noops() {
        let (store, actions) = setup();
        store
            .write("orders/o1", json!({"status": "pedido realizado", "storeId": "s1"}))
            .unwrap();

        let mut reached = Vec::new();
        for _ in 0..5 {
            reached.push(actions.advance("o1").await.unwrap());
        }
        assert_eq!(*reached.last().unwrap(), OrderStatus::Entregue);

        // Sixth attempt: delivered is terminal, nothing moves
        let err = actions.advance("o1").await.unwrap_err();
        assert!(matches!(
            err,
            RpcError::NothingToAdvance {
                status: OrderStatus::Entregue,
                ..
            }
        ));
        let status = store.read("orders/o1/status").unwrap();
        assert_eq!(status, Some(json!("pedido entregue")));
    }

    #[tokio::test]
    async fn test_advance_missing_order() {
        let (_store, actions) = setup();
        let err = actions.advance("ghost").await.unwrap_err();
        assert!(matches!(err, RpcError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_cancel_is_unconditional() {
        let (store, actions) = setup();
        store
            .write("orders/o1", json!({"status": "pedido entregue", "storeId": "s1"}))
            .unwrap();

        actions
            .cancel("o1", Some("cliente desistiu".to_string()))
            .await
            .unwrap();
        let record = store.read("orders/o1").unwrap().unwrap();
        assert_eq!(record["status"], "pedido cancelado");
        assert_eq!(record["cancelReason"], "cliente desistiu");
    }
}
