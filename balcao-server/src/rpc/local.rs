//! In-process implementation of the remote procedures
//!
//! Validates and applies mutations directly against the realtime store.
//! Status writes update the canonical order record and both mirrors in
//! the same call so the projections converge without a separate fan-out
//! worker.

use super::{ClientProfile, Procedures, RpcError, RpcResult};
use crate::realtime::RealtimeStore;
use async_trait::async_trait;
use serde_json::{Value, json};
use shared::OrderStatus;
use shared::util::now_millis;
use std::sync::Arc;
use tracing::{debug, info};

pub struct LocalProcedures {
    store: Arc<dyn RealtimeStore>,
}

impl LocalProcedures {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    /// Apply a status patch to the canonical record and both mirrors
    fn write_status(
        &self,
        order_id: &str,
        store_id: Option<&str>,
        patch: Value,
    ) -> RpcResult<()> {
        self.store.write(&format!("orders/{order_id}"), patch.clone())?;
        if let Some(sid) = store_id {
            self.store
                .write(&format!("orders_by_store/{sid}/{order_id}"), patch.clone())?;
            // Legacy per-tenant mirror, still read by older dashboards
            self.store
                .write(&format!("tenants/{sid}/orders/{order_id}"), patch)?;
        }
        Ok(())
    }

    fn load_order(&self, order_id: &str) -> RpcResult<Value> {
        self.store
            .read(&format!("orders/{order_id}"))?
            .ok_or_else(|| RpcError::OrderNotFound(order_id.to_string()))
    }
}

#[async_trait]
impl Procedures for LocalProcedures {
    async fn advance_order(&self, order_id: &str) -> RpcResult<OrderStatus> {
        let record = self.load_order(order_id)?;
        let current = OrderStatus::from_wire(record["status"].as_str().unwrap_or(""));
        let Some(next) = current.next() else {
            return Err(RpcError::NothingToAdvance {
                order_id: order_id.to_string(),
                status: current,
            });
        };
        let store_id = record["storeId"].as_str().map(str::to_string);
        self.write_status(
            order_id,
            store_id.as_deref(),
            json!({
                "status": next.as_wire(),
                "statusChangedAt": now_millis(),
            }),
        )?;
        info!(order_id, from = %current, to = %next, "order advanced");
        Ok(next)
    }

    async fn cancel_order(&self, order_id: &str, reason: Option<String>) -> RpcResult<()> {
        let record = self.load_order(order_id)?;
        let store_id = record["storeId"].as_str().map(str::to_string);
        let mut patch = json!({
            "status": OrderStatus::Cancelado.as_wire(),
            "statusChangedAt": now_millis(),
        });
        if let Some(reason) = reason {
            patch["cancelReason"] = Value::String(reason);
        }
        self.write_status(order_id, store_id.as_deref(), patch)?;
        info!(order_id, "order cancelled");
        Ok(())
    }

    async fn approve_operator(&self, operator_id: &str, store_id: &str) -> RpcResult<()> {
        self.store.write(
            &format!("operators/{operator_id}"),
            json!({"storeId": store_id, "approved": true}),
        )?;
        self.store
            .write(&format!("users/{operator_id}"), json!({"storeId": store_id}))?;
        self.store.write(
            &format!("tenants/{store_id}/operators/{operator_id}"),
            json!({"approved": true, "userId": operator_id}),
        )?;
        info!(operator_id, store_id, "operator approved");
        Ok(())
    }

    async fn suspend_operator(&self, operator_id: &str, store_id: &str) -> RpcResult<()> {
        self.store.write(
            &format!("operators/{operator_id}"),
            json!({"storeId": store_id, "approved": false}),
        )?;
        self.store.write(
            &format!("tenants/{store_id}/operators/{operator_id}"),
            json!({"approved": false, "userId": operator_id}),
        )?;
        info!(operator_id, store_id, "operator suspended");
        Ok(())
    }

    async fn get_client_profiles(
        &self,
        _store_id: &str,
        user_ids: &[String],
    ) -> RpcResult<Vec<ClientProfile>> {
        let mut profiles = Vec::new();
        for user_id in user_ids {
            if let Some(user) = self.store.read(&format!("users/{user_id}"))? {
                if let Some(name) = user["name"].as_str() {
                    profiles.push(ClientProfile {
                        user_id: user_id.clone(),
                        name: name.to_string(),
                    });
                }
            }
        }
        debug!(requested = user_ids.len(), found = profiles.len(), "profile lookup");
        Ok(profiles)
    }

    async fn list_store_orders_enriched(
        &self,
        store_id: &str,
        limit: usize,
    ) -> RpcResult<Vec<(String, Value)>> {
        let mirror = self
            .store
            .read(&format!("orders_by_store/{store_id}"))?
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();

        let mut entries: Vec<(String, Value)> = mirror.into_iter().collect();
        entries.sort_by_key(|(_, v)| std::cmp::Reverse(v["createdAt"].as_i64().unwrap_or(0)));
        entries.truncate(limit);

        // Enrich with the client display name where we have one
        for (_, entry) in entries.iter_mut() {
            let Some(user_id) = entry["userId"].as_str().map(str::to_string) else {
                continue;
            };
            if let Some(name) = self
                .store
                .read(&format!("users/{user_id}"))?
                .and_then(|u| u["name"].as_str().map(str::to_string))
            {
                entry["userName"] = Value::String(name);
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, LocalProcedures) {
        let store = Arc::new(MemoryStore::new());
        let procedures = LocalProcedures::new(store.clone());
        (store, procedures)
    }

    fn seed_order(store: &MemoryStore, id: &str, status: &str) {
        store
            .write(
                &format!("orders/{id}"),
                json!({
                    "status": status,
                    "storeId": "s1",
                    "userId": "u1",
                    "createdAt": 1000,
                }),
            )
            .unwrap();
        store
            .write(&format!("orders_by_store/s1/{id}"), json!({"status": status}))
            .unwrap();
    }

    #[tokio::test]
    async fn test_advance_moves_one_step_and_updates_mirrors() {
        let (store, procedures) = setup();
        seed_order(&store, "abc123", "pedido realizado");

        let next = procedures.advance_order("abc123").await.unwrap();
        assert_eq!(next, OrderStatus::Confirmado);

        let canonical = store.read("orders/abc123/status").unwrap();
        assert_eq!(canonical, Some(json!("pedido confirmado")));
        let mirror = store.read("orders_by_store/s1/abc123/status").unwrap();
        assert_eq!(mirror, Some(json!("pedido confirmado")));
        let legacy = store.read("tenants/s1/orders/abc123/status").unwrap();
        assert_eq!(legacy, Some(json!("pedido confirmado")));
    }

    #[tokio::test]
    async fn test_advance_at_end_of_pipeline_fails() {
        let (store, procedures) = setup();
        seed_order(&store, "abc123", "pedido entregue");

        let err = procedures.advance_order("abc123").await.unwrap_err();
        assert!(matches!(err, RpcError::NothingToAdvance { .. }));
        // No mutation was issued
        assert_eq!(
            store.read("orders/abc123/status").unwrap(),
            Some(json!("pedido entregue"))
        );
    }

    #[tokio::test]
    async fn test_cancel_is_unconditional() {
        let (store, procedures) = setup();
        seed_order(&store, "abc123", "pedido pronto");

        procedures
            .cancel_order("abc123", Some("cliente desistiu".into()))
            .await
            .unwrap();
        assert_eq!(
            store.read("orders/abc123/status").unwrap(),
            Some(json!("pedido cancelado"))
        );
        assert_eq!(
            store.read("orders/abc123/cancelReason").unwrap(),
            Some(json!("cliente desistiu"))
        );
    }

    #[tokio::test]
    async fn test_approve_and_suspend_write_both_indices() {
        let (store, procedures) = setup();
        procedures.approve_operator("u9", "s1").await.unwrap();
        assert_eq!(
            store.read("operators/u9/approved").unwrap(),
            Some(json!(true))
        );
        assert_eq!(
            store.read("tenants/s1/operators/u9/approved").unwrap(),
            Some(json!(true))
        );
        assert_eq!(store.read("users/u9/storeId").unwrap(), Some(json!("s1")));

        procedures.suspend_operator("u9", "s1").await.unwrap();
        assert_eq!(
            store.read("operators/u9/approved").unwrap(),
            Some(json!(false))
        );
        assert_eq!(
            store.read("tenants/s1/operators/u9/approved").unwrap(),
            Some(json!(false))
        );
    }

    #[tokio::test]
    async fn test_enriched_listing_is_sorted_and_bounded() {
        let (store, procedures) = setup();
        store.write("users/u1", json!({"name": "Maria"})).unwrap();
        for (id, created) in [("o1", 100), ("o2", 300), ("o3", 200)] {
            store
                .write(
                    &format!("orders_by_store/s1/{id}"),
                    json!({"createdAt": created, "userId": "u1"}),
                )
                .unwrap();
        }

        let listed = procedures.list_store_orders_enriched("s1", 2).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].0, "o2");
        assert_eq!(listed[1].0, "o3");
        assert_eq!(listed[0].1["userName"], "Maria");
    }
}
