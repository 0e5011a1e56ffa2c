//! In-memory realtime store
//!
//! Backs tests and development runs. Holds the whole JSON tree behind a
//! `parking_lot::RwLock` and fans events out through the shared
//! listener registry. Callbacks run outside the lock so a listener may
//! read the store re-entrantly.

use super::{
    Listener, ListenerRegistry, RealtimeStore, StoreError, StoreEvent, StoreResult,
    Subscription, ensure_node, json_merge_patch, normalize_path, split_path, value_at,
};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

pub struct MemoryStore {
    root: RwLock<Value>,
    registry: Arc<ListenerRegistry>,
    /// Path prefixes for which subscriptions are rejected. Simulates
    /// the backend's security rules in tests (the resolver must swallow
    /// these and fail closed).
    denied_prefixes: RwLock<Vec<String>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Value::Object(serde_json::Map::new())),
            registry: Arc::new(ListenerRegistry::default()),
            denied_prefixes: RwLock::new(Vec::new()),
        }
    }

    /// Reject subscriptions under the given path prefix
    pub fn deny_subscriptions_under(&self, prefix: &str) {
        self.denied_prefixes.write().push(normalize_path(prefix));
    }

    /// Attached listener count (tests assert teardown detaches all)
    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }
}

impl RealtimeStore for MemoryStore {
    fn read(&self, path: &str) -> StoreResult<Option<Value>> {
        let root = self.root.read();
        Ok(value_at(&root, path).cloned())
    }

    fn write(&self, path: &str, patch: Value) -> StoreResult<()> {
        let (old, new) = {
            let mut root = self.root.write();
            let old = root.clone();
            let node = ensure_node(&mut root, path);
            json_merge_patch(node, patch);
            (old, root.clone())
        };
        self.registry.notify_subtree("", Some(&old), Some(&new));
        Ok(())
    }

    fn delete(&self, path: &str) -> StoreResult<()> {
        let segments = split_path(path);
        let Some((last, parents)) = segments.split_last() else {
            return Err(StoreError::InvalidPath(path.to_string()));
        };
        let (old, new) = {
            let mut root = self.root.write();
            let old = root.clone();
            let parent = ensure_node(&mut root, &parents.join("/"));
            if let Some(map) = parent.as_object_mut() {
                map.remove(*last);
            }
            (old, root.clone())
        };
        self.registry.notify_subtree("", Some(&old), Some(&new));
        Ok(())
    }

    fn subscribe(&self, path: &str, listener: Listener) -> StoreResult<Subscription> {
        let path = normalize_path(path);
        if self
            .denied_prefixes
            .read()
            .iter()
            .any(|p| path == *p || path.starts_with(&format!("{p}/")))
        {
            return Err(StoreError::PermissionDenied(path));
        }
        let subscription = self.registry.register(&path, listener.clone());
        // onValue semantics: deliver the current snapshot immediately
        let current = self.read(&path)?;
        listener(&StoreEvent::Value(current));
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn collect() -> (Listener, Arc<Mutex<Vec<StoreEvent>>>) {
        let events: Arc<Mutex<Vec<StoreEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let listener: Listener = Arc::new(move |e| sink.lock().unwrap().push(e.clone()));
        (listener, events)
    }

    #[test]
    fn test_read_write_merge() {
        let store = MemoryStore::new();
        store.write("tenants/s1/profile", json!({"name": "Zé"})).unwrap();
        store.write("tenants/s1/profile", json!({"phone": "11 99999"})).unwrap();
        assert_eq!(
            store.read("tenants/s1/profile").unwrap(),
            Some(json!({"name": "Zé", "phone": "11 99999"}))
        );
    }

    #[test]
    fn test_initial_value_on_subscribe() {
        let store = MemoryStore::new();
        store.write("orders/o1", json!({"status": "pedido realizado"})).unwrap();
        let (listener, events) = collect();
        let _sub = store.subscribe("orders/o1", listener).unwrap();
        let events = events.lock().unwrap();
        assert_eq!(
            events[0],
            StoreEvent::Value(Some(json!({"status": "pedido realizado"})))
        );
    }

    #[test]
    fn test_child_events_on_collection() {
        let store = MemoryStore::new();
        let (listener, events) = collect();
        let _sub = store.subscribe("orders_by_store/s1", listener).unwrap();
        store.write("orders_by_store/s1/o1", json!({"total": 10})).unwrap();
        store.write("orders_by_store/s1/o1", json!({"total": 12})).unwrap();
        store.delete("orders_by_store/s1/o1").unwrap();

        let events = events.lock().unwrap();
        assert!(events.contains(&StoreEvent::ChildAdded {
            key: "o1".into(),
            value: json!({"total": 10}),
        }));
        assert!(events.contains(&StoreEvent::ChildChanged {
            key: "o1".into(),
            value: json!({"total": 12}),
        }));
        assert!(events.contains(&StoreEvent::ChildRemoved { key: "o1".into() }));
    }

    #[test]
    fn test_unrelated_write_is_silent() {
        let store = MemoryStore::new();
        let (listener, events) = collect();
        let _sub = store.subscribe("orders/o1", listener).unwrap();
        events.lock().unwrap().clear();
        store.write("orders/o2", json!({"total": 1})).unwrap();
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_detaches_listener() {
        let store = MemoryStore::new();
        let (listener, _) = collect();
        let sub = store.subscribe("orders/o1", listener).unwrap();
        assert_eq!(store.listener_count(), 1);
        drop(sub);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_denied_prefix() {
        let store = MemoryStore::new();
        store.deny_subscriptions_under("operators");
        let (listener, _) = collect();
        let err = store.subscribe("operators/u1", listener).unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied(_)));
    }
}
