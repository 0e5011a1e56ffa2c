//! Realtime keyed store
//!
//! The engine's view of the shared, multi-writer realtime database:
//! a JSON tree addressed by slash-delimited paths such as
//! `tenants/{storeId}/...`, `orders/{orderId}` and
//! `orders_by_store/{storeId}`.
//!
//! # Contract
//!
//! - `read(path)` — one-shot value lookup.
//! - `write(path, patch)` — JSON merge-patch update (objects merge
//!   recursively, `null` removes a key, scalars replace).
//! - `subscribe(path, listener)` — continuous push. A [`StoreEvent::Value`]
//!   with the current value is delivered synchronously at registration,
//!   then on every change of the node; child-level
//!   `Added`/`Changed`/`Removed` events are delivered for collection
//!   nodes. Dropping the returned [`Subscription`] detaches the
//!   listener — leaking a listener past teardown is a defect.
//!
//! The store never assumes single-writer semantics: listeners always
//! rebuild state from the pushed snapshot, never from locally cached
//! optimistic state.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Permission denied at {0}")]
    PermissionDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Push event delivered to a subscribed listener
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Current value of the subscribed node. Delivered once at
    /// registration and again whenever the node changes.
    Value(Option<Value>),
    /// A child appeared under the subscribed node
    ChildAdded { key: String, value: Value },
    /// An existing child changed
    ChildChanged { key: String, value: Value },
    /// A child was removed
    ChildRemoved { key: String },
}

/// Listener callback. Must be cheap and non-blocking; events are
/// delivered on the writer's call stack.
pub type Listener = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

/// Realtime keyed store abstraction
pub trait RealtimeStore: Send + Sync {
    /// One-shot read of the node at `path`
    fn read(&self, path: &str) -> StoreResult<Option<Value>>;

    /// Merge-update the node at `path` (JSON merge-patch semantics)
    fn write(&self, path: &str, patch: Value) -> StoreResult<()>;

    /// Remove the node at `path`
    fn delete(&self, path: &str) -> StoreResult<()>;

    /// Continuous subscription; the listener stays attached until the
    /// returned [`Subscription`] is dropped
    fn subscribe(&self, path: &str, listener: Listener) -> StoreResult<Subscription>;
}

/// RAII listener handle. Dropping it detaches the listener.
#[must_use = "dropping the subscription detaches the listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.listeners.remove(&self.id);
        }
    }
}

/// Shared listener registry used by every store implementation
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: dashmap::DashMap<u64, (String, Listener)>,
}

impl ListenerRegistry {
    pub(crate) fn register(self: &Arc<Self>, path: &str, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .insert(id, (normalize_path(path), listener));
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    /// Count of currently attached listeners (tests)
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Fan out the change of a subtree rooted at `base` to every
    /// affected listener.
    ///
    /// For a listener at or below `base` the old/new values at its own
    /// path are compared and a `Value` event plus child diffs are
    /// emitted. For a listener that is the immediate parent of `base`,
    /// the change surfaces as a single child event.
    pub(crate) fn notify_subtree(&self, base: &str, old: Option<&Value>, new: Option<&Value>) {
        let base = normalize_path(base);
        // Snapshot to avoid holding dashmap shards while running callbacks
        let snapshot: Vec<(String, Listener)> = self
            .listeners
            .iter()
            .map(|e| (e.value().0.clone(), e.value().1.clone()))
            .collect();

        for (path, listener) in snapshot {
            if let Some(rel) = descend_path(&path, &base) {
                // Listener at or below the changed subtree
                let old_at = value_at_opt(old, rel);
                let new_at = value_at_opt(new, rel);
                if old_at == new_at {
                    continue;
                }
                listener(&StoreEvent::Value(new_at.cloned()));
                emit_child_diff(&listener, old_at, new_at);
            } else if let Some(rel) = descend_path(&base, &path) {
                // Listener above the changed subtree: only the
                // immediate parent sees it, as a child event
                if rel.contains('/') {
                    continue;
                }
                match (old, new) {
                    (None, Some(n)) => listener(&StoreEvent::ChildAdded {
                        key: rel.to_string(),
                        value: n.clone(),
                    }),
                    (Some(o), Some(n)) if o != n => listener(&StoreEvent::ChildChanged {
                        key: rel.to_string(),
                        value: n.clone(),
                    }),
                    (Some(_), None) => listener(&StoreEvent::ChildRemoved {
                        key: rel.to_string(),
                    }),
                    _ => {}
                }
            }
        }
    }
}

/// Emit `ChildAdded`/`ChildChanged`/`ChildRemoved` for the key-level
/// difference between two object snapshots of the same node.
fn emit_child_diff(listener: &Listener, old: Option<&Value>, new: Option<&Value>) {
    let empty = serde_json::Map::new();
    let old_map = old.and_then(Value::as_object).unwrap_or(&empty);
    let new_map = new.and_then(Value::as_object).unwrap_or(&empty);

    let mut keys: Vec<&String> = new_map.keys().chain(old_map.keys()).collect();
    keys.sort();
    keys.dedup();

    for key in keys {
        match (old_map.get(key), new_map.get(key)) {
            (None, Some(v)) => listener(&StoreEvent::ChildAdded {
                key: key.clone(),
                value: v.clone(),
            }),
            (Some(o), Some(n)) if o != n => listener(&StoreEvent::ChildChanged {
                key: key.clone(),
                value: n.clone(),
            }),
            (Some(_), None) => listener(&StoreEvent::ChildRemoved { key: key.clone() }),
            _ => {}
        }
    }
}

/// Strip empty segments; `"a//b/"` becomes `"a/b"`
pub(crate) fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

pub(crate) fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// If `path` is at or below `base`, the relative remainder ("" when
/// equal); otherwise `None`.
fn descend_path<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    if base.is_empty() {
        return Some(path);
    }
    if path == base {
        return Some("");
    }
    path.strip_prefix(base)?.strip_prefix('/')
}

/// Navigate `root` down the relative path
pub(crate) fn value_at<'a>(root: &'a Value, rel: &str) -> Option<&'a Value> {
    let mut node = root;
    for seg in split_path(rel) {
        node = node.as_object()?.get(seg)?;
    }
    Some(node)
}

fn value_at_opt<'a>(root: Option<&'a Value>, rel: &str) -> Option<&'a Value> {
    value_at(root?, rel)
}

/// JSON merge-patch (RFC 7386): objects merge recursively, `null`
/// removes a key, anything else replaces.
pub(crate) fn json_merge_patch(target: &mut Value, patch: Value) {
    match patch {
        Value::Object(patch_map) => {
            if !target.is_object() {
                *target = Value::Object(serde_json::Map::new());
            }
            let map = target.as_object_mut().unwrap();
            for (key, patch_value) in patch_map {
                if patch_value.is_null() {
                    map.remove(&key);
                } else {
                    json_merge_patch(
                        map.entry(key).or_insert(Value::Null),
                        patch_value,
                    );
                }
            }
        }
        other => *target = other,
    }
}

/// Ensure the parent chain down to `path` exists in `root` and return a
/// mutable reference to the node.
pub(crate) fn ensure_node<'a>(root: &'a mut Value, path: &str) -> &'a mut Value {
    let mut node = root;
    for seg in split_path(path) {
        if !node.is_object() {
            *node = Value::Object(serde_json::Map::new());
        }
        node = node
            .as_object_mut()
            .unwrap()
            .entry(seg.to_string())
            .or_insert(Value::Null);
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_patch_merges_objects() {
        let mut target = json!({"a": 1, "b": {"c": 2}});
        json_merge_patch(&mut target, json!({"b": {"d": 3}, "e": 4}));
        assert_eq!(target, json!({"a": 1, "b": {"c": 2, "d": 3}, "e": 4}));
    }

    #[test]
    fn test_merge_patch_null_removes() {
        let mut target = json!({"a": 1, "b": 2});
        json_merge_patch(&mut target, json!({"a": null}));
        assert_eq!(target, json!({"b": 2}));
    }

    #[test]
    fn test_merge_patch_scalar_replaces() {
        let mut target = json!({"a": {"deep": true}});
        json_merge_patch(&mut target, json!({"a": 7}));
        assert_eq!(target, json!({"a": 7}));
    }

    #[test]
    fn test_value_at() {
        let root = json!({"tenants": {"s1": {"profile": {"name": "Zé"}}}});
        assert_eq!(
            value_at(&root, "tenants/s1/profile/name"),
            Some(&json!("Zé"))
        );
        assert_eq!(value_at(&root, "tenants/s2"), None);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/a//b/"), "a/b");
        assert_eq!(normalize_path(""), "");
    }
}
