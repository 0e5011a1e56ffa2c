//! redb-backed realtime store
//!
//! Durable implementation for single-node deployments. The JSON tree is
//! persisted as one document per depth-two node (`tenants/{id}`,
//! `orders/{id}`, `orders_by_store/{id}`, ...), which keeps writes
//! scoped to the entity being mutated while reads at collection or root
//! level assemble the tree from a prefix scan.
//!
//! # Tables
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `documents` | document path | JSON-serialized node |

use super::{
    Listener, ListenerRegistry, RealtimeStore, StoreError, StoreEvent, StoreResult,
    Subscription, ensure_node, json_merge_patch, normalize_path, split_path, value_at,
};
use parking_lot::Mutex;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

const DOCUMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

pub struct RedbStore {
    db: Arc<Database>,
    registry: Arc<ListenerRegistry>,
    /// Serializes writers so the old/new snapshots handed to the
    /// listener registry are consistent.
    write_lock: Mutex<()>,
}

impl RedbStore {
    /// Open or create the database at `path`
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        // Make sure the table exists so first reads do not fail
        let txn = db.begin_write()?;
        txn.open_table(DOCUMENTS_TABLE)?;
        txn.commit()?;
        Ok(Self {
            db: Arc::new(db),
            registry: Arc::new(ListenerRegistry::default()),
            write_lock: Mutex::new(()),
        })
    }

    fn read_document(&self, doc_key: &str) -> StoreResult<Option<Value>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DOCUMENTS_TABLE)?;
        match table.get(doc_key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn store_document(&self, doc_key: &str, value: Option<&Value>) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(DOCUMENTS_TABLE)?;
            match value {
                Some(v) => {
                    let bytes = serde_json::to_vec(v)?;
                    table.insert(doc_key, bytes.as_slice())?;
                }
                None => {
                    table.remove(doc_key)?;
                }
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// All documents whose key starts with `prefix/`, as (suffix, doc)
    fn scan_collection(&self, prefix: &str) -> StoreResult<Vec<(String, Value)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DOCUMENTS_TABLE)?;
        let wanted = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}/")
        };
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (key, bytes) = entry?;
            let key = key.value().to_string();
            if let Some(suffix) = key.strip_prefix(&wanted) {
                out.push((suffix.to_string(), serde_json::from_slice(bytes.value())?));
            }
        }
        Ok(out)
    }

    /// Merge `patch` into the document at `doc_key`/`rest` and notify
    fn write_document(&self, doc_key: &str, rest: &str, patch: Value) -> StoreResult<()> {
        let old = self.read_document(doc_key)?;
        let mut new = old.clone().unwrap_or(Value::Object(serde_json::Map::new()));
        let node = ensure_node(&mut new, rest);
        json_merge_patch(node, patch);
        self.store_document(doc_key, Some(&new))?;
        self.registry
            .notify_subtree(doc_key, old.as_ref(), Some(&new));
        Ok(())
    }
}

impl RealtimeStore for RedbStore {
    fn read(&self, path: &str) -> StoreResult<Option<Value>> {
        let path = normalize_path(path);
        let segments = split_path(&path);
        match segments.len() {
            // Whole tree: group documents under their collections
            0 => {
                let mut root = serde_json::Map::new();
                for (key, doc) in self.scan_collection("")? {
                    let mut parts = key.splitn(2, '/');
                    let (Some(coll), Some(id)) = (parts.next(), parts.next()) else {
                        continue;
                    };
                    root.entry(coll.to_string())
                        .or_insert_with(|| Value::Object(serde_json::Map::new()))
                        .as_object_mut()
                        .unwrap()
                        .insert(id.to_string(), doc);
                }
                Ok(Some(Value::Object(root)))
            }
            // Collection level: assemble from prefix scan
            1 => {
                let docs = self.scan_collection(segments[0])?;
                if docs.is_empty() {
                    return Ok(None);
                }
                let map: serde_json::Map<String, Value> = docs.into_iter().collect();
                Ok(Some(Value::Object(map)))
            }
            // Document level and below
            _ => {
                let doc_key = format!("{}/{}", segments[0], segments[1]);
                let rest = segments[2..].join("/");
                match self.read_document(&doc_key)? {
                    Some(doc) => Ok(value_at(&doc, &rest).cloned()),
                    None => Ok(None),
                }
            }
        }
    }

    fn write(&self, path: &str, patch: Value) -> StoreResult<()> {
        let path = normalize_path(path);
        let segments = split_path(&path);
        if segments.len() >= 2 {
            let _guard = self.write_lock.lock();
            let doc_key = format!("{}/{}", segments[0], segments[1]);
            let rest = segments[2..].join("/");
            return self.write_document(&doc_key, &rest, patch);
        }
        // Collection/root writes fan out into per-document writes
        let Value::Object(entries) = patch else {
            return Err(StoreError::InvalidPath(format!(
                "non-object write at '{path}'"
            )));
        };
        for (key, value) in entries {
            let child = if path.is_empty() {
                key
            } else {
                format!("{path}/{key}")
            };
            self.write(&child, value)?;
        }
        Ok(())
    }

    fn delete(&self, path: &str) -> StoreResult<()> {
        let path = normalize_path(path);
        let segments = split_path(&path);
        match segments.len() {
            0 => Err(StoreError::InvalidPath(path)),
            1 => {
                for (key, _) in self.scan_collection(segments[0])? {
                    // Only the document id, not nested path parts
                    if !key.contains('/') {
                        self.delete(&format!("{}/{key}", segments[0]))?;
                    }
                }
                Ok(())
            }
            2 => {
                let _guard = self.write_lock.lock();
                let doc_key = path.clone();
                let old = self.read_document(&doc_key)?;
                if old.is_some() {
                    self.store_document(&doc_key, None)?;
                    self.registry.notify_subtree(&doc_key, old.as_ref(), None);
                }
                Ok(())
            }
            _ => {
                let _guard = self.write_lock.lock();
                let doc_key = format!("{}/{}", segments[0], segments[1]);
                let rest_parent = segments[2..segments.len() - 1].join("/");
                let last = segments[segments.len() - 1];
                let old = self.read_document(&doc_key)?;
                let Some(old_doc) = old else { return Ok(()) };
                let mut new = old_doc.clone();
                if let Some(parent) = value_at(&new, &rest_parent).cloned() {
                    if parent.as_object().is_some_and(|m| m.contains_key(last)) {
                        let node = ensure_node(&mut new, &rest_parent);
                        node.as_object_mut().unwrap().remove(last);
                        self.store_document(&doc_key, Some(&new))?;
                        self.registry
                            .notify_subtree(&doc_key, Some(&old_doc), Some(&new));
                    }
                }
                Ok(())
            }
        }
    }

    fn subscribe(&self, path: &str, listener: Listener) -> StoreResult<Subscription> {
        let path = normalize_path(path);
        let subscription = self.registry.register(&path, listener.clone());
        let current = self.read(&path)?;
        listener(&StoreEvent::Value(current));
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    fn open_temp() -> (RedbStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("realtime.redb")).unwrap();
        (store, dir)
    }

    #[test]
    fn test_document_round_trip() {
        let (store, _dir) = open_temp();
        store
            .write("tenants/s1/profile", json!({"name": "Dona Rosa"}))
            .unwrap();
        assert_eq!(
            store.read("tenants/s1/profile/name").unwrap(),
            Some(json!("Dona Rosa"))
        );
        assert_eq!(
            store.read("tenants/s1").unwrap(),
            Some(json!({"profile": {"name": "Dona Rosa"}}))
        );
    }

    #[test]
    fn test_collection_scan() {
        let (store, _dir) = open_temp();
        store.write("orders/o1", json!({"total": 10})).unwrap();
        store.write("orders/o2", json!({"total": 20})).unwrap();
        let all = store.read("orders").unwrap().unwrap();
        assert_eq!(all["o1"]["total"], 10);
        assert_eq!(all["o2"]["total"], 20);
    }

    #[test]
    fn test_subscribe_and_change() {
        let (store, _dir) = open_temp();
        let events: Arc<StdMutex<Vec<StoreEvent>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = events.clone();
        let listener: Listener = Arc::new(move |e| sink.lock().unwrap().push(e.clone()));
        let _sub = store.subscribe("orders/o1", listener).unwrap();

        store.write("orders/o1", json!({"status": "pedido pronto"})).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events[0], StoreEvent::Value(None));
        assert!(events
            .iter()
            .any(|e| matches!(e, StoreEvent::Value(Some(v)) if v["status"] == "pedido pronto")));
    }

    #[test]
    fn test_delete_document() {
        let (store, _dir) = open_temp();
        store.write("orders/o1", json!({"total": 10})).unwrap();
        store.delete("orders/o1").unwrap();
        assert_eq!(store.read("orders/o1").unwrap(), None);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("realtime.redb");
        {
            let store = RedbStore::open(&db_path).unwrap();
            store
                .write("tenants/s1/status", json!({"online": true}))
                .unwrap();
        }
        let store = RedbStore::open(&db_path).unwrap();
        assert_eq!(
            store.read("tenants/s1/status/online").unwrap(),
            Some(json!(true))
        );
    }
}
