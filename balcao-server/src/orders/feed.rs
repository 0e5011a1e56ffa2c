//! Order aggregation / mirror reader
//!
//! Maintains a continuously-updated, sorted (descending `createdAt`)
//! list of a store's orders by merging three inputs:
//!
//! 1. an initial bulk fetch from the enriched listing procedure
//!    (bounded by the configured limit);
//! 2. a direct per-order subscription for every order in the working
//!    set, whose pushes shallow-merge the canonical record over the
//!    enriched projection (canonical fields win at hydration);
//! 3. ongoing add/change/remove patches from two mirror paths: the
//!    current `orders_by_store/{id}` mirror and the legacy
//!    `tenants/{id}/orders` mirror.
//!
//! Merge policy is last-write-wins per field in listener-invocation
//! order: shallow overwrite at the object level, no conflict detection.
//! The policy is idempotent — a change or remove for an unknown id is a
//! silent no-op, a duplicate add is treated as a change — and the full
//! list is re-sorted after every mutation, never incrementally.
//!
//! Dropping the [`FeedHandle`] synchronously detaches every listener,
//! including the per-order ones spawned lazily on add events.

use crate::realtime::{RealtimeStore, StoreEvent, Subscription};
use crate::rpc::Procedures;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use shared::Order;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Default bulk-fetch bound
pub const DEFAULT_LIST_LIMIT: usize = 100;

pub struct OrderFeed {
    store: Arc<dyn RealtimeStore>,
    procedures: Arc<dyn Procedures>,
    limit: usize,
}

struct FeedInner {
    store: Arc<dyn RealtimeStore>,
    /// Working set: raw merged entry per order id
    entries: Mutex<HashMap<String, Map<String, Value>>>,
    /// Lazily-attached canonical subscriptions, one per order
    order_subs: Mutex<HashMap<String, Subscription>>,
    /// The two mirror subscriptions
    mirror_subs: Mutex<Vec<Subscription>>,
    tx: watch::Sender<Vec<Order>>,
}

/// Active aggregation for one store
pub struct FeedHandle {
    rx: watch::Receiver<Vec<Order>>,
    _inner: Arc<FeedInner>,
}

impl FeedHandle {
    /// Current sorted snapshot
    pub fn orders(&self) -> Vec<Order> {
        self.rx.borrow().clone()
    }

    /// Continuously-updated sorted list
    pub fn watch(&self) -> watch::Receiver<Vec<Order>> {
        self.rx.clone()
    }
}

impl OrderFeed {
    pub fn new(store: Arc<dyn RealtimeStore>, procedures: Arc<dyn Procedures>) -> Self {
        Self {
            store,
            procedures,
            limit: DEFAULT_LIST_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Start aggregating orders for `store_id`
    pub async fn subscribe(&self, store_id: &str) -> FeedHandle {
        let (tx, rx) = watch::channel(Vec::new());
        let inner = Arc::new(FeedInner {
            store: self.store.clone(),
            entries: Mutex::new(HashMap::new()),
            order_subs: Mutex::new(HashMap::new()),
            mirror_subs: Mutex::new(Vec::new()),
            tx,
        });

        // 1. Initial bulk fetch. A failure degrades to an empty list —
        // aggregate errors never surface to the consumer.
        match self
            .procedures
            .list_store_orders_enriched(store_id, self.limit)
            .await
        {
            Ok(listed) => {
                for (id, value) in listed {
                    inner.apply_add(&id, &value);
                }
            }
            Err(e) => warn!(store_id, error = %e, "enriched listing failed, starting empty"),
        }

        // 3. Ongoing mirror patches (current + legacy paths)
        for path in [
            format!("orders_by_store/{store_id}"),
            format!("tenants/{store_id}/orders"),
        ] {
            match self.store.subscribe(&path, mirror_listener(&inner)) {
                Ok(sub) => inner.mirror_subs.lock().push(sub),
                Err(e) => debug!(path, error = %e, "mirror subscription denied"),
            }
        }

        inner.publish();
        FeedHandle { rx, _inner: inner }
    }
}

/// Listener for a mirror collection path. The initial snapshot is
/// ingested once as a batch of adds; afterwards only child-level
/// patches are applied.
fn mirror_listener(inner: &Arc<FeedInner>) -> crate::realtime::Listener {
    let weak = Arc::downgrade(inner);
    let initial = AtomicBool::new(true);
    Arc::new(move |event| {
        let Some(inner) = weak.upgrade() else { return };
        match event {
            StoreEvent::Value(value) => {
                // The initial snapshot only seeds ids the bulk fetch
                // missed; entries already hydrated keep their canonical
                // fields
                if initial.swap(false, Ordering::Relaxed) {
                    if let Some(children) = value.as_ref().and_then(Value::as_object) {
                        for (key, child) in children {
                            if !inner.entries.lock().contains_key(key) {
                                inner.apply_add(key, child);
                            }
                        }
                    }
                }
            }
            StoreEvent::ChildAdded { key, value } => inner.apply_add(key, value),
            StoreEvent::ChildChanged { key, value } => inner.apply_change(key, value),
            StoreEvent::ChildRemoved { key } => inner.apply_remove(key),
        }
    })
}

fn as_map(value: &Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

/// Last-write-wins at the object level: plain shallow overwrite
fn shallow_merge(entry: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        entry.insert(key.clone(), value.clone());
    }
}

impl FeedInner {
    /// Rebuild, re-sort and publish the whole list. Always a full
    /// re-sort — never incremental — to preserve the sort invariant.
    fn publish(&self) {
        let mut orders: Vec<Order> = self
            .entries
            .lock()
            .iter()
            .map(|(id, raw)| super::normalize_order(id, &Value::Object(raw.clone())))
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        self.tx.send_replace(orders);
    }

    /// Insert (or merge, when the id is already present) and make sure
    /// the order is hydrated by its canonical subscription
    fn apply_add(self: &Arc<Self>, key: &str, value: &Value) {
        {
            let mut entries = self.entries.lock();
            match entries.get_mut(key) {
                // Duplicate add: treated as a change
                Some(entry) => shallow_merge(entry, &as_map(value)),
                None => {
                    entries.insert(key.to_string(), as_map(value));
                }
            }
        }
        // 2. Per-order hydration: the subscription's initial push
        // shallow-merges the canonical record over the projection
        self.attach_order_sub(key);
        self.publish();
    }

    /// Shallow-merge into an existing entry; unknown ids are ignored
    fn apply_change(&self, key: &str, value: &Value) {
        let known = {
            let mut entries = self.entries.lock();
            match entries.get_mut(key) {
                Some(entry) => {
                    shallow_merge(entry, &as_map(value));
                    true
                }
                None => false,
            }
        };
        if known {
            self.publish();
        } else {
            debug!(order_id = key, "change for unknown id ignored");
        }
    }

    /// Delete by id; unknown ids are ignored
    fn apply_remove(&self, key: &str) {
        let removed = self.entries.lock().remove(key).is_some();
        self.order_subs.lock().remove(key);
        if removed {
            self.publish();
        }
    }

    /// Attach the canonical `orders/{id}` subscription for an order in
    /// the working set, once
    fn attach_order_sub(self: &Arc<Self>, key: &str) {
        if self.order_subs.lock().contains_key(key) {
            return;
        }
        let weak: Weak<FeedInner> = Arc::downgrade(self);
        let id = key.to_string();
        let listener: crate::realtime::Listener = Arc::new(move |event| {
            let Some(inner) = weak.upgrade() else { return };
            if let StoreEvent::Value(Some(canonical)) = event {
                // Canonical fields take precedence over the projection
                inner.apply_change(&id, canonical);
            }
        });
        match self.store.subscribe(&format!("orders/{key}"), listener) {
            Ok(sub) => {
                self.order_subs.lock().insert(key.to_string(), sub);
            }
            Err(e) => debug!(order_id = key, error = %e, "canonical subscription denied"),
        }
    }
}
