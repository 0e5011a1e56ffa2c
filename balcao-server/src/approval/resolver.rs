//! Approval resolver
//!
//! Subscribes per identity:
//!
//! - Source A, direct operator index: `operators/{userId}` carrying
//!   `{storeId, approved, owner}`. `owner == true` is an automatic
//!   approval override.
//! - Source B, tenant-embedded record: the per-user index
//!   `users/{userId}` claims a store id, and the operator record under
//!   `tenants/{storeId}/operators/{userId}` yields the second vote.
//!
//! Every source update recomputes the merged verdict and publishes
//! immediately; consumers must tolerate several rapid successive
//! publishes during initial subscription. Permission-denied errors are
//! swallowed and the resolver fails closed. If no store id surfaced
//! after a short delay, a one-time broad scan of all tenants' operator
//! sub-records covers migrated data with stale fast-path indices.

use crate::realtime::{RealtimeStore, StoreEvent, Subscription};
use parking_lot::Mutex;
use serde_json::Value;
use shared::approval::{ApprovalState, Vote, merge_votes, resolve_store_id};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

/// Delay before the fallback tenant scan kicks in
const FALLBACK_DELAY: Duration = Duration::from_millis(300);

/// Latest vote from each source plus progress flags
#[derive(Default)]
struct SourceVotes {
    direct: Vote,
    tenant: Vote,
    direct_store: Option<String>,
    user_store: Option<String>,
    fallback_store: Option<String>,
    direct_seen: bool,
    user_seen: bool,
    fallback_done: bool,
}

impl SourceVotes {
    fn state(&self) -> ApprovalState {
        let store_id = resolve_store_id(
            self.direct_store.as_deref(),
            self.user_store.as_deref(),
            self.fallback_store.as_deref(),
        );
        let settled =
            self.direct_seen && self.user_seen && (store_id.is_some() || self.fallback_done);
        ApprovalState {
            loading: !settled,
            approved: merge_votes(self.direct, self.tenant),
            store_id,
        }
    }

    fn known_store(&self) -> bool {
        self.direct_store.is_some() || self.user_store.is_some()
    }
}

struct ResolverInner {
    store: Arc<dyn RealtimeStore>,
    user_id: String,
    votes: Mutex<SourceVotes>,
    tx: watch::Sender<ApprovalState>,
    /// Tenant-record subscription, re-created whenever the claimed
    /// store id changes. Dropping the old one detaches its listener.
    tenant_sub: Mutex<Option<Subscription>>,
}

impl ResolverInner {
    fn publish(&self) {
        let state = self.votes.lock().state();
        self.tx.send_replace(state);
    }

    /// Re-point source B at the operator record embedded under the
    /// claimed tenant (or detach it when no store is claimed)
    fn retarget_tenant(self: &Arc<Self>, claimed: Option<String>) {
        let changed = {
            let mut votes = self.votes.lock();
            if votes.user_store == claimed {
                false
            } else {
                votes.user_store = claimed.clone();
                votes.tenant = Vote::Unknown;
                true
            }
        };
        if !changed {
            return;
        }

        let Some(store_id) = claimed else {
            *self.tenant_sub.lock() = None;
            return;
        };

        let path = format!("tenants/{store_id}/operators/{}", self.user_id);
        let weak: Weak<ResolverInner> = Arc::downgrade(self);
        let result = self.store.subscribe(
            &path,
            Arc::new(move |event| {
                let Some(inner) = weak.upgrade() else { return };
                if let StoreEvent::Value(value) = event {
                    inner.votes.lock().tenant = vote_from_record(value.as_ref());
                    inner.publish();
                }
            }),
        );
        match result {
            Ok(sub) => *self.tenant_sub.lock() = Some(sub),
            Err(e) => {
                // Fail closed, never surface subscription errors
                debug!(path, error = %e, "tenant record subscription denied");
                *self.tenant_sub.lock() = None;
            }
        }
    }
}

/// Active resolution for one identity. Dropping it synchronously
/// detaches every listener, including the lazily-created tenant one,
/// and cancels a pending fallback scan.
pub struct ApprovalHandle {
    rx: watch::Receiver<ApprovalState>,
    _subs: Vec<Subscription>,
    _inner: Arc<ResolverInner>,
    _fallback_guard: DropGuard,
}

impl ApprovalHandle {
    /// Continuously-updated verdict channel
    pub fn watch(&self) -> watch::Receiver<ApprovalState> {
        self.rx.clone()
    }

    /// Latest published verdict
    pub fn state(&self) -> ApprovalState {
        self.rx.borrow().clone()
    }
}

/// Factory for per-identity approval resolutions
pub struct ApprovalResolver {
    store: Arc<dyn RealtimeStore>,
    fallback_delay: Duration,
}

impl ApprovalResolver {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self {
            store,
            fallback_delay: FALLBACK_DELAY,
        }
    }

    /// Override the fallback delay (tests)
    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    /// Start resolving for `user_id`. All cached votes start unknown.
    pub fn subscribe(&self, user_id: &str) -> ApprovalHandle {
        let (tx, rx) = watch::channel(ApprovalState::loading());
        let inner = Arc::new(ResolverInner {
            store: self.store.clone(),
            user_id: user_id.to_string(),
            votes: Mutex::new(SourceVotes::default()),
            tx,
            tenant_sub: Mutex::new(None),
        });

        let mut subs = Vec::new();

        // Source A: direct operator index
        let weak = Arc::downgrade(&inner);
        match self.store.subscribe(
            &format!("operators/{user_id}"),
            Arc::new(move |event| {
                let Some(inner) = weak.upgrade() else { return };
                if let StoreEvent::Value(value) = event {
                    {
                        let mut votes = inner.votes.lock();
                        votes.direct = vote_from_record(value.as_ref());
                        votes.direct_store = value
                            .as_ref()
                            .and_then(|v| v["storeId"].as_str())
                            .map(str::to_string);
                        votes.direct_seen = true;
                    }
                    inner.publish();
                }
            }),
        ) {
            Ok(sub) => subs.push(sub),
            Err(e) => {
                debug!(user_id, error = %e, "direct index subscription denied");
                inner.votes.lock().direct_seen = true;
            }
        }

        // Source B: per-user index pointing at the tenant record
        let weak = Arc::downgrade(&inner);
        match self.store.subscribe(
            &format!("users/{user_id}"),
            Arc::new(move |event| {
                let Some(inner) = weak.upgrade() else { return };
                if let StoreEvent::Value(value) = event {
                    inner.votes.lock().user_seen = true;
                    let claimed = value
                        .as_ref()
                        .and_then(|v| v["storeId"].as_str())
                        .map(str::to_string);
                    inner.retarget_tenant(claimed);
                    inner.publish();
                }
            }),
        ) {
            Ok(sub) => subs.push(sub),
            Err(e) => {
                debug!(user_id, error = %e, "user index subscription denied");
                inner.votes.lock().user_seen = true;
            }
        }

        inner.publish();

        // One-shot fallback scan, cancelled if the handle is dropped
        let token = CancellationToken::new();
        let task_token = token.clone();
        let weak = Arc::downgrade(&inner);
        let delay = self.fallback_delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            let Some(inner) = weak.upgrade() else { return };
            run_fallback_scan(&inner);
        });

        ApprovalHandle {
            rx,
            _subs: subs,
            _inner: inner,
            _fallback_guard: token.drop_guard(),
        }
    }
}

/// Vote carried by an operator record. `owner == true` overrides.
fn vote_from_record(record: Option<&Value>) -> Vote {
    let Some(record) = record else {
        return Vote::Unknown;
    };
    if record["owner"].as_bool() == Some(true) {
        return Vote::Approved;
    }
    Vote::from_flag(record["approved"].as_bool())
}

/// O(tenants) scan of `tenants/*/operators/{userId}`, adopting the
/// first match. Skipped entirely if a store id is already known.
fn run_fallback_scan(inner: &Arc<ResolverInner>) {
    {
        let mut votes = inner.votes.lock();
        if votes.known_store() || votes.fallback_done {
            votes.fallback_done = true;
            drop(votes);
            inner.publish();
            return;
        }
    }

    let tenants = match inner.store.read("tenants") {
        Ok(Some(Value::Object(map))) => map,
        Ok(_) => Default::default(),
        Err(e) => {
            warn!(error = %e, "fallback tenant scan failed");
            Default::default()
        }
    };

    let mut adopted: Option<(String, Vote)> = None;
    for (store_id, tenant) in tenants {
        let record = &tenant["operators"][inner.user_id.as_str()];
        if !record.is_null() {
            adopted = Some((store_id, vote_from_record(Some(record))));
            break;
        }
    }

    {
        let mut votes = inner.votes.lock();
        if let Some((store_id, vote)) = adopted {
            debug!(user_id = %inner.user_id, store_id, "fallback scan adopted operator record");
            votes.fallback_store = Some(store_id);
            votes.tenant = vote;
        }
        votes.fallback_done = true;
    }
    inner.publish();
}
