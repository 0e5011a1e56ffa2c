//! Approval service — resolver lifecycle across identity changes
//!
//! Owns at most one active [`ApprovalHandle`] and swaps it whenever the
//! identity provider pushes a new identity. Dropping the previous
//! handle detaches every listener it registered before the next
//! subscription starts, so no update can reach a consumer of a stale
//! identity.

use super::{ApprovalHandle, ApprovalResolver};
use crate::identity::IdentityProvider;
use shared::approval::ApprovalState;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct ApprovalService {
    rx: watch::Receiver<ApprovalState>,
    shutdown: CancellationToken,
}

impl ApprovalService {
    /// Spawn the forwarding task and return the service
    pub fn spawn(resolver: ApprovalResolver, provider: Arc<dyn IdentityProvider>) -> Self {
        let (tx, rx) = watch::channel(signed_out());
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        tokio::spawn(async move {
            let mut identity_rx = provider.watch();
            let mut current: Option<ApprovalHandle> = None;
            let mut verdict_rx: Option<watch::Receiver<ApprovalState>> = None;

            // Resolve the identity present at startup
            swap_identity(&resolver, provider.current().map(|i| i.id), &tx, &mut current, &mut verdict_rx);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = identity_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let id = identity_rx.borrow_and_update().as_ref().map(|i| i.id.clone());
                        swap_identity(&resolver, id, &tx, &mut current, &mut verdict_rx);
                    }
                    Some(changed) = forward(&mut verdict_rx) => {
                        if changed.is_err() {
                            verdict_rx = None;
                            continue;
                        }
                        if let Some(rx) = &mut verdict_rx {
                            let state = rx.borrow_and_update().clone();
                            tx.send_replace(state);
                        }
                    }
                }
            }
            // Dropping the handle here detaches all remaining listeners
            drop(current);
        });

        Self { rx, shutdown }
    }

    /// Latest verdict for the current identity
    pub fn state(&self) -> ApprovalState {
        self.rx.borrow().clone()
    }

    /// Continuously-updated verdict channel
    pub fn watch(&self) -> watch::Receiver<ApprovalState> {
        self.rx.clone()
    }
}

impl Drop for ApprovalService {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn signed_out() -> ApprovalState {
    ApprovalState {
        loading: false,
        approved: false,
        store_id: None,
    }
}

/// Tear down the previous resolution and start one for the new identity
fn swap_identity(
    resolver: &ApprovalResolver,
    id: Option<String>,
    tx: &watch::Sender<ApprovalState>,
    current: &mut Option<ApprovalHandle>,
    verdict_rx: &mut Option<watch::Receiver<ApprovalState>>,
) {
    // Detach the old identity's listeners before subscribing anew
    *current = None;
    *verdict_rx = None;
    match id {
        Some(user_id) => {
            debug!(user_id, "identity changed, resubscribing approval");
            let handle = resolver.subscribe(&user_id);
            tx.send_replace(handle.state());
            *verdict_rx = Some(handle.watch());
            *current = Some(handle);
        }
        None => {
            tx.send_replace(signed_out());
        }
    }
}

/// Awaitable wrapper so the select arm disables itself while no
/// resolution is active
async fn forward(
    rx: &mut Option<watch::Receiver<ApprovalState>>,
) -> Option<Result<(), watch::error::RecvError>> {
    match rx {
        Some(rx) => Some(rx.changed().await),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Identity, StaticIdentity};
    use crate::realtime::{MemoryStore, RealtimeStore};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_identity_swap_resolves_new_user() {
        let store = Arc::new(MemoryStore::new());
        store
            .write("operators/u1", json!({"storeId": "s1", "approved": true}))
            .unwrap();
        store
            .write("operators/u2", json!({"storeId": "s2", "approved": false}))
            .unwrap();

        let provider = Arc::new(StaticIdentity::new(Some(Identity::new("u1"))));
        let resolver = ApprovalResolver::new(store.clone() as Arc<dyn RealtimeStore>)
            .with_fallback_delay(Duration::from_millis(5));
        let service = ApprovalService::spawn(resolver, provider.clone());

        tokio::time::sleep(Duration::from_millis(30)).await;
        let state = service.state();
        assert!(state.approved);
        assert_eq!(state.store_id.as_deref(), Some("s1"));

        provider.set(Some(Identity::new("u2")));
        tokio::time::sleep(Duration::from_millis(30)).await;
        let state = service.state();
        assert!(!state.approved);
        assert_eq!(state.store_id.as_deref(), Some("s2"));

        provider.set(None);
        tokio::time::sleep(Duration::from_millis(30)).await;
        let state = service.state();
        assert!(!state.approved);
        assert_eq!(state.store_id, None);
    }
}
