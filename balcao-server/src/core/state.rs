//! Application state: one shared handle over every engine
//!
//! `AppState` is cheap to clone (everything is behind `Arc`) and is the
//! axum router's state type. Order feeds are created lazily, one per
//! store, and cached for the lifetime of the process so the realtime
//! subscriptions are attached exactly once.

use dashmap::DashMap;
use std::sync::Arc;

use crate::approval::{ApprovalResolver, ApprovalService};
use crate::core::Config;
use crate::identity::{Identity, IdentityProvider, StaticIdentity};
use crate::notify::Notifier;
use crate::orders::{ClientDirectory, ClientFeed, OrderActions, OrderFeed, feed::FeedHandle};
use crate::realtime::{MemoryStore, RealtimeStore, RedbStore};
use crate::rpc::{LocalProcedures, Procedures};
use crate::store::StoreToggle;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RealtimeStore>,
    pub procedures: Arc<dyn Procedures>,
    pub actions: Arc<OrderActions>,
    pub toggle: Arc<StoreToggle>,
    pub approval: Arc<ApprovalService>,
    pub identity: Arc<StaticIdentity>,
    pub notifier: Notifier,
    pub clients: Arc<ClientDirectory>,
    feed: Arc<OrderFeed>,
    feeds: Arc<DashMap<String, Arc<FeedHandle>>>,
    client_feeds: Arc<DashMap<String, Arc<ClientFeed>>>,
}

impl AppState {
    /// Build every engine on top of the configured store backend
    pub async fn initialize(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn RealtimeStore> = match config.store_backend.as_str() {
            "memory" => Arc::new(MemoryStore::new()),
            _ => {
                std::fs::create_dir_all(&config.work_dir)?;
                Arc::new(RedbStore::open(config.database_path())?)
            }
        };
        tracing::info!(backend = config.store_backend, "realtime store ready");

        let procedures: Arc<dyn Procedures> = Arc::new(LocalProcedures::new(store.clone()));
        let identity = Arc::new(StaticIdentity::new(
            config.operator_id.clone().map(Identity::new),
        ));
        let approval = ApprovalService::spawn(
            ApprovalResolver::new(store.clone()),
            identity.clone() as Arc<dyn IdentityProvider>,
        );

        Ok(Self {
            config: config.clone(),
            actions: Arc::new(OrderActions::new(store.clone(), procedures.clone())),
            toggle: Arc::new(StoreToggle::new(store.clone())),
            approval: Arc::new(approval),
            identity,
            notifier: Notifier::new(),
            clients: Arc::new(ClientDirectory::new(procedures.clone())),
            feed: Arc::new(
                OrderFeed::new(store.clone(), procedures.clone())
                    .with_limit(config.order_list_limit),
            ),
            feeds: Arc::new(DashMap::new()),
            client_feeds: Arc::new(DashMap::new()),
            store,
            procedures,
        })
    }

    /// The live order aggregation for a store, attached on first use
    pub async fn feed_for(&self, store_id: &str) -> Arc<FeedHandle> {
        if let Some(handle) = self.feeds.get(store_id) {
            return handle.clone();
        }
        let handle = Arc::new(self.feed.subscribe(store_id).await);
        self.feeds
            .entry(store_id.to_string())
            .or_insert(handle)
            .clone()
    }

    /// The client-grouped view over a store's feed, sharing the same
    /// live aggregation and the process-wide name directory
    pub async fn client_feed_for(&self, store_id: &str) -> Arc<ClientFeed> {
        if let Some(feed) = self.client_feeds.get(store_id) {
            return feed.clone();
        }
        let handle = self.feed_for(store_id).await;
        let feed = Arc::new(ClientFeed::new(handle, self.clients.clone(), store_id));
        self.client_feeds
            .entry(store_id.to_string())
            .or_insert(feed)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_feed_is_cached_per_store() {
        let config = Config::with_overrides("/tmp/balcao-state-test", 0);
        let state = AppState::initialize(&config).await.unwrap();

        let a = state.feed_for("s1").await;
        let b = state.feed_for("s1").await;
        assert!(Arc::ptr_eq(&a, &b));
        let other = state.feed_for("s2").await;
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[tokio::test]
    async fn test_client_feed_is_cached_per_store() {
        let config = Config::with_overrides("/tmp/balcao-state-test", 0);
        let state = AppState::initialize(&config).await.unwrap();

        let a = state.client_feed_for("s1").await;
        let b = state.client_feed_for("s1").await;
        assert!(Arc::ptr_eq(&a, &b));
    }
}
