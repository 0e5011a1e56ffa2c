//! Client-grouped view over the order feed
//!
//! Groups the aggregated order list by `user_id` and enriches the
//! display names through the batched profile lookup, with a cache so
//! each id is fetched at most once per directory. Lookup failures fall
//! back to the name embedded in the most recent order.

use crate::rpc::Procedures;
use parking_lot::Mutex;
use serde::Serialize;
use shared::{Order, OrderStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::feed::FeedHandle;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientGroup {
    pub user_id: String,
    pub display_name: Option<String>,
    pub open_orders: usize,
    pub total_orders: usize,
    pub last_status: OrderStatus,
    pub last_activity: i64,
    pub orders: Vec<Order>,
}

/// Group orders by client. Orders with no `user_id` are left out —
/// they belong to walk-in flows that never had an account attached.
/// Groups come back sorted by last activity descending, each group's
/// orders by `created_at` descending.
pub fn group_by_client(orders: &[Order]) -> Vec<ClientGroup> {
    let mut by_user: HashMap<String, Vec<Order>> = HashMap::new();
    for order in orders {
        if !order.user_id.is_empty() {
            by_user
                .entry(order.user_id.clone())
                .or_default()
                .push(order.clone());
        }
    }

    let mut groups: Vec<ClientGroup> = by_user
        .into_iter()
        .map(|(user_id, mut orders)| {
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
            let last_activity = orders
                .iter()
                .map(Order::reference_timestamp)
                .max()
                .unwrap_or(0);
            ClientGroup {
                user_id,
                display_name: orders
                    .iter()
                    .find(|o| !o.user_name.is_empty())
                    .map(|o| o.user_name.clone()),
                open_orders: orders.iter().filter(|o| !o.status.is_terminal()).count(),
                total_orders: orders.len(),
                last_status: orders[0].status,
                last_activity,
                orders,
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        b.last_activity
            .cmp(&a.last_activity)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    groups
}

/// Display-name cache over the batched profile procedure
pub struct ClientDirectory {
    procedures: Arc<dyn Procedures>,
    cache: Mutex<HashMap<String, String>>,
}

impl ClientDirectory {
    pub fn new(procedures: Arc<dyn Procedures>) -> Self {
        Self {
            procedures,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Overlay cached or freshly fetched profile names onto the groups.
    /// Ids the lookup cannot resolve keep whatever name the orders
    /// themselves carried.
    pub async fn enrich(&self, store_id: &str, groups: &mut [ClientGroup]) {
        let uncached: Vec<String> = {
            let cache = self.cache.lock();
            groups
                .iter()
                .filter(|g| !cache.contains_key(&g.user_id))
                .map(|g| g.user_id.clone())
                .collect()
        };

        if !uncached.is_empty() {
            match self.procedures.get_client_profiles(store_id, &uncached).await {
                Ok(profiles) => {
                    let mut cache = self.cache.lock();
                    for profile in profiles {
                        cache.insert(profile.user_id, profile.name);
                    }
                }
                Err(e) => debug!(store_id, error = %e, "profile lookup failed, keeping embedded names"),
            }
        }

        let cache = self.cache.lock();
        for group in groups.iter_mut() {
            if let Some(name) = cache.get(&group.user_id) {
                group.display_name = Some(name.clone());
            }
        }
    }
}

/// The client-grouped variant of the order feed. Shares the live
/// aggregation handle and the process-wide name directory, so wrapping
/// a store's feed costs nothing beyond the grouping itself.
pub struct ClientFeed {
    handle: Arc<FeedHandle>,
    directory: Arc<ClientDirectory>,
    store_id: String,
}

impl ClientFeed {
    pub fn new(handle: Arc<FeedHandle>, directory: Arc<ClientDirectory>, store_id: &str) -> Self {
        Self {
            handle,
            directory,
            store_id: store_id.to_string(),
        }
    }

    /// Current grouped snapshot, names enriched
    pub async fn groups(&self) -> Vec<ClientGroup> {
        let mut groups = group_by_client(&self.handle.orders());
        self.directory.enrich(&self.store_id, &mut groups).await;
        groups
    }
}
