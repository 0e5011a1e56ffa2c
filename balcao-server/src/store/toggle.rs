//! Online/offline switch gated by registration completeness
//!
//! Every toggle attempt runs a fresh completeness evaluation and
//! persists the setup status before the switch itself is considered —
//! `online: true` is never written from a cached verdict. The status
//! persist is deliberately sequenced first so the store record reflects
//! the evaluation even when the flip fails afterwards.

use crate::completeness::{CompletenessEvaluator, Verdict};
use crate::realtime::{RealtimeStore, StoreResult};
use serde_json::json;
use shared::Section;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    /// The switch flipped; `online` is the new value
    Toggled { online: bool },
    /// Registration incomplete, `online` untouched
    Blocked { missing: Vec<Section> },
}

pub struct StoreToggle {
    store: Arc<dyn RealtimeStore>,
    evaluator: CompletenessEvaluator,
}

impl StoreToggle {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        let evaluator = CompletenessEvaluator::new(store.clone());
        Self { store, evaluator }
    }

    /// Flip the store's `online` flag, gated by a fresh completeness
    /// evaluation. The setup status is persisted in every case, before
    /// the flip.
    pub fn toggle(&self, store_id: &str) -> StoreResult<ToggleOutcome> {
        let verdict = self.evaluator.evaluate(store_id)?;
        self.evaluator.sync_setup_status(store_id, &verdict)?;

        if !verdict.complete {
            info!(
                store_id,
                missing = ?verdict.missing_labels(),
                "toggle blocked, registration incomplete"
            );
            return Ok(ToggleOutcome::Blocked {
                missing: verdict.missing,
            });
        }

        let current = self
            .store
            .read(&format!("tenants/{store_id}/status/online"))?
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let online = !current;

        // Both fields land in one write so a reader never sees the flag
        // flip without the completeness marker
        self.store.write(
            &format!("tenants/{store_id}/status"),
            json!({"online": online, "cadastroCompleto": true}),
        )?;
        info!(store_id, online, "store toggled");
        Ok(ToggleOutcome::Toggled { online })
    }

    /// Force the store offline. No completeness gate: going offline is
    /// always allowed.
    pub fn set_offline(&self, store_id: &str) -> StoreResult<()> {
        self.store
            .write(&format!("tenants/{store_id}/status"), json!({"online": false}))?;
        info!(store_id, "store forced offline");
        Ok(())
    }

    /// The gate's view of a store, without touching anything
    pub fn completeness(&self, store_id: &str) -> StoreResult<Verdict> {
        self.evaluator.evaluate(store_id)
    }
}
