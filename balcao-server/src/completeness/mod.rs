//! Store configuration completeness
//!
//! Derives the "ready to sell" verdict that gates the online toggle:
//! six independent section predicates over the tenant's configuration
//! snapshots, ANDed together. Mirror data is loosely shaped (legacy
//! field aliases, map-or-array collections), so every predicate reads
//! raw JSON and tolerates missing or malformed sections by treating
//! them as not ready.

mod sections;

pub use sections::section_ready;

use crate::realtime::{RealtimeStore, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::Section;
use shared::util::now_millis;
use std::sync::Arc;
use tracing::info;

/// Completeness verdict
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Verdict {
    pub complete: bool,
    /// Sections that failed their predicate, in evaluation order
    pub missing: Vec<Section>,
}

impl Verdict {
    /// Human-readable labels of the missing sections
    pub fn missing_labels(&self) -> Vec<&'static str> {
        self.missing.iter().map(Section::label).collect()
    }
}

#[derive(Clone)]
pub struct CompletenessEvaluator {
    store: Arc<dyn RealtimeStore>,
}

impl CompletenessEvaluator {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    /// Evaluate all six sections for a store. `missing` preserves the
    /// fixed evaluation order; `complete` iff `missing` is empty.
    pub fn evaluate(&self, store_id: &str) -> StoreResult<Verdict> {
        let mut missing = Vec::new();
        for section in Section::ALL {
            let snapshot = self
                .store
                .read(&sections::snapshot_path(store_id, section))?;
            if !section_ready(section, snapshot.as_ref()) {
                missing.push(section);
            }
        }
        Ok(Verdict {
            complete: missing.is_empty(),
            missing,
        })
    }

    /// Persist the verdict to the store's status record. Unconditional:
    /// always written in full, never a delta against the previous value.
    pub fn sync_setup_status(&self, store_id: &str, verdict: &Verdict) -> StoreResult<()> {
        let setup = if verdict.complete {
            "configurado"
        } else {
            "em_configuracao"
        };
        self.store.write(
            &format!("tenants/{store_id}/status"),
            json!({
                "cadastroCompleto": verdict.complete,
                "setup": setup,
                "setupUpdatedAt": now_millis(),
            }),
        )?;
        info!(store_id, complete = verdict.complete, "setup status synced");
        Ok(())
    }
}
