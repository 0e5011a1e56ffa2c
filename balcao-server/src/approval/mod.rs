//! Operator approval gate
//!
//! Reconciles two independent, continuously-updating realtime signals
//! (the direct operator index and the tenant-embedded operator record)
//! into a single `{loading, approved, storeId}` verdict for the current
//! identity, with a one-shot fallback scan for stale indices. Vote
//! merging itself is pure and lives in [`shared::approval`].

mod resolver;
mod service;

pub use resolver::{ApprovalHandle, ApprovalResolver};
pub use service::ApprovalService;
