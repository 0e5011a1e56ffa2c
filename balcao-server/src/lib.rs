//! Balcão Server - order lifecycle and store backoffice engine
//!
//! # Overview
//!
//! The server keeps a restaurant's backoffice state consistent across
//! three concerns:
//!
//! - **Orders** (`orders`): aggregation over the canonical records and
//!   their per-store mirrors, pipeline actions (advance / cancel)
//! - **Completeness** (`completeness`): the six-section registration
//!   gate that decides whether a store may go online
//! - **Approval** (`approval`): fail-closed operator approval resolved
//!   from two realtime sources plus a one-shot fallback scan
//!
//! # Module structure
//!
//! ```text
//! balcao-server/src/
//! ├── core/          # config, state, server
//! ├── realtime/      # keyed JSON store (memory + redb) with listeners
//! ├── rpc/           # server-validated remote procedures
//! ├── orders/        # normalization, feed, actions, client grouping
//! ├── completeness/  # section predicates and setup status sync
//! ├── approval/      # vote merging, resolver, identity-bound service
//! ├── store/         # online toggle controller
//! ├── api/           # HTTP routes and handlers
//! └── utils/         # errors, logging
//! ```

pub mod api;
pub mod approval;
pub mod completeness;
pub mod core;
pub mod identity;
pub mod notify;
pub mod orders;
pub mod realtime;
pub mod rpc;
pub mod store;
pub mod utils;

// Re-export public types
pub use core::{AppState, Config, Server};
pub use notify::{Level, Notice, Notifier};
pub use realtime::{MemoryStore, RealtimeStore, RedbStore};
pub use rpc::{LocalProcedures, Procedures};
pub use utils::{AppError, AppResponse, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Make sure the work dir exists and wire up logging
pub fn setup_environment(config: &Config) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.work_dir)?;
    if config.is_production() {
        let log_dir = std::path::Path::new(&config.work_dir).join("logs");
        std::fs::create_dir_all(&log_dir)?;
        init_logger_with_file(None, log_dir.to_str());
    } else {
        init_logger();
    }
    Ok(())
}
