//! Shared types for the Balcão backoffice
//!
//! Pure domain types and logic used by both the server engine and any
//! dashboard client: the order model and status pipeline, store status,
//! completeness sections, approval vote merging, and the unified API
//! response envelope. No I/O lives here.

pub mod approval;
pub mod order;
pub mod response;
pub mod section;
pub mod store;
pub mod util;

// Re-exports
pub use approval::{ApprovalState, Vote, merge_votes, resolve_store_id};
pub use order::{Order, OrderItem, OrderStatus};
pub use response::ApiResponse;
pub use section::Section;
pub use store::{SetupState, StoreStatus};
pub use util::now_millis;
