//! API route modules
//!
//! # Structure
//!
//! - [`health`] - health check
//! - [`orders`] - order listing and lifecycle actions
//! - [`clients`] - client-grouped order listing
//! - [`store`] - completeness and online toggle
//! - [`approval`] - operator approval status and management

pub mod approval;
pub mod clients;
pub mod health;
pub mod orders;
pub mod store;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};
