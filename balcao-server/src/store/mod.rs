//! Store online toggle controller

mod toggle;

pub use toggle::{StoreToggle, ToggleOutcome};
