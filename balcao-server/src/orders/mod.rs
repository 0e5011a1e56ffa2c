//! Order lifecycle: actions, aggregation and normalization

pub mod actions;
pub mod clients;
pub mod feed;
pub mod normalize;

pub use actions::OrderActions;
pub use clients::{ClientDirectory, ClientFeed, ClientGroup, group_by_client};
pub use feed::{FeedHandle, OrderFeed};
pub use normalize::{OrderListing, STALE_AFTER_MS, is_stale, normalize_order, with_staleness};
