//! Canonical order model
//!
//! Normalized from the loose mirror projections at the ingestion
//! boundary. Monetary fields are derived from the items when the
//! canonical source does not provide them:
//! `total = subtotal + service_fee + delivery_fee - discount`.

use super::OrderStatus;
use serde::{Deserialize, Serialize};

/// A single order line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// Item name
    pub name: String,
    /// Quantity
    #[serde(default)]
    pub qty: i32,
    /// Unit price
    #[serde(default)]
    pub unit_price: f64,
}

impl OrderItem {
    /// Line total (`unit_price × qty`)
    pub fn line_total(&self) -> f64 {
        self.unit_price * self.qty as f64
    }
}

/// Canonical order, normalized from store/client mirror entries
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Opaque order key
    pub id: String,
    /// Fulfillment status
    #[serde(default)]
    pub status: OrderStatus,
    /// Creation timestamp (epoch ms)
    #[serde(default)]
    pub created_at: i64,
    /// Client who placed the order
    #[serde(default)]
    pub user_id: String,
    /// Client display name embedded in the order record (fallback when
    /// the profile lookup fails)
    #[serde(default)]
    pub user_name: String,
    /// Items sum
    pub subtotal: f64,
    #[serde(default)]
    pub service_fee: f64,
    #[serde(default)]
    pub delivery_fee: f64,
    #[serde(default)]
    pub discount: f64,
    pub total: f64,
    /// Ordered item list
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub items_count: i32,
    /// Cancellation reason, when cancelled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    /// Last status transition timestamp (epoch ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_changed_at: Option<i64>,
    /// Last update timestamp (epoch ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Order {
    /// Most specific available timestamp for staleness computation:
    /// status-changed time, then updated time, then created time.
    pub fn reference_timestamp(&self) -> i64 {
        self.status_changed_at
            .or(self.updated_at)
            .unwrap_or(self.created_at)
    }

    /// Subtotal derived from the item list
    pub fn items_subtotal(&self) -> f64 {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}
