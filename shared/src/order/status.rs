//! Order status pipeline
//!
//! A fixed, strictly ordered fulfillment sequence:
//!
//! ```text
//! pedido realizado → pedido confirmado → pedido sendo preparado
//!     → pedido pronto → pedido indo até você → pedido entregue
//! ```
//!
//! plus a side-channel terminal status `pedido cancelado`, reachable
//! from any non-terminal status. No backward transition exists.
//!
//! The Portuguese wire strings are the canonical persistence format of
//! the realtime store and must round-trip exactly.

use serde::{Deserialize, Serialize};

/// Order fulfillment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum OrderStatus {
    /// Order placed (pipeline entry point)
    #[default]
    #[serde(rename = "pedido realizado")]
    Realizado,
    /// Confirmed by the store
    #[serde(rename = "pedido confirmado")]
    Confirmado,
    /// In preparation
    #[serde(rename = "pedido sendo preparado")]
    Preparando,
    /// Ready for pickup/dispatch
    #[serde(rename = "pedido pronto")]
    Pronto,
    /// Out for delivery
    #[serde(rename = "pedido indo até você")]
    ACaminho,
    /// Delivered (terminal)
    #[serde(rename = "pedido entregue")]
    Entregue,
    /// Cancelled (terminal, reachable from any status)
    #[serde(rename = "pedido cancelado")]
    Cancelado,
}

/// The six ordered pipeline statuses. `Cancelado` is not part of the
/// pipeline; it is a side channel.
pub const PIPELINE: [OrderStatus; 6] = [
    OrderStatus::Realizado,
    OrderStatus::Confirmado,
    OrderStatus::Preparando,
    OrderStatus::Pronto,
    OrderStatus::ACaminho,
    OrderStatus::Entregue,
];

impl OrderStatus {
    /// Canonical wire string for this status
    pub fn as_wire(&self) -> &'static str {
        match self {
            OrderStatus::Realizado => "pedido realizado",
            OrderStatus::Confirmado => "pedido confirmado",
            OrderStatus::Preparando => "pedido sendo preparado",
            OrderStatus::Pronto => "pedido pronto",
            OrderStatus::ACaminho => "pedido indo até você",
            OrderStatus::Entregue => "pedido entregue",
            OrderStatus::Cancelado => "pedido cancelado",
        }
    }

    /// Parse a raw status string. Total: unrecognized input maps to the
    /// first pipeline status (treated as "not yet started"), mirroring
    /// how mirror entries with missing or legacy status values are
    /// displayed.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "pedido realizado" => OrderStatus::Realizado,
            "pedido confirmado" => OrderStatus::Confirmado,
            "pedido sendo preparado" => OrderStatus::Preparando,
            "pedido pronto" => OrderStatus::Pronto,
            "pedido indo até você" => OrderStatus::ACaminho,
            "pedido entregue" => OrderStatus::Entregue,
            "pedido cancelado" => OrderStatus::Cancelado,
            _ => OrderStatus::Realizado,
        }
    }

    /// The status one position forward in the pipeline.
    ///
    /// Returns `None` when there is nothing left to advance to
    /// (`Entregue` is the pipeline end; `Cancelado` never advances).
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Realizado => Some(OrderStatus::Confirmado),
            OrderStatus::Confirmado => Some(OrderStatus::Preparando),
            OrderStatus::Preparando => Some(OrderStatus::Pronto),
            OrderStatus::Pronto => Some(OrderStatus::ACaminho),
            OrderStatus::ACaminho => Some(OrderStatus::Entregue),
            OrderStatus::Entregue | OrderStatus::Cancelado => None,
        }
    }

    /// True for statuses from which no further pipeline advance exists
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Entregue | OrderStatus::Cancelado)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}
