//! Normalization boundary for order mirror entries
//!
//! Mirror projections are eventually consistent and loosely shaped:
//! items arrive as an array or as a keyed map, legacy entries use
//! different field names, and monetary fields may be absent. Everything
//! is normalized here, once, at ingestion; nothing deeper in the call
//! graph branches on shape. Malformed fields are defensively defaulted,
//! never thrown.

use serde_json::Value;
use shared::{Order, OrderItem, OrderStatus};

/// Staleness threshold: an order untouched this long is flagged
pub const STALE_AFTER_MS: i64 = 15 * 60 * 1000;

fn str_alias(raw: &Value, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .find_map(|a| raw[*a].as_str())
        .map(str::to_string)
}

fn num_alias(raw: &Value, aliases: &[&str]) -> Option<f64> {
    aliases.iter().find_map(|a| raw[*a].as_f64())
}

fn normalize_item(raw: &Value) -> OrderItem {
    OrderItem {
        name: str_alias(raw, &["name", "nome"]).unwrap_or_default(),
        qty: num_alias(raw, &["qty", "quantity", "qtd"]).unwrap_or(1.0) as i32,
        unit_price: num_alias(raw, &["unitPrice", "price", "preco"]).unwrap_or(0.0),
    }
}

/// Items are stored either as an ordered array or as a keyed map
/// (legacy push-id collections). Map entries are taken in key order.
fn normalize_items(raw: &Value) -> Vec<OrderItem> {
    match raw {
        Value::Array(items) => items.iter().map(normalize_item).collect(),
        Value::Object(map) => map.values().map(normalize_item).collect(),
        _ => Vec::new(),
    }
}

/// Build the canonical [`Order`] from a raw mirror entry.
///
/// Monetary invariant: when absent from the source,
/// `subtotal = Σ price×qty` and
/// `total = subtotal + serviceFee + deliveryFee − discount`.
pub fn normalize_order(id: &str, raw: &Value) -> Order {
    let status = match raw["status"].as_str() {
        Some(s) => OrderStatus::from_wire(s),
        None => OrderStatus::default(),
    };
    let items = normalize_items(&raw["items"]);

    let service_fee = raw["serviceFee"].as_f64().unwrap_or(0.0);
    let delivery_fee = raw["deliveryFee"].as_f64().unwrap_or(0.0);
    let discount = raw["discount"].as_f64().unwrap_or(0.0);
    let subtotal = raw["subtotal"]
        .as_f64()
        .unwrap_or_else(|| items.iter().map(OrderItem::line_total).sum());
    let total = raw["total"]
        .as_f64()
        .unwrap_or(subtotal + service_fee + delivery_fee - discount);
    let items_count = raw["itemsCount"]
        .as_i64()
        .map(|n| n as i32)
        .unwrap_or_else(|| items.iter().map(|i| i.qty).sum());

    Order {
        id: id.to_string(),
        status,
        created_at: raw["createdAt"].as_i64().unwrap_or(0),
        user_id: str_alias(raw, &["userId"]).unwrap_or_default(),
        user_name: str_alias(raw, &["userName", "clientName"]).unwrap_or_default(),
        subtotal,
        service_fee,
        delivery_fee,
        discount,
        total,
        items,
        items_count,
        cancel_reason: str_alias(raw, &["cancelReason"]),
        status_changed_at: raw["statusChangedAt"].as_i64(),
        updated_at: raw["updatedAt"].as_i64(),
    }
}

/// Staleness flag for display: the order sat in the same state for at
/// least the threshold. Suppressed entirely for terminal statuses —
/// a delivered or cancelled order is never "late".
pub fn is_stale(order: &Order, now_ms: i64) -> bool {
    if order.status.is_terminal() {
        return false;
    }
    now_ms - order.reference_timestamp() >= STALE_AFTER_MS
}

/// Listing wire shape: the order plus its derived staleness flag
#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderListing {
    #[serde(flatten)]
    pub order: Order,
    pub stale: bool,
}

/// Attach the staleness flag to each order, evaluated at `now_ms`
pub fn with_staleness(orders: Vec<Order>, now_ms: i64) -> Vec<OrderListing> {
    orders
        .into_iter()
        .map(|order| OrderListing {
            stale: is_stale(&order, now_ms),
            order,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_items_as_array_and_map() {
        let array = json!({"items": [{"name": "X-Salada", "qty": 2, "unitPrice": 18.0}]});
        let order = normalize_order("o1", &array);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].qty, 2);

        let map = json!({"items": {"-Nk1": {"nome": "Suco", "qtd": 1, "preco": 8.0}}});
        let order = normalize_order("o2", &map);
        assert_eq!(order.items[0].name, "Suco");
        assert_eq!(order.items[0].unit_price, 8.0);
    }

    #[test]
    fn test_money_derived_from_items() {
        let raw = json!({
            "items": [{"name": "Marmita", "qty": 2, "unitPrice": 15.0}],
            "serviceFee": 1.0,
            "deliveryFee": 5.0,
            "discount": 3.0,
        });
        let order = normalize_order("o1", &raw);
        assert_eq!(order.subtotal, 30.0);
        assert_eq!(order.total, 33.0);
        assert_eq!(order.items_count, 2);
    }

    #[test]
    fn test_canonical_money_takes_precedence() {
        let raw = json!({
            "items": [{"name": "Marmita", "qty": 2, "unitPrice": 15.0}],
            "subtotal": 28.0,
            "total": 40.0,
        });
        let order = normalize_order("o1", &raw);
        assert_eq!(order.subtotal, 28.0);
        assert_eq!(order.total, 40.0);
    }

    #[test]
    fn test_absent_fields_default() {
        let order = normalize_order("o1", &json!({}));
        assert_eq!(order.status, OrderStatus::Realizado);
        assert!(order.items.is_empty());
        assert_eq!(order.total, 0.0);
        assert_eq!(order.created_at, 0);
    }

    #[test]
    fn test_staleness_uses_most_specific_timestamp() {
        let raw = json!({
            "status": "pedido confirmado",
            "createdAt": 0,
            "statusChangedAt": 100_000,
        });
        let order = normalize_order("o1", &raw);
        assert!(!is_stale(&order, 100_000 + STALE_AFTER_MS - 1));
        assert!(is_stale(&order, 100_000 + STALE_AFTER_MS));
    }

    #[test]
    fn test_listing_carries_staleness_on_the_wire() {
        let fresh = normalize_order(
            "o1",
            &json!({"status": "pedido confirmado", "createdAt": 100_000}),
        );
        let old = normalize_order("o2", &json!({"status": "pedido confirmado", "createdAt": 0}));

        let listings = with_staleness(vec![fresh, old], 100_000 + 1);
        assert!(!listings[0].stale);
        assert!(listings[1].stale);

        let wire = serde_json::to_value(&listings[1]).unwrap();
        assert_eq!(wire["stale"], json!(true));
        assert_eq!(wire["id"], json!("o2"));
    }

    #[test]
    fn test_terminal_orders_are_never_stale() {
        let raw = json!({"status": "pedido entregue", "createdAt": 0});
        let order = normalize_order("o1", &raw);
        assert!(!is_stale(&order, STALE_AFTER_MS * 100));
    }
}
