//! Per-section readiness predicates
//!
//! Each predicate is total over raw JSON: absent nodes, legacy aliases
//! and map-or-array collections are all handled here, at the boundary,
//! so nothing deeper in the call graph branches on shape.

use serde_json::Value;
use shared::Section;

/// Legacy aliases for the store display name, checked in order
const NAME_ALIASES: [&str; 4] = ["name", "storeName", "nome", "displayName"];

/// Legacy aliases for the contact phone
const PHONE_ALIASES: [&str; 3] = ["phone", "telefone", "whatsapp"];

/// The four payment method groups
const PAYMENT_GROUPS: [&str; 4] = ["onDelivery", "appSite", "rewards", "banking"];

/// Accepted payout providers
const PAYOUT_PROVIDERS: [&str; 3] = ["pagarme", "iugu", "manual"];

/// Path of the snapshot each section predicate reads
pub(crate) fn snapshot_path(store_id: &str, section: Section) -> String {
    match section {
        Section::StoreProfile => format!("tenants/{store_id}/profile"),
        Section::Payments => format!("tenants/{store_id}/payments"),
        Section::OpeningHours => format!("tenants/{store_id}/openingHours"),
        // Menu items live in two possible locations, so the predicate
        // gets the whole tenant node
        Section::Menu => format!("tenants/{store_id}"),
        Section::Delivery => format!("tenants/{store_id}/delivery"),
        Section::Finance => format!("tenants/{store_id}/finance"),
    }
}

/// Whether a section's configuration snapshot satisfies its predicate
pub fn section_ready(section: Section, snapshot: Option<&Value>) -> bool {
    let Some(snapshot) = snapshot else {
        return false;
    };
    match section {
        Section::StoreProfile => profile_ready(snapshot),
        Section::Payments => payments_ready(snapshot),
        Section::OpeningHours => opening_hours_ready(snapshot),
        Section::Menu => menu_ready(snapshot),
        Section::Delivery => delivery_ready(snapshot),
        Section::Finance => finance_ready(snapshot),
    }
}

fn non_empty_string(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.trim().is_empty())
}

fn first_alias<'a>(snapshot: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .map(|alias| &snapshot[*alias])
        .find(|v| !v.is_null())
}

/// Ready iff a non-empty display name (any alias) and phone exist
fn profile_ready(snapshot: &Value) -> bool {
    let name_ok = first_alias(snapshot, &NAME_ALIASES).is_some_and(non_empty_string);
    let phone_ok = first_alias(snapshot, &PHONE_ALIASES).is_some_and(non_empty_string);
    name_ok && phone_ok
}

/// Any boolean leaf in a group being true enables the group; the group
/// may be a flat map or an array
fn group_enabled(group: &Value) -> bool {
    match group {
        Value::Object(map) => map.values().any(|v| v.as_bool() == Some(true)),
        Value::Array(items) => items.iter().any(|v| v.as_bool() == Some(true)),
        _ => false,
    }
}

/// Ready iff at least one method is enabled in at least one group
fn payments_ready(snapshot: &Value) -> bool {
    PAYMENT_GROUPS
        .iter()
        .any(|group| group_enabled(&snapshot[*group]))
}

/// Ready iff at least one day-of-week entry is enabled
fn opening_hours_ready(snapshot: &Value) -> bool {
    snapshot.as_object().is_some_and(|days| {
        days.values()
            .any(|day| day["enabled"].as_bool() == Some(true))
    })
}

fn collection_non_empty(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}

/// Ready iff at least one item exists in either storage location:
/// current-format `menu/items` or the legacy top-level `items`
fn menu_ready(tenant: &Value) -> bool {
    collection_non_empty(&tenant["menu"]["items"]) || collection_non_empty(&tenant["items"])
}

/// Ready iff delivery is enabled, at least one mode is selected, and
/// pickup is selected or at least one delivery area is defined
fn delivery_ready(snapshot: &Value) -> bool {
    if snapshot["enabled"].as_bool() != Some(true) {
        return false;
    }
    let modes = &snapshot["modes"];
    let pickup = modes["pickup"].as_bool() == Some(true);
    let any_mode = pickup
        || modes["delivery"].as_bool() == Some(true)
        || modes["inhouse"].as_bool() == Some(true);
    any_mode && (pickup || collection_non_empty(&snapshot["areas"]))
}

/// Ready iff every bank-account field is filled, the payout provider is
/// one of the accepted values, and the automatic-payout flag is present
fn finance_ready(snapshot: &Value) -> bool {
    let account = &snapshot["bankAccount"];
    let account_ok = [
        "holderName",
        "taxId",
        "bankCode",
        "accountNumber",
        "accountType",
    ]
    .iter()
    .all(|field| non_empty_string(&account[*field]));

    let provider_ok = snapshot["payoutProvider"]
        .as_str()
        .is_some_and(|p| PAYOUT_PROVIDERS.contains(&p));

    account_ok && provider_ok && snapshot["automaticPayout"].is_boolean()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_accepts_legacy_aliases() {
        let legacy = json!({"nome": "Cantina", "telefone": "11 90000-0000"});
        assert!(section_ready(Section::StoreProfile, Some(&legacy)));
        let blank = json!({"name": "  ", "phone": "11 90000-0000"});
        assert!(!section_ready(Section::StoreProfile, Some(&blank)));
    }

    #[test]
    fn test_payments_array_shape() {
        let snapshot = json!({"banking": [false, true]});
        assert!(section_ready(Section::Payments, Some(&snapshot)));
        let all_off = json!({"onDelivery": {"dinheiro": false}, "appSite": []});
        assert!(!section_ready(Section::Payments, Some(&all_off)));
    }

    #[test]
    fn test_opening_hours_requires_an_enabled_day() {
        let disabled = json!({"seg": {"enabled": false}, "ter": {"enabled": false}});
        assert!(!section_ready(Section::OpeningHours, Some(&disabled)));
        let enabled = json!({"dom": {"enabled": true}});
        assert!(section_ready(Section::OpeningHours, Some(&enabled)));
    }

    #[test]
    fn test_menu_checks_both_locations() {
        let current = json!({"menu": {"items": {"i1": {}}}});
        assert!(section_ready(Section::Menu, Some(&current)));
        let legacy = json!({"items": [{"name": "Feijoada"}]});
        assert!(section_ready(Section::Menu, Some(&legacy)));
        let neither = json!({"menu": {"items": {}}});
        assert!(!section_ready(Section::Menu, Some(&neither)));
    }

    #[test]
    fn test_delivery_pickup_waives_areas() {
        let pickup_only = json!({"enabled": true, "modes": {"pickup": true}});
        assert!(section_ready(Section::Delivery, Some(&pickup_only)));
        let delivery_no_area = json!({"enabled": true, "modes": {"delivery": true}});
        assert!(!section_ready(Section::Delivery, Some(&delivery_no_area)));
        let disabled = json!({"enabled": false, "modes": {"pickup": true}});
        assert!(!section_ready(Section::Delivery, Some(&disabled)));
    }

    #[test]
    fn test_finance_requires_flag_presence_not_value() {
        let mut snapshot = json!({
            "bankAccount": {
                "holderName": "Rosa",
                "taxId": "1",
                "bankCode": "260",
                "accountNumber": "1-2",
                "accountType": "corrente",
            },
            "payoutProvider": "manual",
            "automaticPayout": false,
        });
        assert!(section_ready(Section::Finance, Some(&snapshot)));
        snapshot["automaticPayout"] = Value::Null;
        assert!(!section_ready(Section::Finance, Some(&snapshot)));
        snapshot["automaticPayout"] = json!(true);
        snapshot["payoutProvider"] = json!("outro");
        assert!(!section_ready(Section::Finance, Some(&snapshot)));
    }

    #[test]
    fn test_absent_snapshot_is_never_ready() {
        for section in Section::ALL {
            assert!(!section_ready(section, None));
        }
    }
}
