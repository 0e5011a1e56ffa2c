//! End-to-end flows over a memory-backed application state

use balcao_server::core::{AppState, Config};
use balcao_server::rpc::RpcError;
use balcao_server::store::ToggleOutcome;
use serde_json::json;
use shared::OrderStatus;

async fn setup() -> AppState {
    let config = Config::with_overrides("/tmp/balcao-it", 0);
    AppState::initialize(&config).await.unwrap()
}

/// Everything the six completeness predicates want, in one tenant
fn seed_complete_store(state: &AppState, store_id: &str) {
    let base = format!("tenants/{store_id}");
    state
        .store
        .write(
            &format!("{base}/profile"),
            json!({"name": "Marmitaria da Rosa", "phone": "11 98888-0000"}),
        )
        .unwrap();
    state
        .store
        .write(
            &format!("{base}/payments"),
            json!({"onDelivery": {"dinheiro": true}}),
        )
        .unwrap();
    state
        .store
        .write(
            &format!("{base}/openingHours"),
            json!({"seg": {"enabled": true, "from": "11:00", "to": "15:00"}}),
        )
        .unwrap();
    state
        .store
        .write(
            &format!("{base}/menu/items"),
            json!({"i1": {"name": "Feijoada", "price": 25.0}}),
        )
        .unwrap();
    state
        .store
        .write(
            &format!("{base}/delivery"),
            json!({"enabled": true, "modes": {"delivery": true}, "areas": {"a1": {"radiusKm": 3}}}),
        )
        .unwrap();
    state
        .store
        .write(
            &format!("{base}/finance"),
            json!({
                "bankAccount": {
                    "holderName": "Rosa Silva", "taxId": "123.456.789-00",
                    "bankCode": "001", "accountNumber": "56789-0",
                    "accountType": "corrente"
                },
                "payoutProvider": "pagarme",
                "automaticPayout": true
            }),
        )
        .unwrap();
}

#[tokio::test]
async fn test_full_pipeline_then_nothing_to_advance() {
    let state = setup().await;
    state
        .store
        .write(
            "orders/o1",
            json!({"status": "pedido realizado", "storeId": "s1", "createdAt": 1000}),
        )
        .unwrap();

    let expected = [
        OrderStatus::Confirmado,
        OrderStatus::Preparando,
        OrderStatus::Pronto,
        OrderStatus::ACaminho,
        OrderStatus::Entregue,
    ];
    for status in expected {
        assert_eq!(state.actions.advance("o1").await.unwrap(), status);
    }

    // Sixth advance: delivered is terminal
    let err = state.actions.advance("o1").await.unwrap_err();
    assert!(matches!(err, RpcError::NothingToAdvance { .. }));
}

#[tokio::test]
async fn test_feed_follows_advances_live() {
    let state = setup().await;
    state
        .store
        .write(
            "orders/o1",
            json!({"status": "pedido realizado", "storeId": "s1", "createdAt": 1000}),
        )
        .unwrap();
    // Mirror entry is what the feed discovers the order through
    state
        .store
        .write(
            "orders_by_store/s1/o1",
            json!({"status": "pedido realizado", "createdAt": 1000, "userId": "u1"}),
        )
        .unwrap();

    let feed = state.feed_for("s1").await;
    assert_eq!(feed.orders()[0].status, OrderStatus::Realizado);

    state.actions.advance("o1").await.unwrap();
    assert_eq!(feed.orders()[0].status, OrderStatus::Confirmado);
}

#[tokio::test]
async fn test_toggle_gate_end_to_end() {
    let state = setup().await;

    // Incomplete store: blocked, with delivery and finance among the
    // missing sections
    seed_complete_store(&state, "s1");
    state.store.delete("tenants/s1/delivery").unwrap();
    state.store.delete("tenants/s1/finance").unwrap();

    let outcome = state.toggle.toggle("s1").unwrap();
    match outcome {
        ToggleOutcome::Blocked { missing } => {
            let labels: Vec<&str> = missing.iter().map(shared::Section::label).collect();
            assert_eq!(labels, vec!["Configurações de entrega", "Financeiro"]);
        }
        other => panic!("expected blocked, got {other:?}"),
    }
    assert_eq!(
        state.store.read("tenants/s1/status/setup").unwrap(),
        Some(json!("em_configuracao"))
    );

    // Completing the registration opens the gate
    seed_complete_store(&state, "s1");
    let verdict = state.toggle.completeness("s1").unwrap();
    assert!(verdict.missing.is_empty(), "fixture left sections missing: {:?}", verdict.missing);
    assert_eq!(
        state.toggle.toggle("s1").unwrap(),
        ToggleOutcome::Toggled { online: true }
    );
    assert_eq!(
        state
            .store
            .read("tenants/s1/status/cadastroCompleto")
            .unwrap(),
        Some(json!(true))
    );

    // Forcing offline never asks questions
    state.store.delete("tenants/s1/menu").unwrap();
    state.toggle.set_offline("s1").unwrap();
    assert_eq!(
        state.store.read("tenants/s1/status/online").unwrap(),
        Some(json!(false))
    );
}

#[tokio::test]
async fn test_operator_approval_round_trip() {
    let state = setup().await;

    state.procedures.approve_operator("op1", "s1").await.unwrap();
    let direct = state.store.read("operators/op1").unwrap().unwrap();
    assert_eq!(direct["approved"], true);
    assert_eq!(direct["storeId"], "s1");
    let embedded = state
        .store
        .read("tenants/s1/operators/op1")
        .unwrap()
        .unwrap();
    assert_eq!(embedded["approved"], true);

    // Suspension is an explicit deny in both indices
    state.procedures.suspend_operator("op1", "s1").await.unwrap();
    let direct = state.store.read("operators/op1").unwrap().unwrap();
    assert_eq!(direct["approved"], false);
}

#[tokio::test]
async fn test_cancel_records_reason_everywhere() {
    let state = setup().await;
    state
        .store
        .write(
            "orders/o1",
            json!({"status": "pedido sendo preparado", "storeId": "s1", "createdAt": 1000}),
        )
        .unwrap();

    state
        .actions
        .cancel("o1", Some("cliente desistiu".to_string()))
        .await
        .unwrap();

    for path in ["orders/o1", "orders_by_store/s1/o1", "tenants/s1/orders/o1"] {
        let record = state.store.read(path).unwrap().unwrap();
        assert_eq!(record["status"], "pedido cancelado", "at {path}");
        assert_eq!(record["cancelReason"], "cliente desistiu", "at {path}");
    }
}
