use crate::fixtures::{inbound, TestOracle};
use oracle_core::application::{DropReason, RequestOutcome};
use oracle_core::domain::InboundMessage;
use oracle_core::foundation::{MessageId, MAX_MESSAGE_BODY_BYTES};
use serde_json::json;

fn raw_message(body: String) -> InboundMessage {
    InboundMessage {
        message_id: MessageId::from("raw"),
        from_address: "BM-2cTestClient".to_string(),
        to_address: "BM-2cTestOracle".to_string(),
        received_time: 100,
        subject: "oracle request".to_string(),
        body,
        direct: true,
    }
}

#[tokio::test]
async fn test_dispatcher_when_body_is_not_a_request_then_dropped_without_side_effects() {
    let harness = TestOracle::new();

    assert!(matches!(harness.send(&raw_message("hello oracle".to_string())).await, RequestOutcome::Dropped(DropReason::Malformed(_))));
    assert!(matches!(harness.send(&raw_message("{\"pwtxid\": 1}".to_string())).await, RequestOutcome::Dropped(DropReason::Malformed(_))));
    assert_eq!(
        harness.send(&inbound("m1", &json!({"operation": "withdraw_everything"}), 100)).await,
        RequestOutcome::Dropped(DropReason::UnknownOperation("withdraw_everything".to_string()))
    );
    assert_eq!(
        harness.send(&inbound("m2", &json!({"operation": "timelock_create", "message_id": "m2"}), 100)).await,
        RequestOutcome::Dropped(DropReason::MissingField("sum_satoshi"))
    );

    let oversized = format!("{{\"operation\": \"bounty_redeem\", \"pad\": \"{}\"}}", "x".repeat(MAX_MESSAGE_BODY_BYTES));
    assert!(matches!(harness.send(&raw_message(oversized)).await, RequestOutcome::Dropped(DropReason::Malformed(_))));

    assert_eq!(harness.pending_count(), 0);
    assert!(harness.transport.sent().is_empty());
}

#[tokio::test]
async fn test_dispatcher_when_fields_have_wrong_types_then_rejected_as_invalid() {
    let harness = TestOracle::new();
    let body = json!({
        "operation": "conditioned_transaction",
        "transaction": "not an object",
        "locktime": 0,
        "pubkey_list": [],
        "req_sigs": 1,
        "condition": "True",
    });
    assert!(matches!(harness.send(&inbound("m1", &body, 100)).await, RequestOutcome::Dropped(DropReason::Invalid(_))));
}

#[tokio::test]
async fn test_dispatcher_when_condition_is_malformed_then_rejected_before_queueing() {
    let harness = TestOracle::new();
    let body = crate::fixtures::ConditionedRequestBuilder::default().condition("sigs >").build();
    assert!(matches!(harness.send(&inbound("m1", &body, 100)).await, RequestOutcome::Dropped(DropReason::Invalid(_))));
    assert_eq!(harness.pending_count(), 0);
}

#[tokio::test]
async fn test_dispatcher_when_condition_nests_too_deep_then_rejected_as_invalid() {
    let harness = TestOracle::new();
    let condition = format!("{}sigs > 1{}", "(".repeat(20_000), ")".repeat(20_000));
    let body = crate::fixtures::ConditionedRequestBuilder::default().condition(&condition).build();
    assert!(matches!(harness.send(&inbound("m1", &body, 100)).await, RequestOutcome::Dropped(DropReason::Invalid(_))));
    assert_eq!(harness.pending_count(), 0);
}

#[tokio::test]
async fn test_dispatcher_when_identity_broadcast_then_active_response_is_sent() {
    let harness = TestOracle::new();
    assert!(harness.oracle.identity_broadcast().await);
    let sent = harness.transport.broadcasts_with_subject(oracle_core::domain::protocol::subjects::IDENTITY_BROADCAST);
    assert_eq!(sent.len(), 1);
    let body: serde_json::Value = serde_json::from_str(&sent[0].body).expect("json");
    assert_eq!(body["response"], "active");
}
