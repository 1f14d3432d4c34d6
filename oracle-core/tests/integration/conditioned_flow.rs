use crate::fixtures::{inbound, ConditionedRequestBuilder, TestOracle};
use oracle_core::application::{DropReason, RequestOutcome, TaskOutcome};
use oracle_core::domain::protocol::subjects;
use oracle_core::domain::SignedTransactionBroadcast;
use oracle_core::infrastructure::storage::Storage;
use oracle_core::infrastructure::wallet::MemoryTransaction;

#[tokio::test]
async fn test_conditioned_when_more_signatures_arrive_then_single_survivor_is_signed() {
    let harness = TestOracle::new();
    let first = ConditionedRequestBuilder::default().build();
    let richer = ConditionedRequestBuilder::default().signers(&["alice", "bob", "carol"]).build();

    assert_eq!(harness.send(&inbound("m1", &first, 100)).await, RequestOutcome::Accepted { tasks_created: 1 });
    assert_eq!(harness.send(&inbound("m2", &richer, 101)).await, RequestOutcome::Accepted { tasks_created: 1 });
    assert_eq!(harness.pending_count(), 2);

    let runnable = harness.oracle.tasks(harness.later()).expect("tasks");
    assert_eq!(runnable.len(), 1);

    let report = harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    assert_eq!(report.completed, 1);
    assert_eq!(harness.pending_count(), 0);

    let signed = harness.storage.list_signed_transactions().expect("signed");
    assert_eq!(signed.len(), 1);
    assert_eq!(signed[0].signatures, 4);
    assert_eq!(signed[0].task_id, Some(runnable[0].id));
    let tx = MemoryTransaction::decode(&signed[0].hex_transaction).expect("decode");
    assert!(tx.signatures.contains("oracle"));

    let broadcasts = harness.transport.broadcasts_with_subject(subjects::SIGNED_TRANSACTION);
    assert_eq!(broadcasts.len(), 1);
    let body: SignedTransactionBroadcast = serde_json::from_str(&broadcasts[0].body).expect("broadcast body");
    assert_eq!(body.operation, "sign");
    assert_eq!(body.req_sigs, 3);
}

#[tokio::test]
async fn test_conditioned_when_signature_count_rises_then_max_sigs_tracks_it() {
    let harness = TestOracle::new();
    let unsigned = ConditionedRequestBuilder::default().req_sigs(3).build();
    let three = ConditionedRequestBuilder::default().signers(&["a", "b", "c"]).req_sigs(3).build();
    let four = ConditionedRequestBuilder::default().signers(&["a", "b", "c", "d"]).req_sigs(3).build();

    harness.send(&inbound("m1", &unsigned, 100)).await;
    harness.send(&inbound("m2", &three, 101)).await;
    let tasks = harness.storage.pending_tasks().expect("pending");
    let rqhs_group = tasks[0].filter_field.clone().expect("filter");
    assert!(tasks.iter().all(|task| task.filter_field.as_deref() == Some(rqhs_group.as_str())));

    let handled = harness.storage.get_handled_transaction(&rqhs_from_group(&rqhs_group)).expect("get");
    assert_eq!(handled.map(|h| h.max_sigs), Some(3));

    harness.send(&inbound("m3", &four, 102)).await;
    assert_eq!(harness.storage.signs_for_transaction(&rqhs_from_group(&rqhs_group)).expect("signs"), Some(4));
}

#[tokio::test]
async fn test_conditioned_when_signature_count_is_not_higher_then_superseded() {
    let harness = TestOracle::new();
    let two = ConditionedRequestBuilder::default().signers(&["a", "b"]).build();
    let other_two = ConditionedRequestBuilder::default().signers(&["c", "d"]).build();
    let one = ConditionedRequestBuilder::default().signers(&["a"]).build();

    assert!(matches!(harness.send(&inbound("m1", &two, 100)).await, RequestOutcome::Accepted { .. }));
    assert_eq!(harness.send(&inbound("m2", &other_two, 101)).await, RequestOutcome::Dropped(DropReason::Superseded));
    assert_eq!(harness.send(&inbound("m3", &one, 102)).await, RequestOutcome::Dropped(DropReason::Superseded));
    assert_eq!(harness.pending_count(), 1);
}

#[tokio::test]
async fn test_conditioned_when_condition_is_false_then_group_closes_unsigned() {
    let harness = TestOracle::new();
    let request = ConditionedRequestBuilder::default().signers(&["a", "b"]).condition("sigs > 5").build();
    harness.send(&inbound("m1", &request, 100)).await;

    let report = harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    assert_eq!(report.completed, 1);
    assert_eq!(harness.pending_count(), 0);
    assert!(harness.storage.list_signed_transactions().expect("signed").is_empty());
    assert_eq!(harness.wallet.sign_calls(), 0);
}

#[tokio::test]
async fn test_conditioned_when_threshold_not_reachable_then_task_stays_pending() {
    let harness = TestOracle::new();
    let request = ConditionedRequestBuilder::default().signers(&["a"]).req_sigs(3).build();
    harness.send(&inbound("m1", &request, 100)).await;

    let task = harness.storage.pending_tasks().expect("pending").remove(0);
    assert_eq!(harness.oracle.handle_task(&task).await.expect("task"), TaskOutcome::Pending);
    assert_eq!(harness.pending_count(), 1);
    assert_eq!(harness.wallet.sign_calls(), 0);

    // a fuller copy supersedes and completes the threshold
    let fuller = ConditionedRequestBuilder::default().signers(&["a", "b"]).req_sigs(3).build();
    harness.send(&inbound("m2", &fuller, 101)).await;
    let report = harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    assert_eq!(report.completed, 1);
    assert_eq!(harness.pending_count(), 0);
    assert_eq!(harness.storage.list_signed_transactions().expect("signed")[0].signatures, 3);
}

#[tokio::test]
async fn test_conditioned_when_condition_uses_request_fields_then_evaluated_against_request() {
    let harness = TestOracle::new();
    let request = ConditionedRequestBuilder::default()
        .signers(&["a", "b"])
        .condition("received_time >= 100 and request.req_sigs == 3 and sigs == 2")
        .build();
    harness.send(&inbound("m1", &request, 100)).await;

    harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    assert_eq!(harness.storage.list_signed_transactions().expect("signed").len(), 1);
}

fn rqhs_from_group(group: &str) -> oracle_core::foundation::Rqhs {
    group.trim_start_matches("rqhs:").parse().expect("rqhs")
}

#[tokio::test]
async fn test_conditioned_when_same_request_arrives_concurrently_then_one_task_is_queued() {
    let harness = TestOracle::new();
    let request = ConditionedRequestBuilder::default().signers(&["a", "b"]).build();
    let (m1, m2, m3) = (inbound("m1", &request, 100), inbound("m2", &request, 100), inbound("m3", &request, 100));

    let outcomes = tokio::join!(harness.send(&m1), harness.send(&m2), harness.send(&m3));
    let outcomes = [outcomes.0, outcomes.1, outcomes.2];
    assert_eq!(outcomes.iter().filter(|outcome| matches!(outcome, RequestOutcome::Accepted { tasks_created: 1 })).count(), 1);
    assert_eq!(outcomes.iter().filter(|outcome| **outcome == RequestOutcome::Dropped(DropReason::Superseded)).count(), 2);
    assert_eq!(harness.pending_count(), 1);
}
