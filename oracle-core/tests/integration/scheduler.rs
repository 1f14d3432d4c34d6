use crate::fixtures::{inbound, timelock_body, ConditionedRequestBuilder, TestOracle};
use oracle_core::application::scheduler::{execute, TaskRun};
use oracle_core::application::TaskOutcome;
use oracle_core::domain::{NewTask, Operation};
use oracle_core::foundation::util::time::now_secs;
use oracle_core::infrastructure::storage::Storage;
use serde_json::json;

#[tokio::test]
async fn test_scheduler_when_condition_cannot_be_evaluated_then_task_is_parked() {
    let harness = TestOracle::new();
    let request = ConditionedRequestBuilder::default().signers(&["a", "b"]).condition("request.missing == 1").build();
    harness.send(&inbound("m1", &request, 100)).await;

    let report = harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    assert_eq!(report.parked, 1);
    let stats = harness.storage.task_stats().expect("stats");
    assert_eq!((stats.pending, stats.parked), (0, 1));
    assert_eq!(harness.wallet.sign_calls(), 0);

    let again = harness.oracle.run_due_tasks(u64::MAX - 1).await.expect("tick");
    assert_eq!(again.dispatched, 0);
}

#[tokio::test]
async fn test_scheduler_when_payload_is_corrupt_then_task_is_parked() {
    let harness = TestOracle::new();
    let task = harness
        .storage
        .enqueue_task(NewTask::new(Operation::BountyRedeem, &json!({"unexpected": true}), 0).expect("task"))
        .expect("enqueue");

    assert_eq!(execute(harness.oracle.context(), &task).await, TaskRun::Finished(TaskOutcome::Parked));
    assert!(harness.storage.get_task(task.id).expect("get").expect("task").is_parked());
}

#[tokio::test]
async fn test_scheduler_when_contract_record_missing_then_task_is_parked() {
    let harness = TestOracle::new();
    let task = harness
        .storage
        .enqueue_task(NewTask::new(Operation::TimelockCreate, &json!({"pwtxid": "3gone", "raw_transaction": "00"}), 0).expect("task"))
        .expect("enqueue");

    let report = harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    assert_eq!(report.parked, 1);
    assert!(harness.storage.get_task(task.id).expect("get").expect("task").is_parked());
}

#[tokio::test]
async fn test_scheduler_when_many_contracts_due_then_all_run_in_one_tick() {
    let harness = TestOracle::new();
    let locktime = now_secs() + 100;
    for index in 0..3u32 {
        let mut body = timelock_body(&format!("m{}", index), locktime);
        body["prevtxs"][0]["vout"] = json!(index);
        // distinct multisig sets give distinct contracts
        body["pubkey_list"][1] = json!(format!("03{:064x}", index));
        harness.send(&inbound(&format!("m{}", index), &body, 100)).await;
    }
    assert_eq!(harness.pending_count(), 3);

    let report = harness.oracle.run_due_tasks(locktime).await.expect("tick");
    assert_eq!((report.dispatched, report.completed), (3, 3));
    assert_eq!(harness.storage.list_signed_transactions().expect("signed").len(), 3);
}

#[tokio::test]
async fn test_scheduler_when_broadcast_fails_then_signing_still_completes() {
    let harness = TestOracle::new();
    harness.transport.set_fail_sends(true);
    let request = ConditionedRequestBuilder::default().signers(&["a", "b"]).build();
    harness.send(&inbound("m1", &request, 100)).await;

    let report = harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    assert_eq!(report.completed, 1);
    assert_eq!(harness.storage.list_signed_transactions().expect("signed").len(), 1);
    assert!(harness.transport.broadcasts().is_empty());
}
