use crate::fixtures::{
    inbound, pricecheck_body, test_policy, timelock_body, TestOracle, TEST_GREATER_ADDRESS, TEST_LESSER_ADDRESS, TEST_MAX_RETRIES,
    TEST_PAYEE_ADDRESS, TEST_RETURN_ADDRESS,
};
use async_trait::async_trait;
use oracle_core::application::{DropReason, KeyedLocks, Oracle, OracleContext, RequestOutcome, TaskOutcome};
use oracle_core::domain::{Decimal, Operation, TxOutput};
use oracle_core::foundation::util::time::now_secs;
use oracle_core::infrastructure::evaluator::BasicEvaluator;
use oracle_core::infrastructure::price_feed::PriceFeed;
use oracle_core::infrastructure::storage::{MemoryStorage, Storage};
use oracle_core::infrastructure::transport::MockTransport;
use oracle_core::infrastructure::wallet::{MemoryTransaction, MemoryWallet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Answers a fixed price and records whether the contract lock could be taken meanwhile.
#[derive(Default)]
struct LockAwareFeed {
    locks: OnceLock<Arc<KeyedLocks>>,
    pwtxid: OnceLock<String>,
    lock_was_free: AtomicBool,
}

#[async_trait]
impl PriceFeed for LockAwareFeed {
    async fn last_price(&self) -> oracle_core::foundation::Result<Decimal> {
        if let (Some(locks), Some(pwtxid)) = (self.locks.get(), self.pwtxid.get()) {
            let acquired = tokio::time::timeout(Duration::from_millis(200), locks.lock(pwtxid)).await.is_ok();
            self.lock_was_free.store(acquired, Ordering::SeqCst);
        }
        Decimal::parse("price", "650")
    }
}

#[tokio::test]
async fn test_timelock_when_locktime_reached_then_release_is_signed() {
    let harness = TestOracle::new();
    let locktime = now_secs() + 3_600;
    let outcome = harness.send(&inbound("m1", &timelock_body("m1", locktime), 100)).await;
    assert_eq!(outcome, RequestOutcome::Accepted { tasks_created: 1 });

    let created = harness.created_replies("timelock_created");
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].in_reply_to.as_str(), "m1");
    let pwtxid = created[0].pwtxid.clone();

    let early = harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    assert_eq!(early.dispatched, 0);

    let report = harness.oracle.run_due_tasks(locktime).await.expect("tick");
    assert_eq!(report.completed, 1);
    let locked = harness.storage.get_locked_transaction(&pwtxid).expect("get").expect("locked");
    assert!(locked.done);
    assert_eq!(locked.operation, Operation::TimelockCreate);

    let signed = harness.storage.list_signed_transactions().expect("signed");
    assert_eq!(signed.len(), 1);
    assert_eq!(signed[0].key, pwtxid.to_string());
    let tx = MemoryTransaction::decode(&signed[0].hex_transaction).expect("decode");
    assert_eq!(tx.template.locktime, locktime);
    assert_eq!(tx.template.outputs, vec![TxOutput::new(TEST_PAYEE_ADDRESS, 60_000), TxOutput::new(TEST_RETURN_ADDRESS, 39_000)]);
}

#[tokio::test]
async fn test_timelock_when_same_multisig_requested_twice_then_duplicate_dropped() {
    let harness = TestOracle::new();
    let body = timelock_body("m1", now_secs() + 60);
    harness.send(&inbound("m1", &body, 100)).await;
    assert_eq!(harness.send(&inbound("m2", &body, 101)).await, RequestOutcome::Dropped(DropReason::Duplicate));
    assert_eq!(harness.pending_count(), 1);
    assert_eq!(harness.created_replies("timelock_created").len(), 1);
}

#[tokio::test]
async fn test_timelock_when_outputs_overspend_then_rejected_as_invalid() {
    let harness = TestOracle::new();
    let mut body = timelock_body("m1", 10);
    body["outputs"][0]["value"] = serde_json::json!(500_000);
    let outcome = harness.send(&inbound("m1", &body, 100)).await;
    assert!(matches!(outcome, RequestOutcome::Dropped(DropReason::Invalid(_))));
    assert!(harness.storage.list_locked_transactions().expect("locked").is_empty());
}

#[tokio::test]
async fn test_pricecheck_when_price_above_threshold_then_greater_address_paid() {
    let harness = TestOracle::with_price("650.25");
    harness.send(&inbound("m1", &pricecheck_body("m1", "600", 10, TEST_GREATER_ADDRESS, TEST_LESSER_ADDRESS), 100)).await;

    let report = harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    assert_eq!(report.completed, 1);
    let signed = harness.storage.list_signed_transactions().expect("signed");
    let tx = MemoryTransaction::decode(&signed[0].hex_transaction).expect("decode");
    assert_eq!(tx.template.outputs, vec![TxOutput::new(TEST_GREATER_ADDRESS, 99_000)]);
}

#[tokio::test]
async fn test_pricecheck_when_price_equals_threshold_then_lesser_address_paid() {
    let harness = TestOracle::with_price("600");
    harness.send(&inbound("m1", &pricecheck_body("m1", "600.00", 10, TEST_GREATER_ADDRESS, TEST_LESSER_ADDRESS), 100)).await;

    harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    let signed = harness.storage.list_signed_transactions().expect("signed");
    let tx = MemoryTransaction::decode(&signed[0].hex_transaction).expect("decode");
    assert_eq!(tx.template.outputs, vec![TxOutput::new(TEST_LESSER_ADDRESS, 99_000)]);
}

#[tokio::test]
async fn test_pricecheck_when_feed_keeps_failing_then_parked_after_retry_budget() {
    let harness = TestOracle::new();
    harness.send(&inbound("m1", &pricecheck_body("m1", "600", 10, TEST_GREATER_ADDRESS, TEST_LESSER_ADDRESS), 100)).await;
    let mut task = harness.storage.pending_tasks().expect("pending").remove(0);

    for _ in 0..TEST_MAX_RETRIES {
        match harness.oracle.handle_task(&task).await.expect("task") {
            TaskOutcome::Rescheduled { next_task } => {
                assert!(harness.storage.get_task(task.id).expect("get").expect("task").done);
                task = harness.storage.get_task(next_task).expect("get").expect("next task");
                assert!(task.next_check > now_secs());
            }
            other => panic!("expected reschedule, got {:?}", other),
        }
    }
    assert_eq!(harness.oracle.handle_task(&task).await.expect("task"), TaskOutcome::Parked);

    let stats = harness.storage.task_stats().expect("stats");
    assert_eq!(stats.parked, 1);
    assert_eq!(stats.pending, 0);
    assert_eq!(harness.price_feed.calls(), u64::from(TEST_MAX_RETRIES) + 1);
    assert_eq!(harness.wallet.sign_calls(), 0);
    assert!(harness.oracle.tasks(u64::MAX - 1).expect("tasks").is_empty());
}

#[tokio::test]
async fn test_pricecheck_when_feed_recovers_then_retry_task_releases() {
    let harness = TestOracle::new();
    harness.send(&inbound("m1", &pricecheck_body("m1", "600", 10, TEST_GREATER_ADDRESS, TEST_LESSER_ADDRESS), 100)).await;

    let first = harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    assert_eq!(first.rescheduled, 1);
    let not_yet = harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    assert_eq!(not_yet.dispatched, 0);

    harness.price_feed.set_price(Some(Decimal::parse("price", "500").expect("price")));
    let report = harness.oracle.run_due_tasks(now_secs() + 3_600).await.expect("tick");
    assert_eq!(report.completed, 1);
    assert_eq!(harness.storage.list_signed_transactions().expect("signed").len(), 1);
    assert_eq!(harness.storage.task_stats().expect("stats").pending, 0);
}

#[tokio::test]
async fn test_pricecheck_when_price_is_fetched_then_contract_lock_is_free() {
    let storage = Arc::new(MemoryStorage::new());
    let feed = Arc::new(LockAwareFeed::default());
    let ctx = OracleContext::new(
        test_policy(),
        storage.clone(),
        Arc::new(MemoryWallet::new()),
        Arc::new(MockTransport::new()),
        feed.clone(),
        Arc::new(BasicEvaluator::new()),
    );
    feed.locks.set(ctx.locks.clone()).expect("locks");
    let oracle = Oracle::new(ctx, 4);

    let body = pricecheck_body("m1", "600", 10, TEST_GREATER_ADDRESS, TEST_LESSER_ADDRESS);
    assert_eq!(oracle.handle_message(&inbound("m1", &body, 100)).await.expect("dispatch"), RequestOutcome::Accepted { tasks_created: 1 });
    let pwtxid = storage.list_locked_transactions().expect("locked").remove(0).pwtxid;
    feed.pwtxid.set(pwtxid.to_string()).expect("pwtxid");

    let report = oracle.run_due_tasks(now_secs() + 5).await.expect("tick");
    assert_eq!(report.completed, 1);
    assert!(feed.lock_was_free.load(Ordering::SeqCst));
    assert_eq!(storage.list_signed_transactions().expect("signed").len(), 1);
}

#[tokio::test]
async fn test_locked_release_when_task_runs_concurrently_then_signed_once() {
    let harness = TestOracle::with_price("650");
    let locktime = now_secs() + 3_600;
    harness.send(&inbound("m1", &timelock_body("m1", locktime), 100)).await;
    harness.send(&inbound("m2", &pricecheck_body("m2", "600", 10, TEST_GREATER_ADDRESS, TEST_LESSER_ADDRESS), 100)).await;

    for task in harness.storage.pending_tasks().expect("pending") {
        let (first, second) = tokio::join!(harness.oracle.handle_task(&task), harness.oracle.handle_task(&task));
        assert_eq!(first.expect("first"), TaskOutcome::Completed);
        assert_eq!(second.expect("second"), TaskOutcome::Completed);
    }

    assert_eq!(harness.storage.list_signed_transactions().expect("signed").len(), 2);
    assert!(harness.storage.list_locked_transactions().expect("locked").iter().all(|locked| locked.done));
    assert_eq!(harness.pending_count(), 0);
}
