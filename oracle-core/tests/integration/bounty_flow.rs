use crate::fixtures::{
    bounty_body, inbound, redeem_body, TestOracle, TEST_CLAIMANT_EARLY, TEST_CLAIMANT_LATE, TEST_ORACLE_FEE_ADDRESS, TEST_PASSWORD,
    TEST_RETURN_ADDRESS,
};
use oracle_core::application::{DropReason, RequestOutcome, TaskOutcome};
use oracle_core::domain::blind::{encrypt_guess, Guess, RsaPublicKeyData};
use oracle_core::domain::{SentKind, SignedTransaction, TxOutput};
use oracle_core::foundation::util::time::now_secs;
use oracle_core::foundation::Pwtxid;
use oracle_core::infrastructure::storage::Storage;
use oracle_core::infrastructure::wallet::MemoryTransaction;
use serde_json::json;

const FAR_FUTURE: u64 = 4_000_000_000;

async fn create_bounty(harness: &TestOracle, locktime: Option<u64>) -> (Pwtxid, RsaPublicKeyData) {
    let outcome = harness.send(&inbound("create-1", &bounty_body("create-1", TEST_PASSWORD, locktime, TEST_ORACLE_FEE_ADDRESS), 50)).await;
    assert!(matches!(outcome, RequestOutcome::Accepted { .. }), "{:?}", outcome);
    let created = harness.created_replies("bounty_created");
    let pwtxid = created[0].pwtxid.clone();
    let public = harness.bounty_public_key(&pwtxid);
    (pwtxid, public)
}

fn guess_body(pwtxid: &Pwtxid, public: &RsaPublicKeyData, password: &str, address: &str) -> serde_json::Value {
    let ciphertext = encrypt_guess(public, &Guess { password: password.to_string(), address: address.to_string() }).expect("encrypt");
    let key_hash = public.key_hash().expect("key hash");
    redeem_body(pwtxid.as_str(), json!({ key_hash.as_str(): ciphertext }))
}

#[tokio::test]
async fn test_bounty_create_when_accepted_then_public_key_is_broadcast_and_stored() {
    let harness = TestOracle::new();
    let (pwtxid, public) = create_bounty(&harness, Some(FAR_FUTURE)).await;

    let record = harness.storage.get_rsa_keypair(&pwtxid).expect("get").expect("keypair");
    assert_eq!(record.key_hash, public.key_hash().expect("key hash"));
    let locked = harness.storage.get_locked_transaction(&pwtxid).expect("get").expect("locked");
    assert!(!locked.done);
    let stored: serde_json::Value = serde_json::from_str(&locked.request_json).expect("json");
    assert_eq!(stored["rsa_pubkey"], serde_json::to_value(&public).expect("value"));
    assert_eq!(harness.pending_count(), 1);

    let again = harness.send(&inbound("create-2", &bounty_body("create-2", TEST_PASSWORD, Some(FAR_FUTURE), TEST_ORACLE_FEE_ADDRESS), 60)).await;
    assert_eq!(again, RequestOutcome::Dropped(DropReason::Duplicate));
    assert_eq!(harness.created_replies("bounty_created").len(), 1);
}

#[tokio::test]
async fn test_bounty_create_when_no_locktime_then_no_expiry_task() {
    let harness = TestOracle::new();
    let outcome = harness.send(&inbound("create-1", &bounty_body("create-1", TEST_PASSWORD, None, TEST_ORACLE_FEE_ADDRESS), 50)).await;
    assert_eq!(outcome, RequestOutcome::Accepted { tasks_created: 0 });
    assert_eq!(harness.pending_count(), 0);
}

#[tokio::test]
async fn test_bounty_create_when_password_hash_malformed_then_rejected() {
    let harness = TestOracle::new();
    let mut body = bounty_body("create-1", TEST_PASSWORD, None, TEST_ORACLE_FEE_ADDRESS);
    body["password_hash"] = json!("not-a-hash");
    let outcome = harness.send(&inbound("create-1", &body, 50)).await;
    assert!(matches!(outcome, RequestOutcome::Dropped(DropReason::Invalid(_))));
    assert!(harness.storage.list_locked_transactions().expect("locked").is_empty());
}

#[tokio::test]
async fn test_bounty_create_when_same_bounty_arrives_concurrently_then_one_is_stored() {
    let harness = TestOracle::new();
    let first = inbound("create-1", &bounty_body("create-1", TEST_PASSWORD, Some(FAR_FUTURE), TEST_ORACLE_FEE_ADDRESS), 50);
    let second = inbound("create-2", &bounty_body("create-2", TEST_PASSWORD, Some(FAR_FUTURE), TEST_ORACLE_FEE_ADDRESS), 51);

    let (a, b) = tokio::join!(harness.send(&first), harness.send(&second));
    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|outcome| matches!(outcome, RequestOutcome::Accepted { tasks_created: 1 })).count(), 1);
    assert_eq!(outcomes.iter().filter(|outcome| **outcome == RequestOutcome::Dropped(DropReason::Duplicate)).count(), 1);

    assert_eq!(harness.storage.list_locked_transactions().expect("locked").len(), 1);
    assert_eq!(harness.created_replies("bounty_created").len(), 1);
    assert_eq!(harness.pending_count(), 1);
    let pwtxid = harness.created_replies("bounty_created")[0].pwtxid.clone();
    let stored = harness.storage.get_rsa_keypair(&pwtxid).expect("get").expect("keypair");
    assert_eq!(stored.key_hash, harness.bounty_public_key(&pwtxid).key_hash().expect("key hash"));
}

#[tokio::test]
async fn test_bounty_redeem_when_two_right_guesses_then_earliest_received_wins() {
    let harness = TestOracle::new();
    let (pwtxid, public) = create_bounty(&harness, Some(FAR_FUTURE)).await;

    let late = guess_body(&pwtxid, &public, TEST_PASSWORD, TEST_CLAIMANT_LATE);
    let early = guess_body(&pwtxid, &public, TEST_PASSWORD, TEST_CLAIMANT_EARLY);
    assert_eq!(harness.send(&inbound("guess-late", &late, 1_000)).await, RequestOutcome::Accepted { tasks_created: 1 });
    assert_eq!(harness.send(&inbound("guess-early", &early, 800)).await, RequestOutcome::Accepted { tasks_created: 1 });

    let runnable = harness.oracle.tasks(harness.later()).expect("tasks");
    assert_eq!(runnable.len(), 1);

    let report = harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    assert_eq!(report.completed, 1);

    let sent = harness.storage.list_sent_transactions().expect("sent");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, SentKind::Payout);
    assert_eq!(sent[0].recipient, TEST_CLAIMANT_EARLY);
    let tx = MemoryTransaction::decode(&sent[0].tx).expect("decode");
    assert_eq!(tx.template.outputs, vec![TxOutput::new(TEST_CLAIMANT_EARLY, 85_000), TxOutput::new(TEST_ORACLE_FEE_ADDRESS, 5_000)]);
    assert_eq!(tx.template.locktime, 0);

    assert!(harness.storage.get_locked_transaction(&pwtxid).expect("get").expect("locked").done);
    assert_eq!(harness.storage.list_right_guesses(&pwtxid).expect("guesses").len(), 2);
    // only the far-future expiry task is left
    let pending = harness.storage.pending_tasks().expect("pending");
    assert_eq!(pending.len(), 1);
    assert!(pending[0].filter_field.is_none());
}

#[tokio::test]
async fn test_bounty_redeem_when_earliest_guess_parked_then_later_guess_wins() {
    let harness = TestOracle::new();
    let (pwtxid, public) = create_bounty(&harness, None).await;
    let early = guess_body(&pwtxid, &public, TEST_PASSWORD, TEST_CLAIMANT_EARLY);
    let late = guess_body(&pwtxid, &public, TEST_PASSWORD, TEST_CLAIMANT_LATE);
    harness.send(&inbound("guess-early", &early, 800)).await;
    harness.send(&inbound("guess-late", &late, 1_000)).await;

    let earliest = harness
        .storage
        .pending_tasks()
        .expect("pending")
        .into_iter()
        .filter(|task| task.filter_field.is_some())
        .min_by_key(|task| task.id)
        .expect("guess task");
    assert!(harness.storage.park_task(earliest.id).expect("park"));

    let runnable = harness.oracle.tasks(harness.later()).expect("tasks");
    assert_eq!(runnable.len(), 1);
    assert_ne!(runnable[0].id, earliest.id);

    let report = harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    assert_eq!(report.completed, 1);
    let sent = harness.storage.list_sent_transactions().expect("sent");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, TEST_CLAIMANT_LATE);
}

#[tokio::test]
async fn test_bounty_redeem_when_claimant_is_fee_address_then_single_output_paid() {
    let harness = TestOracle::new();
    let (pwtxid, public) = create_bounty(&harness, None).await;
    let guess = guess_body(&pwtxid, &public, TEST_PASSWORD, TEST_ORACLE_FEE_ADDRESS);
    assert_eq!(harness.send(&inbound("guess-1", &guess, 800)).await, RequestOutcome::Accepted { tasks_created: 1 });

    let report = harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    assert_eq!(report.completed, 1);
    let sent = harness.storage.list_sent_transactions().expect("sent");
    assert_eq!(sent.len(), 1);
    let tx = MemoryTransaction::decode(&sent[0].tx).expect("decode");
    assert_eq!(tx.template.outputs, vec![TxOutput::new(TEST_ORACLE_FEE_ADDRESS, 90_000)]);
    assert!(harness.storage.get_locked_transaction(&pwtxid).expect("get").expect("locked").done);
}

#[tokio::test]
async fn test_bounty_redeem_when_winner_runs_twice_then_payout_recorded_once() {
    let harness = TestOracle::new();
    let (pwtxid, public) = create_bounty(&harness, None).await;
    harness.send(&inbound("guess-1", &guess_body(&pwtxid, &public, TEST_PASSWORD, TEST_CLAIMANT_EARLY), 800)).await;
    let winner = harness.oracle.tasks(harness.later()).expect("tasks").into_iter().find(|task| task.filter_field.is_some()).expect("guess task");

    assert_eq!(harness.oracle.handle_task(&winner).await.expect("run"), TaskOutcome::Completed);
    assert_eq!(harness.oracle.handle_task(&winner).await.expect("rerun"), TaskOutcome::Completed);
    assert_eq!(harness.storage.list_sent_transactions().expect("sent").len(), 1);
}

#[tokio::test]
async fn test_bounty_redeem_when_payout_signed_before_restart_then_signed_hex_is_recorded() {
    let harness = TestOracle::new();
    let (pwtxid, public) = create_bounty(&harness, None).await;
    harness.send(&inbound("guess-1", &guess_body(&pwtxid, &public, TEST_PASSWORD, TEST_CLAIMANT_EARLY), 800)).await;
    let winner = harness.oracle.tasks(harness.later()).expect("tasks").into_iter().find(|task| task.filter_field.is_some()).expect("guess task");
    harness
        .storage
        .insert_signed_transaction(SignedTransaction {
            key: pwtxid.to_string(),
            task_id: Some(winner.id),
            hex_transaction: "feed".to_string(),
            prevtxs: Vec::new(),
            signatures: 2,
            created_at: 1,
        })
        .expect("signed");
    let sign_calls = harness.wallet.sign_calls();

    let report = harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    assert_eq!(report.completed, 1);
    assert_eq!(harness.wallet.sign_calls(), sign_calls);
    let sent = harness.storage.list_sent_transactions().expect("sent");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].tx, "feed");
    assert!(harness.storage.get_locked_transaction(&pwtxid).expect("get").expect("locked").done);
}

#[tokio::test]
async fn test_bounty_redeem_when_bounty_closed_then_guess_recorded_without_task() {
    let harness = TestOracle::new();
    let (pwtxid, public) = create_bounty(&harness, None).await;
    harness.send(&inbound("guess-1", &guess_body(&pwtxid, &public, TEST_PASSWORD, TEST_CLAIMANT_EARLY), 800)).await;
    harness.oracle.run_due_tasks(harness.later()).await.expect("tick");
    assert!(harness.storage.get_locked_transaction(&pwtxid).expect("get").expect("locked").done);

    let outcome = harness.send(&inbound("guess-2", &guess_body(&pwtxid, &public, TEST_PASSWORD, TEST_CLAIMANT_LATE), 900)).await;
    assert_eq!(outcome, RequestOutcome::Accepted { tasks_created: 0 });
    assert_eq!(harness.storage.list_right_guesses(&pwtxid).expect("guesses").len(), 2);
    assert_eq!(harness.pending_count(), 0);
    assert_eq!(harness.storage.list_sent_transactions().expect("sent").len(), 1);
}

#[tokio::test]
async fn test_bounty_redeem_when_guess_is_wrong_or_unknown_then_dropped() {
    let harness = TestOracle::new();
    let (pwtxid, public) = create_bounty(&harness, None).await;

    let wrong = guess_body(&pwtxid, &public, "hunter2", TEST_CLAIMANT_EARLY);
    assert_eq!(harness.send(&inbound("guess-1", &wrong, 800)).await, RequestOutcome::Dropped(DropReason::NoValidGuess));

    let unknown = guess_body(&Pwtxid::from("3Unknown"), &public, TEST_PASSWORD, TEST_CLAIMANT_EARLY);
    assert_eq!(harness.send(&inbound("guess-2", &unknown, 800)).await, RequestOutcome::Dropped(DropReason::UnknownContract));

    let garbage = redeem_body(pwtxid.as_str(), json!({"somebody-else": "AAAA"}));
    assert_eq!(harness.send(&inbound("guess-3", &garbage, 800)).await, RequestOutcome::Dropped(DropReason::NoValidGuess));
    assert!(harness.storage.list_right_guesses(&pwtxid).expect("guesses").is_empty());
}

#[tokio::test]
async fn test_bounty_redeem_when_same_message_replayed_then_recorded_once() {
    let harness = TestOracle::new();
    let (pwtxid, public) = create_bounty(&harness, None).await;
    let message = inbound("guess-1", &guess_body(&pwtxid, &public, TEST_PASSWORD, TEST_CLAIMANT_EARLY), 800);

    assert_eq!(harness.send(&message).await, RequestOutcome::Accepted { tasks_created: 1 });
    assert_eq!(harness.send(&message).await, RequestOutcome::Dropped(DropReason::NoValidGuess));
    assert_eq!(harness.pending_count(), 1);
}

#[tokio::test]
async fn test_bounty_expiry_when_unclaimed_then_refunded_to_return_address() {
    let harness = TestOracle::new();
    let locktime = now_secs() + 600;
    let (pwtxid, _) = create_bounty(&harness, Some(locktime)).await;

    let report = harness.oracle.run_due_tasks(locktime).await.expect("tick");
    assert_eq!(report.completed, 1);

    let sent = harness.storage.list_sent_transactions().expect("sent");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, SentKind::Refund);
    assert_eq!(sent[0].recipient, TEST_RETURN_ADDRESS);
    let tx = MemoryTransaction::decode(&sent[0].tx).expect("decode");
    assert_eq!(tx.template.outputs[0], TxOutput::new(TEST_RETURN_ADDRESS, 85_000));
    assert_eq!(tx.template.locktime, locktime);
    assert!(harness.storage.get_locked_transaction(&pwtxid).expect("get").expect("locked").done);
}

#[tokio::test]
async fn test_bounty_expiry_when_already_paid_out_then_no_refund() {
    let harness = TestOracle::new();
    let locktime = now_secs() + 600;
    let (pwtxid, public) = create_bounty(&harness, Some(locktime)).await;
    harness.send(&inbound("guess-1", &guess_body(&pwtxid, &public, TEST_PASSWORD, TEST_CLAIMANT_EARLY), 800)).await;
    harness.oracle.run_due_tasks(harness.later()).await.expect("tick");

    let report = harness.oracle.run_due_tasks(locktime).await.expect("tick");
    assert_eq!(report.completed, 1);
    let sent = harness.storage.list_sent_transactions().expect("sent");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, SentKind::Payout);
    assert_eq!(harness.pending_count(), 0);
}
