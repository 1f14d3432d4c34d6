use crate::fixtures::{payment_template, ConditionedRequestBuilder};
use oracle_core::domain::hashes::request_hash;
use oracle_core::domain::{ConditionedTransactionRequest, TxOutput};

fn request(builder: ConditionedRequestBuilder) -> ConditionedTransactionRequest {
    serde_json::from_value(builder.build()).expect("conditioned request")
}

#[test]
fn test_request_hash_when_only_signatures_differ_then_equal() {
    let unsigned = request(ConditionedRequestBuilder::default());
    let signed = request(ConditionedRequestBuilder::default().signers(&["alice", "bob"]));
    assert_ne!(unsigned.transaction.raw_transaction, signed.transaction.raw_transaction);

    let template = payment_template();
    assert_eq!(request_hash(&unsigned, &template), request_hash(&signed, &template));
}

#[test]
fn test_request_hash_when_pubkeys_reordered_then_equal() {
    let base = request(ConditionedRequestBuilder::default());
    let mut reordered = base.clone();
    reordered.pubkey_list.reverse();
    let template = payment_template();
    assert_eq!(request_hash(&base, &template), request_hash(&reordered, &template));
}

#[test]
fn test_request_hash_when_terms_change_then_differs() {
    let template = payment_template();
    let base = request(ConditionedRequestBuilder::default());
    let base_hash = request_hash(&base, &template);

    let other_condition = request(ConditionedRequestBuilder::default().condition("False"));
    assert_ne!(request_hash(&other_condition, &template), base_hash);

    let other_threshold = request(ConditionedRequestBuilder::default().req_sigs(2));
    assert_ne!(request_hash(&other_threshold, &template), base_hash);

    let mut other_locktime = base.clone();
    other_locktime.locktime = None;
    assert_ne!(request_hash(&other_locktime, &template), base_hash);

    let mut other_outputs = template.clone();
    other_outputs.outputs.push(TxOutput::new("1Extra", 1));
    assert_ne!(request_hash(&base, &other_outputs), base_hash);
}
