use crate::fixtures::{bounty_body, timelock_body, TEST_CLAIMANT_EARLY, TEST_ORACLE_FEE_ADDRESS, TEST_PASSWORD, TEST_PAYEE_ADDRESS, TEST_RETURN_ADDRESS};
use oracle_core::domain::payout::{bounty_outputs, locked_outputs};
use oracle_core::domain::{BountyCreateRequest, BtcAmount, TimelockCreateRequest, TxOutput};
use oracle_core::foundation::ErrorCode;

fn bounty() -> BountyCreateRequest {
    serde_json::from_value(bounty_body("m1", TEST_PASSWORD, None, TEST_ORACLE_FEE_ADDRESS)).expect("bounty request")
}

#[test]
fn test_bounty_outputs_when_claimed_then_fees_are_paid_after_claimant() {
    let outputs = bounty_outputs(&bounty(), TEST_CLAIMANT_EARLY).expect("outputs");
    assert_eq!(outputs, vec![TxOutput::new(TEST_CLAIMANT_EARLY, 85_000), TxOutput::new(TEST_ORACLE_FEE_ADDRESS, 5_000)]);
}

#[test]
fn test_bounty_outputs_when_claimant_is_fee_address_then_outputs_are_merged() {
    let outputs = bounty_outputs(&bounty(), TEST_ORACLE_FEE_ADDRESS).expect("outputs");
    assert_eq!(outputs, vec![TxOutput::new(TEST_ORACLE_FEE_ADDRESS, 90_000)]);
}

#[test]
fn test_bounty_outputs_when_fees_exceed_sum_then_invalid_amount() {
    let mut request = bounty();
    request.miners_fee = BtcAmount::from_satoshi(95_000);
    let err = bounty_outputs(&request, TEST_CLAIMANT_EARLY).expect_err("overspend");
    assert_eq!(err.code(), ErrorCode::InvalidAmount);

    request.miners_fee = BtcAmount::from_satoshi(95_000 - 1);
    assert_eq!(bounty_outputs(&request, TEST_CLAIMANT_EARLY).expect("outputs")[0].amount_satoshi, 1);
}

#[test]
fn test_locked_outputs_when_timelock_then_change_returns() {
    let request: TimelockCreateRequest = serde_json::from_value(timelock_body("m1", 10)).expect("timelock request");
    let outputs = locked_outputs(&request.funds, &request.return_address).expect("outputs");
    assert_eq!(outputs, vec![TxOutput::new(TEST_PAYEE_ADDRESS, 60_000), TxOutput::new(TEST_RETURN_ADDRESS, 39_000)]);
}

#[test]
fn test_locked_outputs_when_exactly_spent_then_no_change_output() {
    let mut request: TimelockCreateRequest = serde_json::from_value(timelock_body("m1", 10)).expect("timelock request");
    request.funds.outputs[0].value = 99_000;
    let outputs = locked_outputs(&request.funds, &request.return_address).expect("outputs");
    assert_eq!(outputs, vec![TxOutput::new(TEST_PAYEE_ADDRESS, 99_000)]);
}
