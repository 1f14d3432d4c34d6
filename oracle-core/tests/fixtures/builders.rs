#![allow(dead_code)]

use crate::fixtures::{TEST_PAYEE_ADDRESS, TEST_PREV_TXID, TEST_PUBKEYS, TEST_RETURN_ADDRESS};
use oracle_core::domain::blind::sha256_hex;
use oracle_core::domain::{InboundMessage, TxInput, TxOutput, TxTemplate};
use oracle_core::foundation::MessageId;
use oracle_core::infrastructure::wallet::MemoryWallet;
use serde_json::{json, Value};

pub fn pubkeys(count: usize) -> Vec<String> {
    TEST_PUBKEYS.iter().take(count).map(|key| key.to_string()).collect()
}

pub fn prevtx_json(vout: u32) -> Value {
    json!({"txid": TEST_PREV_TXID, "vout": vout, "scriptPubKey": "a914f815b036d9bbbce5e9f2a00abd1bf3dc91e9551087"})
}

pub fn payment_template() -> TxTemplate {
    TxTemplate {
        inputs: vec![TxInput { txid: TEST_PREV_TXID.to_string(), vout: 0 }],
        outputs: vec![TxOutput::new(TEST_PAYEE_ADDRESS, 90_000)],
        locktime: 0,
    }
}

pub fn inbound(message_id: &str, body: &Value, received_time: u64) -> InboundMessage {
    InboundMessage {
        message_id: MessageId::from(message_id),
        from_address: "BM-2cTestClient".to_string(),
        to_address: "BM-2cTestOracle".to_string(),
        received_time,
        subject: "oracle request".to_string(),
        body: body.to_string(),
        direct: false,
    }
}

/// Conditioned request over [`payment_template`] carrying signatures from `signers`.
pub struct ConditionedRequestBuilder {
    signers: Vec<String>,
    condition: String,
    req_sigs: u32,
    pubkey_count: usize,
}

impl Default for ConditionedRequestBuilder {
    fn default() -> Self {
        Self { signers: Vec::new(), condition: "True".to_string(), req_sigs: 3, pubkey_count: 3 }
    }
}

impl ConditionedRequestBuilder {
    pub fn signers(mut self, signers: &[&str]) -> Self {
        self.signers = signers.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    pub fn req_sigs(mut self, req_sigs: u32) -> Self {
        self.req_sigs = req_sigs;
        self
    }

    pub fn build(self) -> Value {
        let signers: Vec<&str> = self.signers.iter().map(String::as_str).collect();
        let raw = MemoryWallet::partially_signed(payment_template(), &signers).expect("raw transaction");
        json!({
            "operation": "conditioned_transaction",
            "transaction": {"raw_transaction": raw, "prevtx": [prevtx_json(0)]},
            "locktime": 0,
            "pubkey_list": pubkeys(self.pubkey_count),
            "req_sigs": self.req_sigs,
            "condition": self.condition,
        })
    }
}

pub fn timelock_body(message_id: &str, locktime: u64) -> Value {
    json!({
        "operation": "timelock_create",
        "message_id": message_id,
        "sum_satoshi": 100_000,
        "prevtxs": [prevtx_json(0)],
        "outputs": [{"address": TEST_PAYEE_ADDRESS, "value": 60_000}],
        "miners_fee_satoshi": 1_000,
        "return_address": TEST_RETURN_ADDRESS,
        "locktime": locktime,
        "pubkey_list": pubkeys(2),
        "req_sigs": 2,
    })
}

pub fn pricecheck_body(message_id: &str, price: &str, locktime: u64, greater: &str, lesser: &str) -> Value {
    json!({
        "operation": "pricecheck_create",
        "message_id": message_id,
        "sum_satoshi": 100_000,
        "prevtxs": [prevtx_json(1)],
        "outputs": [],
        "miners_fee_satoshi": 1_000,
        "return_if_greater": greater,
        "return_if_lesser": lesser,
        "price": price,
        "locktime": locktime,
        "pubkey_list": pubkeys(3),
        "req_sigs": 2,
    })
}

pub fn bounty_body(message_id: &str, password: &str, locktime: Option<u64>, fee_address: &str) -> Value {
    json!({
        "operation": "bounty_create",
        "prevtx": [prevtx_json(2)],
        "locktime": locktime,
        "message_id": message_id,
        "sum_amount": "0.001",
        "miners_fee": "0.0001",
        "oracle_fees": {fee_address: "0.00005"},
        "pubkey_list": pubkeys(2),
        "req_sigs": 1,
        "password_hash": sha256_hex(password.as_bytes()),
        "return_address": TEST_RETURN_ADDRESS,
    })
}

pub fn redeem_body(pwtxid: &str, passwords: Value) -> Value {
    json!({"operation": "bounty_redeem", "pwtxid": pwtxid, "passwords": passwords})
}
