#![allow(dead_code)]

use async_trait::async_trait;
use oracle_core::application::{Oracle, OracleContext};
use oracle_core::domain::{EnginePolicy, InboundMessage, PrevTx, TxInput, TxOutput, TxTemplate};
use oracle_core::foundation::{MessageId, OracleError};
use oracle_core::infrastructure::evaluator::BasicEvaluator;
use oracle_core::infrastructure::price_feed::StaticPriceFeed;
use oracle_core::infrastructure::storage::MemoryStorage;
use oracle_core::infrastructure::transport::MockTransport;
use oracle_core::infrastructure::wallet::{MemoryWallet, Wallet};
use oracle_service::service::Metrics;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const PREV_TXID: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";
pub const PUBKEYS: [&str; 2] = [
    "02a1633cafcc01ebfb6d78e39f687a1f0995c62fc95f51ead10a02ee0be551b5dc",
    "03b5c2e7c9c3f0b1d8d8f6a3a0f8f8d6e0c1b2a3948576a6b7c8d9e0f1a2b3c4d5",
];

/// Wallet whose node is unreachable; every call fails transiently.
pub struct OfflineWallet;

fn offline(method: &str) -> OracleError {
    OracleError::wallet(method, "connection refused")
}

#[async_trait]
impl Wallet for OfflineWallet {
    async fn derive_multisig_address(&self, _req_sigs: u32, _pubkeys: &[String]) -> Result<String, OracleError> {
        Err(offline("createmultisig"))
    }

    async fn signatures_number(&self, _raw_tx: &str, _prevtxs: &[PrevTx]) -> Result<u32, OracleError> {
        Err(offline("signaturesnumber"))
    }

    async fn sign(&self, _raw_tx: &str, _prevtxs: &[PrevTx], _private_keys: &[String]) -> Result<String, OracleError> {
        Err(offline("signrawtransaction"))
    }

    async fn build_raw_transaction(&self, _inputs: &[TxInput], _outputs: &[TxOutput], _locktime: u64) -> Result<String, OracleError> {
        Err(offline("createrawtransaction"))
    }

    async fn decode_transaction(&self, _raw_tx: &str) -> Result<TxTemplate, OracleError> {
        Err(offline("decoderawtransaction"))
    }
}

pub struct ServiceHarness {
    pub oracle: Arc<Oracle>,
    pub metrics: Arc<Metrics>,
    pub storage: Arc<MemoryStorage>,
    pub transport: Arc<MockTransport>,
}

impl ServiceHarness {
    pub fn new() -> Self {
        Self::with_wallet(Arc::new(MemoryWallet::new()))
    }

    pub fn with_wallet(wallet: Arc<dyn Wallet>) -> Self {
        let storage = Arc::new(MemoryStorage::new());
        let transport = Arc::new(MockTransport::new());
        let policy = EnginePolicy { private_keys: vec!["oracle".to_string()], external_call_timeout: Duration::from_secs(5), ..EnginePolicy::default() };
        let ctx = OracleContext::new(
            policy,
            storage.clone(),
            wallet,
            transport.clone(),
            Arc::new(StaticPriceFeed::default()),
            Arc::new(BasicEvaluator::new()),
        );
        Self {
            oracle: Arc::new(Oracle::new(ctx, 2)),
            metrics: Arc::new(Metrics::new().expect("metrics")),
            storage,
            transport,
        }
    }

    pub fn deliver(&self, message_id: &str, body: &Value) {
        self.transport.push_inbound(InboundMessage {
            message_id: MessageId::from(message_id),
            from_address: "BM-2cServiceClient".to_string(),
            to_address: "BM-2cServiceOracle".to_string(),
            received_time: 1_700_000_000,
            subject: "oracle request".to_string(),
            body: body.to_string(),
            direct: false,
        });
    }
}

/// A 2-of-2 conditioned request carrying one client signature.
pub fn conditioned_request() -> Value {
    let template = TxTemplate {
        inputs: vec![TxInput { txid: PREV_TXID.to_string(), vout: 0 }],
        outputs: vec![TxOutput::new("1BoatSLRHtKNngkdXEeobR76b53LETtpyT", 90_000)],
        locktime: 0,
    };
    let raw = MemoryWallet::partially_signed(template, &["client"]).expect("raw transaction");
    json!({
        "operation": "conditioned_transaction",
        "transaction": {
            "raw_transaction": raw,
            "prevtx": [{"txid": PREV_TXID, "vout": 0, "scriptPubKey": "a914f815b036d9bbbce5e9f2a00abd1bf3dc91e9551087"}],
        },
        "locktime": 0,
        "pubkey_list": PUBKEYS,
        "req_sigs": 2,
        "condition": "True",
    })
}
