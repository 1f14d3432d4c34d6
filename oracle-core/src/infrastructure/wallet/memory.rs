use super::{Result, Wallet};
use crate::domain::{PrevTx, TxInput, TxOutput, TxTemplate};
use crate::foundation::OracleError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

const WALLET_SIGNER: &str = "wallet";

/// Raw transaction format of [`MemoryWallet`]: hex-encoded JSON of the template plus a signer set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTransaction {
    pub template: TxTemplate,
    pub signatures: BTreeSet<String>,
}

impl MemoryTransaction {
    pub fn encode(&self) -> Result<String> {
        Ok(hex::encode(serde_json::to_vec(self)?))
    }

    pub fn decode(raw_tx: &str) -> Result<Self> {
        let bytes = hex::decode(raw_tx.trim()).map_err(|err| OracleError::InvalidTransaction(format!("not hex: {}", err)))?;
        serde_json::from_slice(&bytes).map_err(|err| OracleError::InvalidTransaction(format!("not a wallet transaction: {}", err)))
    }
}

/// Deterministic in-process wallet. A signature is the signer's key name; counting is set size.
#[derive(Default)]
pub struct MemoryWallet {
    sign_calls: AtomicU64,
}

impl MemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a raw transaction already carrying signatures from `signers`.
    pub fn partially_signed(template: TxTemplate, signers: &[&str]) -> Result<String> {
        MemoryTransaction { template, signatures: signers.iter().map(|s| s.to_string()).collect() }.encode()
    }

    pub fn sign_calls(&self) -> u64 {
        self.sign_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Wallet for MemoryWallet {
    async fn derive_multisig_address(&self, req_sigs: u32, pubkeys: &[String]) -> Result<String> {
        if req_sigs == 0 || req_sigs as usize > pubkeys.len() {
            return Err(OracleError::InvalidTransaction(format!("cannot build {}-of-{} multisig", req_sigs, pubkeys.len())));
        }
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"memory-wallet:multisig:");
        hasher.update(&req_sigs.to_le_bytes());
        for pubkey in pubkeys {
            hasher.update(&(pubkey.len() as u32).to_le_bytes());
            hasher.update(pubkey.as_bytes());
        }
        let digest = hasher.finalize().to_hex();
        Ok(format!("3{}", &digest.as_str()[..33]))
    }

    async fn signatures_number(&self, raw_tx: &str, _prevtxs: &[PrevTx]) -> Result<u32> {
        let tx = MemoryTransaction::decode(raw_tx)?;
        Ok(tx.signatures.len() as u32)
    }

    async fn sign(&self, raw_tx: &str, _prevtxs: &[PrevTx], private_keys: &[String]) -> Result<String> {
        self.sign_calls.fetch_add(1, Ordering::Relaxed);
        let mut tx = MemoryTransaction::decode(raw_tx)?;
        if private_keys.is_empty() {
            tx.signatures.insert(WALLET_SIGNER.to_string());
        } else {
            tx.signatures.extend(private_keys.iter().cloned());
        }
        tx.encode()
    }

    async fn build_raw_transaction(&self, inputs: &[TxInput], outputs: &[TxOutput], locktime: u64) -> Result<String> {
        if inputs.is_empty() || outputs.is_empty() {
            return Err(OracleError::InvalidTransaction("transaction needs inputs and outputs".to_string()));
        }
        // same rule as createrawtransaction
        let mut seen = BTreeSet::new();
        if let Some(duplicate) = outputs.iter().find(|output| !seen.insert(output.address.as_str())) {
            return Err(OracleError::wallet("createrawtransaction", format!("duplicated address: {}", duplicate.address)));
        }
        MemoryTransaction {
            template: TxTemplate { inputs: inputs.to_vec(), outputs: outputs.to_vec(), locktime },
            signatures: BTreeSet::new(),
        }
        .encode()
    }

    async fn decode_transaction(&self, raw_tx: &str) -> Result<TxTemplate> {
        Ok(MemoryTransaction::decode(raw_tx)?.template)
    }
}
