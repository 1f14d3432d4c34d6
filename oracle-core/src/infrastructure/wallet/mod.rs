//! Wallet backend: multisig address derivation, signature accounting, signing and transaction building.

pub mod bitcoind;
pub mod memory;

pub use bitcoind::BitcoindRpcWallet;
pub use memory::{MemoryTransaction, MemoryWallet};

use crate::domain::{PrevTx, TxInput, TxOutput, TxTemplate};
use crate::foundation::OracleError;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, OracleError>;

#[async_trait]
pub trait Wallet: Send + Sync {
    /// P2SH multisig address for `req_sigs` of `pubkeys`. Deterministic for the same inputs.
    async fn derive_multisig_address(&self, req_sigs: u32, pubkeys: &[String]) -> Result<String>;

    /// Valid signatures already present on a partially signed transaction.
    async fn signatures_number(&self, raw_tx: &str, prevtxs: &[PrevTx]) -> Result<u32>;

    /// Adds the oracle's signature. `private_keys` empty means the backend's own keys.
    async fn sign(&self, raw_tx: &str, prevtxs: &[PrevTx], private_keys: &[String]) -> Result<String>;

    async fn build_raw_transaction(&self, inputs: &[TxInput], outputs: &[TxOutput], locktime: u64) -> Result<String>;

    /// Signature-independent structure of a raw transaction.
    async fn decode_transaction(&self, raw_tx: &str) -> Result<TxTemplate>;
}
