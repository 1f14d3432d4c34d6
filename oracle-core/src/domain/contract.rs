//! Typed request bodies, one per operation.

use crate::domain::amount::{BtcAmount, Decimal};
use crate::domain::transaction::PrevTx;
use crate::foundation::{MessageId, Pwtxid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOutput {
    pub address: String,
    pub value: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialTransaction {
    pub raw_transaction: String,
    #[serde(alias = "prevtxs", default)]
    pub prevtx: Vec<PrevTx>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionedTransactionRequest {
    pub transaction: PartialTransaction,
    #[serde(default)]
    pub locktime: Option<u64>,
    pub pubkey_list: Vec<String>,
    pub req_sigs: u32,
    pub condition: String,
    #[serde(default)]
    pub message_id: Option<MessageId>,
}

/// Fields shared by contracts that lock funds in a fresh multisig address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedFunds {
    pub sum_satoshi: u64,
    pub prevtxs: Vec<PrevTx>,
    pub outputs: Vec<PaymentOutput>,
    pub miners_fee_satoshi: u64,
    pub locktime: u64,
    pub pubkey_list: Vec<String>,
    pub req_sigs: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockCreateRequest {
    pub message_id: MessageId,
    #[serde(flatten)]
    pub funds: LockedFunds,
    pub return_address: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricecheckCreateRequest {
    pub message_id: MessageId,
    #[serde(flatten)]
    pub funds: LockedFunds,
    pub return_if_greater: String,
    pub return_if_lesser: String,
    pub price: Decimal,
}

impl PricecheckCreateRequest {
    /// Strictly greater goes to `return_if_greater`; equal or lower to `return_if_lesser`.
    pub fn return_address_for(&self, last_price: Decimal) -> &str {
        if last_price > self.price {
            &self.return_if_greater
        } else {
            &self.return_if_lesser
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountyCreateRequest {
    pub prevtx: Vec<PrevTx>,
    pub locktime: Option<u64>,
    pub message_id: MessageId,
    pub sum_amount: BtcAmount,
    pub miners_fee: BtcAmount,
    pub oracle_fees: BTreeMap<String, BtcAmount>,
    pub pubkey_list: Vec<String>,
    pub req_sigs: u32,
    pub password_hash: String,
    pub return_address: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountyRedeemRequest {
    pub pwtxid: Pwtxid,
    /// Key hash -> base64 RSA ciphertext of a `{password, address}` guess.
    pub passwords: BTreeMap<String, String>,
}
