//! Persistent records owned by the record store.

use crate::domain::protocol::Operation;
use crate::domain::transaction::PrevTx;
use crate::foundation::{KeyHash, MessageId, Pwtxid, Rqhs, TaskId};
use serde::{Deserialize, Serialize};

/// Highest signature count accepted for a conditioned request group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandledTransaction {
    pub rqhs: Rqhs,
    pub max_sigs: u32,
    pub updated_at: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPasswordTransaction {
    pub pwtxid: Pwtxid,
    pub operation: Operation,
    /// Original request JSON; bounties also carry `rsa_pubkey`.
    pub request_json: String,
    pub done: bool,
    pub created_at: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaKeyPairRecord {
    pub pwtxid: Pwtxid,
    pub private_key_pem: String,
    pub public_key_json: String,
    pub key_hash: KeyHash,
    pub created_at: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RightGuess {
    pub pwtxid: Pwtxid,
    pub key_hash: KeyHash,
    pub message_id: MessageId,
    pub address: String,
    pub received_time: u64,
}

impl RightGuess {
    pub fn unique_key(&self) -> (Pwtxid, KeyHash, MessageId) {
        (self.pwtxid.clone(), self.key_hash.clone(), self.message_id.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// rqhs hex or pwtxid.
    pub key: String,
    pub task_id: Option<TaskId>,
    pub hex_transaction: String,
    pub prevtxs: Vec<PrevTx>,
    pub signatures: u32,
    pub created_at: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentKind {
    Payout,
    Refund,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentPasswordTransaction {
    pub pwtxid: Pwtxid,
    pub kind: SentKind,
    pub tx: String,
    pub recipient: String,
    pub created_at: u64,
}
