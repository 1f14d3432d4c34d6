//! Wire protocol: operation names, required fields and outbound message shapes.

use crate::foundation::{MessageId, Pwtxid, PROTOCOL_VERSION};
use crate::domain::transaction::PrevTx;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Subjects of the responses the oracle may send.
pub mod subjects {
    pub const SIGNED_TRANSACTION: &str = "SignedTransaction";
    pub const IDENTITY_BROADCAST: &str = "IdentityBroadcast";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ConditionedTransaction,
    TimelockCreate,
    PricecheckCreate,
    BountyCreate,
    BountyRedeem,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::ConditionedTransaction,
        Operation::TimelockCreate,
        Operation::PricecheckCreate,
        Operation::BountyCreate,
        Operation::BountyRedeem,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::ConditionedTransaction => "conditioned_transaction",
            Operation::TimelockCreate => "timelock_create",
            Operation::PricecheckCreate => "pricecheck_create",
            Operation::BountyCreate => "bounty_create",
            Operation::BountyRedeem => "bounty_redeem",
        }
    }

    /// Resolves a wire name, including legacy aliases.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "password_transaction" => return Some(Operation::BountyCreate),
            "guess_password" => return Some(Operation::BountyRedeem),
            _ => {}
        }
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    pub const fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Operation::ConditionedTransaction => &["transaction", "locktime", "pubkey_list", "req_sigs", "condition"],
            Operation::TimelockCreate => &[
                "message_id",
                "sum_satoshi",
                "prevtxs",
                "outputs",
                "miners_fee_satoshi",
                "return_address",
                "locktime",
                "pubkey_list",
                "req_sigs",
            ],
            Operation::PricecheckCreate => &[
                "message_id",
                "sum_satoshi",
                "prevtxs",
                "outputs",
                "miners_fee_satoshi",
                "return_if_greater",
                "return_if_lesser",
                "price",
                "locktime",
                "pubkey_list",
                "req_sigs",
            ],
            Operation::BountyCreate => &[
                "prevtx",
                "locktime",
                "message_id",
                "sum_amount",
                "miners_fee",
                "oracle_fees",
                "pubkey_list",
                "req_sigs",
                "password_hash",
                "return_address",
            ],
            Operation::BountyRedeem => &["pwtxid", "passwords"],
        }
    }

    /// Name of the broadcast confirming a newly locked contract, if the operation creates one.
    pub const fn created_reply(&self) -> Option<&'static str> {
        match self {
            Operation::TimelockCreate => Some("timelock_created"),
            Operation::PricecheckCreate => Some("pricecheck_created"),
            Operation::BountyCreate => Some("bounty_created"),
            Operation::ConditionedTransaction | Operation::BountyRedeem => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the first required field absent from `body`. `locktime: null` counts as present.
pub fn first_missing_field(operation: Operation, body: &Value) -> Option<&'static str> {
    let object = match body.as_object() {
        Some(object) => object,
        None => return operation.required_fields().first().copied(),
    };
    operation.required_fields().iter().copied().find(|field| !object.contains_key(*field))
}

/// `{operation: "<name>_created", pwtxid, in_reply_to, version}` plus operation-specific extras.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatedReply {
    pub operation: String,
    pub pwtxid: Pwtxid,
    pub in_reply_to: MessageId,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsa_pubkey: Option<Value>,
}

impl CreatedReply {
    pub fn new(reply: &str, pwtxid: Pwtxid, in_reply_to: MessageId) -> Self {
        Self { operation: reply.to_string(), pwtxid, in_reply_to, version: PROTOCOL_VERSION.to_string(), rsa_pubkey: None }
    }

    pub fn subject(&self) -> String {
        format!("{} for {}", self.operation.replace('_', " "), self.pwtxid)
    }
}

/// Broadcast body for every transaction the oracle signs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedTransactionBroadcast {
    pub operation: String,
    pub pwtxid: String,
    pub transaction: String,
    pub prevtxs: Vec<PrevTx>,
    pub req_sigs: u32,
    pub version: String,
}

impl SignedTransactionBroadcast {
    pub fn new(key: impl Into<String>, transaction: impl Into<String>, prevtxs: Vec<PrevTx>, req_sigs: u32) -> Self {
        Self {
            operation: "sign".to_string(),
            pwtxid: key.into(),
            transaction: transaction.into(),
            prevtxs,
            req_sigs,
            version: PROTOCOL_VERSION.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentityMessage {
    pub response: String,
    pub version: String,
}

impl Default for IdentityMessage {
    fn default() -> Self {
        Self { response: "active".to_string(), version: PROTOCOL_VERSION.to_string() }
    }
}
