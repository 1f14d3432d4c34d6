//! Bitcoin transaction shapes exchanged with the wallet backend.

use serde::{Deserialize, Serialize};

/// Previous output being spent, in the shape bitcoind's signing RPCs expect.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrevTx {
    pub txid: String,
    pub vout: u32,
    #[serde(rename = "scriptPubKey", default)]
    pub script_pub_key: String,
    #[serde(rename = "redeemScript", default, skip_serializing_if = "Option::is_none")]
    pub redeem_script: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxInput {
    pub txid: String,
    pub vout: u32,
}

impl From<&PrevTx> for TxInput {
    fn from(prev: &PrevTx) -> Self {
        Self { txid: prev.txid.clone(), vout: prev.vout }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: String,
    pub amount_satoshi: u64,
}

impl TxOutput {
    pub fn new(address: impl Into<String>, amount_satoshi: u64) -> Self {
        Self { address: address.into(), amount_satoshi }
    }
}

/// Signature-independent view of a transaction: what it spends, where it pays, when it unlocks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxTemplate {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub locktime: u64,
}

impl TxTemplate {
    pub fn total_output_satoshi(&self) -> u64 {
        self.outputs.iter().map(|o| o.amount_satoshi).fold(0u64, u64::saturating_add)
    }
}

pub fn inputs_from_prevtxs(prevtxs: &[PrevTx]) -> Vec<TxInput> {
    prevtxs.iter().map(TxInput::from).collect()
}
