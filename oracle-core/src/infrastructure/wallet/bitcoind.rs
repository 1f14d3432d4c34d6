use super::{Result, Wallet};
use crate::domain::{PrevTx, TxInput, TxOutput, TxTemplate};
use crate::foundation::util::amount::btc_to_satoshi;
use crate::foundation::{OracleError, SATOSHIS_PER_BTC};
use crate::infrastructure::rpc::json_rpc::RpcErrorObject;
use crate::infrastructure::rpc::JsonRpcClient;
use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

// bitcoind error codes that mean "the caller handed us a bad transaction"
const RPC_DESERIALIZATION_ERROR: i64 = -22;
const RPC_INVALID_PARAMETER: i64 = -8;
const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;

#[derive(Deserialize)]
struct DecodedTransaction {
    #[serde(default)]
    vin: Vec<DecodedInput>,
    #[serde(default)]
    vout: Vec<DecodedOutput>,
    #[serde(default)]
    locktime: u64,
}

#[derive(Deserialize)]
struct DecodedInput {
    #[serde(default)]
    txid: Option<String>,
    #[serde(default)]
    vout: Option<u32>,
    #[serde(rename = "scriptSig", default)]
    script_sig: Option<ScriptSig>,
}

#[derive(Deserialize)]
struct ScriptSig {
    #[serde(default)]
    asm: String,
}

#[derive(Deserialize)]
struct DecodedOutput {
    value: Value,
    #[serde(rename = "scriptPubKey")]
    script_pub_key: ScriptPubKey,
}

#[derive(Deserialize)]
struct ScriptPubKey {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    addresses: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct SignResult {
    hex: String,
}

/// Wallet backed by a bitcoind node over JSON-RPC.
pub struct BitcoindRpcWallet {
    client: JsonRpcClient,
}

impl BitcoindRpcWallet {
    pub fn new(url: impl Into<String>, user: Option<String>, password: Option<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        info!("bitcoind wallet configured url={}", crate::infrastructure::rpc::redact_url(&url));
        Ok(Self { client: JsonRpcClient::new(url, user, password, timeout)? })
    }

    async fn decode_raw(&self, raw_tx: &str) -> Result<DecodedTransaction> {
        match self.client.call_raw("decoderawtransaction", json!([raw_tx])).await? {
            Ok(value) => serde_json::from_value(value).map_err(|err| OracleError::wallet("decoderawtransaction", err)),
            Err(error) => Err(classify_rpc_error("decoderawtransaction", error)),
        }
    }
}

fn classify_rpc_error(method: &str, error: RpcErrorObject) -> OracleError {
    match error.code {
        RPC_DESERIALIZATION_ERROR | RPC_INVALID_PARAMETER | RPC_INVALID_ADDRESS_OR_KEY => {
            OracleError::InvalidTransaction(format!("{}: {}", method, error.message))
        }
        code => OracleError::wallet(method, format!("code={} message={}", code, error.message)),
    }
}

/// Signatures pushed in a P2SH multisig scriptSig: every token decorated with a sighash type.
fn count_script_signatures(asm: &str) -> u32 {
    asm.split_whitespace().filter(|token| token.ends_with(']') && token.contains('[')).count() as u32
}

fn satoshi_to_rpc_amount(satoshi: u64) -> Value {
    let whole = satoshi / SATOSHIS_PER_BTC;
    let fraction = satoshi % SATOSHIS_PER_BTC;
    let text = format!("{}.{:08}", whole, fraction);
    serde_json::from_str(&text).unwrap_or_else(|_| json!(satoshi as f64 / SATOSHIS_PER_BTC as f64))
}

fn rpc_amount_to_satoshi(value: &Value) -> Result<u64> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => return Err(OracleError::wallet("decoderawtransaction", format!("unexpected amount {}", other))),
    };
    btc_to_satoshi("vout.value", &text)
}

#[async_trait]
impl Wallet for BitcoindRpcWallet {
    async fn derive_multisig_address(&self, req_sigs: u32, pubkeys: &[String]) -> Result<String> {
        let result = match self.client.call_raw("addmultisigaddress", json!([req_sigs, pubkeys])).await? {
            Ok(result) => result,
            Err(error) => return Err(classify_rpc_error("addmultisigaddress", error)),
        };
        // older nodes return the bare address, newer ones `{address, redeemScript}`
        let address = match &result {
            Value::String(address) => address.clone(),
            Value::Object(map) => map
                .get("address")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| OracleError::wallet("addmultisigaddress", "reply has no address"))?,
            other => return Err(OracleError::wallet("addmultisigaddress", format!("unexpected reply {}", other))),
        };
        debug!("multisig address derived req_sigs={} pubkeys={} address={}", req_sigs, pubkeys.len(), address);
        Ok(address)
    }

    async fn signatures_number(&self, raw_tx: &str, _prevtxs: &[PrevTx]) -> Result<u32> {
        let decoded = self.decode_raw(raw_tx).await?;
        // every input must carry the threshold, so the weakest input decides
        Ok(decoded
            .vin
            .iter()
            .map(|input| input.script_sig.as_ref().map(|s| count_script_signatures(&s.asm)).unwrap_or(0))
            .min()
            .unwrap_or(0))
    }

    async fn sign(&self, raw_tx: &str, prevtxs: &[PrevTx], private_keys: &[String]) -> Result<String> {
        let reply = if private_keys.is_empty() {
            self.client.call_raw("signrawtransactionwithwallet", json!([raw_tx, prevtxs])).await?
        } else {
            self.client.call_raw("signrawtransactionwithkey", json!([raw_tx, private_keys, prevtxs])).await?
        };
        let value = reply.map_err(|error| classify_rpc_error("signrawtransaction", error))?;
        let signed: SignResult = serde_json::from_value(value).map_err(|err| OracleError::wallet("signrawtransaction", err))?;
        Ok(signed.hex)
    }

    async fn build_raw_transaction(&self, inputs: &[TxInput], outputs: &[TxOutput], locktime: u64) -> Result<String> {
        let mut amounts = Map::new();
        for output in outputs {
            if amounts.insert(output.address.clone(), satoshi_to_rpc_amount(output.amount_satoshi)).is_some() {
                return Err(OracleError::InvalidTransaction(format!("duplicate output address {}", output.address)));
            }
        }
        let reply = self.client.call_raw("createrawtransaction", json!([inputs, Value::Object(amounts), locktime])).await?;
        let value = reply.map_err(|error| classify_rpc_error("createrawtransaction", error))?;
        value.as_str().map(str::to_string).ok_or_else(|| OracleError::wallet("createrawtransaction", "reply is not a hex string"))
    }

    async fn decode_transaction(&self, raw_tx: &str) -> Result<TxTemplate> {
        let decoded = self.decode_raw(raw_tx).await?;
        let mut inputs = Vec::with_capacity(decoded.vin.len());
        for input in &decoded.vin {
            match (&input.txid, input.vout) {
                (Some(txid), Some(vout)) => inputs.push(TxInput { txid: txid.clone(), vout }),
                _ => return Err(OracleError::InvalidTransaction("coinbase input in oracle request".to_string())),
            }
        }
        let mut outputs = Vec::with_capacity(decoded.vout.len());
        for output in &decoded.vout {
            let address = output
                .script_pub_key
                .address
                .clone()
                .or_else(|| output.script_pub_key.addresses.as_ref().and_then(|a| a.first().cloned()))
                .unwrap_or_default();
            outputs.push(TxOutput { address, amount_satoshi: rpc_amount_to_satoshi(&output.value)? });
        }
        Ok(TxTemplate { inputs, outputs, locktime: decoded.locktime })
    }
}
