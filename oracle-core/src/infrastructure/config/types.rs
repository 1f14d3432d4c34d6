use crate::domain::EnginePolicy;
use crate::foundation::{
    DEFAULT_EXTERNAL_CALL_TIMEOUT_SECS, DEFAULT_PRICECHECK_MAX_RETRIES, DEFAULT_PRICECHECK_RETRY_INTERVAL_SECS, DEFAULT_RSA_KEY_BITS,
    PRICE_FEED_TIMEOUT_SECS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine identity and key material.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub data_dir: String,
    /// WIF keys handed to the wallet when signing. Empty means "let the node wallet sign".
    #[serde(default)]
    pub private_keys: Vec<String>,
    #[serde(default = "default_rsa_key_bits")]
    pub rsa_key_bits: usize,
    /// Devnet-only escape hatch: wipe RocksDB if schema version mismatches.
    #[serde(default)]
    pub allow_schema_wipe: bool,
}

fn default_rsa_key_bits() -> usize {
    DEFAULT_RSA_KEY_BITS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { data_dir: String::new(), private_keys: Vec::new(), rsa_key_bits: DEFAULT_RSA_KEY_BITS, allow_schema_wipe: false }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BitcoindConfig {
    #[serde(default)]
    pub rpc_url: String,
    #[serde(default)]
    pub rpc_user: Option<String>,
    #[serde(default)]
    pub rpc_password: Option<String>,
    #[serde(default)]
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BitmessageConfig {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_user: Option<String>,
    #[serde(default)]
    pub api_password: Option<String>,
    /// Label of the address used as sender; the first address wins when unset.
    #[serde(default)]
    pub default_address_label: Option<String>,
    #[serde(default)]
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PriceFeedConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub scheduler_interval_secs: u64,
    #[serde(default)]
    pub inbox_poll_secs: u64,
    #[serde(default)]
    pub task_workers: usize,
    #[serde(default)]
    pub identity_broadcast_secs: u64,
    #[serde(default)]
    pub external_call_timeout_secs: u64,
    #[serde(default)]
    pub pricecheck_retry_interval_secs: u64,
    #[serde(default)]
    pub pricecheck_max_retries: Option<u32>,
    #[serde(default)]
    pub status_report_secs: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub bitcoind: BitcoindConfig,
    #[serde(default)]
    pub bitmessage: BitmessageConfig,
    #[serde(default)]
    pub price_feed: PriceFeedConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    pub fn engine_policy(&self) -> EnginePolicy {
        EnginePolicy {
            private_keys: self.service.private_keys.clone(),
            rsa_key_bits: self.service.rsa_key_bits,
            external_call_timeout: Duration::from_secs(self.runtime.external_call_timeout_secs.max(1)),
            pricecheck_retry_interval_secs: self.runtime.pricecheck_retry_interval_secs,
            pricecheck_max_retries: self.runtime.pricecheck_max_retries.unwrap_or(DEFAULT_PRICECHECK_MAX_RETRIES),
        }
    }
}

pub(crate) const DEFAULT_BITCOIND_RPC_URL: &str = "http://127.0.0.1:8332";
pub(crate) const DEFAULT_BITMESSAGE_API_URL: &str = "http://127.0.0.1:8442";
pub(crate) const DEFAULT_PRICE_FEED_URL: &str = "https://www.bitstamp.net/api/ticker/";
pub(crate) const DEFAULT_SCHEDULER_INTERVAL_SECS: u64 = 5;
pub(crate) const DEFAULT_INBOX_POLL_SECS: u64 = 10;
pub(crate) const DEFAULT_TASK_WORKERS: usize = 4;
pub(crate) const DEFAULT_IDENTITY_BROADCAST_SECS: u64 = 3600;
pub(crate) const DEFAULT_STATUS_REPORT_SECS: u64 = 300;
pub(crate) const DEFAULT_PRICE_FEED_TIMEOUT_SECS: u64 = PRICE_FEED_TIMEOUT_SECS;
pub(crate) const DEFAULT_CALL_TIMEOUT_SECS: u64 = DEFAULT_EXTERNAL_CALL_TIMEOUT_SECS;
pub(crate) const DEFAULT_RETRY_INTERVAL_SECS: u64 = DEFAULT_PRICECHECK_RETRY_INTERVAL_SECS;
