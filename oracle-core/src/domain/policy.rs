use crate::foundation::{
    DEFAULT_EXTERNAL_CALL_TIMEOUT_SECS, DEFAULT_PRICECHECK_MAX_RETRIES, DEFAULT_PRICECHECK_RETRY_INTERVAL_SECS, DEFAULT_RSA_KEY_BITS,
};
use std::time::Duration;

/// Runtime knobs the handlers consult.
#[derive(Clone, Debug)]
pub struct EnginePolicy {
    /// Keys passed to the wallet when counter-signing. Empty means the wallet signs with its own keys.
    pub private_keys: Vec<String>,
    pub rsa_key_bits: usize,
    pub external_call_timeout: Duration,
    pub pricecheck_retry_interval_secs: u64,
    pub pricecheck_max_retries: u32,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            private_keys: Vec::new(),
            rsa_key_bits: DEFAULT_RSA_KEY_BITS,
            external_call_timeout: Duration::from_secs(DEFAULT_EXTERNAL_CALL_TIMEOUT_SECS),
            pricecheck_retry_interval_secs: DEFAULT_PRICECHECK_RETRY_INTERVAL_SECS,
            pricecheck_max_retries: DEFAULT_PRICECHECK_MAX_RETRIES,
        }
    }
}
