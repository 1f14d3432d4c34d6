//! Configuration loader using Figment for layered config management.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML config file
//! 3. Environment variables (ORACLE_* prefix)

use crate::foundation::OracleError;
use crate::infrastructure::config::types::*;
use crate::infrastructure::rpc::redact_url;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use log::{debug, info};
use std::path::Path;

/// Environment variable prefix for config overrides.
///
/// Example: `ORACLE_BITCOIND__RPC_URL` -> `bitcoind.rpc_url`
const ENV_PREFIX: &str = "ORACLE_";

pub const CONFIG_FILE_NAME: &str = "oracle-config.toml";

/// Load configuration from the default file in `data_dir` (`oracle-config.toml`).
pub fn load_config(data_dir: &Path) -> Result<AppConfig, OracleError> {
    let config_path = data_dir.join(CONFIG_FILE_NAME);
    load_config_from_file(&config_path, data_dir)
}

/// Load configuration from a specific file path.
pub fn load_config_from_file(path: &Path, data_dir: &Path) -> Result<AppConfig, OracleError> {
    info!("loading configuration path={} data_dir={}", path.display(), data_dir.display());
    // DATA_DIR and CONFIG_PATH are resolved before figment runs; keep them out of the tree.
    let env = Env::prefixed(ENV_PREFIX).ignore(&["DATA_DIR", "CONFIG_PATH", "TEST_NOW_SECS"]).split("__");
    let figment = figment_base(path).merge(env);
    let mut config: AppConfig = figment.extract().map_err(|e| OracleError::ConfigError(format!("config extraction failed: {e}")))?;
    postprocess(&mut config, data_dir);
    debug!(
        "configuration loaded bitcoind_url={} bitmessage_url={} price_feed_url={} workers={}",
        redact_url(&config.bitcoind.rpc_url),
        redact_url(&config.bitmessage.api_url),
        config.price_feed.url,
        config.runtime.task_workers
    );
    Ok(config)
}

fn figment_base(path: &Path) -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
    if path.exists() {
        figment = figment.merge(Toml::file(path));
    } else {
        debug!("configuration file missing; using defaults and env only path={}", path.display());
    }
    figment
}

fn default_if_empty(value: &mut String, default: &str) {
    if value.trim().is_empty() {
        *value = default.to_string();
    }
}

fn default_if_zero<T: Default + PartialEq>(value: &mut T, default: T) {
    if *value == T::default() {
        *value = default;
    }
}

fn postprocess(config: &mut AppConfig, data_dir: &Path) {
    if config.service.data_dir.trim().is_empty() {
        config.service.data_dir = data_dir.to_string_lossy().to_string();
    }

    default_if_empty(&mut config.bitcoind.rpc_url, DEFAULT_BITCOIND_RPC_URL);
    default_if_empty(&mut config.bitmessage.api_url, DEFAULT_BITMESSAGE_API_URL);
    default_if_empty(&mut config.price_feed.url, DEFAULT_PRICE_FEED_URL);

    let runtime = &mut config.runtime;
    default_if_zero(&mut runtime.scheduler_interval_secs, DEFAULT_SCHEDULER_INTERVAL_SECS);
    default_if_zero(&mut runtime.inbox_poll_secs, DEFAULT_INBOX_POLL_SECS);
    default_if_zero(&mut runtime.task_workers, DEFAULT_TASK_WORKERS);
    default_if_zero(&mut runtime.identity_broadcast_secs, DEFAULT_IDENTITY_BROADCAST_SECS);
    default_if_zero(&mut runtime.external_call_timeout_secs, DEFAULT_CALL_TIMEOUT_SECS);
    default_if_zero(&mut runtime.pricecheck_retry_interval_secs, DEFAULT_RETRY_INTERVAL_SECS);
    default_if_zero(&mut runtime.status_report_secs, DEFAULT_STATUS_REPORT_SECS);

    let call_timeout = runtime.external_call_timeout_secs;
    default_if_zero(&mut config.bitcoind.timeout_secs, call_timeout);
    default_if_zero(&mut config.bitmessage.timeout_secs, call_timeout);
    default_if_zero(&mut config.price_feed.timeout_secs, DEFAULT_PRICE_FEED_TIMEOUT_SECS);
}
