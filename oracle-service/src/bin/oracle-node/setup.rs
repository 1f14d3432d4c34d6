use log::{info, warn};
use oracle_core::application::OracleContext;
use oracle_core::foundation::OracleError;
use oracle_core::infrastructure::config::{self, AppConfig};
use oracle_core::infrastructure::evaluator::BasicEvaluator;
use oracle_core::infrastructure::logging::init_logger;
use oracle_core::infrastructure::price_feed::BitstampPriceFeed;
use oracle_core::infrastructure::rpc::redact_url;
use oracle_core::infrastructure::storage::RocksStorage;
use oracle_core::infrastructure::transport::{BitmessageConnection, BitmessageTransport};
use oracle_core::infrastructure::wallet::BitcoindRpcWallet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_ADDRESS_LABEL: &str = "oracle";

pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<(), OracleError> {
    let log_dir = log_dir.map(|dir| dir.to_string_lossy().into_owned());
    init_logger(log_dir.as_deref(), level)
}

pub fn load_app_config() -> Result<Arc<AppConfig>, OracleError> {
    let data_dir = config::resolve_data_dir()?;
    let config_path = config::resolve_config_path(&data_dir)?;
    info!("loading config path={} data_dir={}", config_path.display(), data_dir.display());
    let app_config = config::load_config_from_file(&config_path, &data_dir)?;
    if let Err(errors) = app_config.validate() {
        for err in &errors {
            warn!("config validation error: {}", err);
        }
        return Err(OracleError::ConfigError(format!("{} validation error(s)", errors.len())));
    }
    Ok(Arc::new(app_config))
}

pub fn init_storage(app_config: &AppConfig) -> Result<Arc<RocksStorage>, OracleError> {
    RocksStorage::open_in_dir_with_options(&app_config.service.data_dir, app_config.service.allow_schema_wipe)
        .map(Arc::new)
        .map_err(|err| OracleError::Message(format!("rocksdb open error: {}", err)))
}

/// Builds every external adapter and waits for the Bitmessage address book.
pub async fn init_context(app_config: &AppConfig, storage: Arc<RocksStorage>) -> Result<OracleContext, OracleError> {
    let bitcoind = &app_config.bitcoind;
    let wallet = BitcoindRpcWallet::new(
        bitcoind.rpc_url.clone(),
        bitcoind.rpc_user.clone(),
        bitcoind.rpc_password.clone(),
        Duration::from_secs(bitcoind.timeout_secs),
    )?;
    info!("bitcoind wallet configured url={}", redact_url(&bitcoind.rpc_url));

    let bitmessage = &app_config.bitmessage;
    let transport = BitmessageTransport::new(BitmessageConnection {
        api_url: bitmessage.api_url.clone(),
        api_user: bitmessage.api_user.clone(),
        api_password: bitmessage.api_password.clone(),
        default_address_label: bitmessage.default_address_label.clone().unwrap_or_else(|| DEFAULT_ADDRESS_LABEL.to_string()),
        timeout: Duration::from_secs(bitmessage.timeout_secs),
    })?;
    transport.init().await?;

    let price_feed = BitstampPriceFeed::new(app_config.price_feed.url.clone(), Duration::from_secs(app_config.price_feed.timeout_secs))?;

    Ok(OracleContext::new(
        app_config.engine_policy(),
        storage,
        Arc::new(wallet),
        Arc::new(transport),
        Arc::new(price_feed),
        Arc::new(BasicEvaluator::new()),
    ))
}

pub fn log_startup_banner(app_config: &AppConfig) {
    let runtime = &app_config.runtime;
    info!(
        "oracle node configured data_dir={} oracle_keys={} rsa_key_bits={} workers={} scheduler_interval_secs={} inbox_poll_secs={} identity_broadcast_secs={}",
        app_config.service.data_dir,
        app_config.service.private_keys.len(),
        app_config.service.rsa_key_bits,
        runtime.task_workers,
        runtime.scheduler_interval_secs,
        runtime.inbox_poll_secs,
        runtime.identity_broadcast_secs
    );
}
