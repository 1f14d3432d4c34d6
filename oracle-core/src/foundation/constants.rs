//! System-wide constants for the oracle node.

/// Wire protocol version carried in every broadcast body.
pub const PROTOCOL_VERSION: &str = "0.11";

/// Satoshis per bitcoin (10^8).
pub const SATOSHIS_PER_BTC: u64 = 100_000_000;

/// Decimal places used when parsing BTC amounts and prices.
pub const AMOUNT_DECIMALS: u32 = 8;

/// Delay before a failed price check is attempted again (10 minutes).
pub const DEFAULT_PRICECHECK_RETRY_INTERVAL_SECS: u64 = 600;

/// Number of rescheduled price checks allowed before the task is parked.
pub const DEFAULT_PRICECHECK_MAX_RETRIES: u32 = 10;

/// `next_check` value for tasks the scheduler must never pick up again.
pub const TASK_PARKED_NEXT_CHECK: u64 = u64::MAX;

/// Default timeout for wallet, price feed and transport calls.
pub const DEFAULT_EXTERNAL_CALL_TIMEOUT_SECS: u64 = 10;

/// Timeout for the public ticker request.
pub const PRICE_FEED_TIMEOUT_SECS: u64 = 10;

/// Maximum time to wait for a storage lock before giving up.
pub const STORAGE_LOCK_TIMEOUT_SECS: u64 = 30;

/// RSA modulus size for blind-claim keypairs.
pub const DEFAULT_RSA_KEY_BITS: usize = 2048;

/// Group key prefix for bounty guesses (`guess:<pwtxid>`).
pub const GUESS_FILTER_PREFIX: &str = "guess";

/// Group key prefix for conditioned transactions (`rqhs:<hex>`).
pub const RQHS_FILTER_PREFIX: &str = "rqhs";

/// Environment variable that pins the wall clock (seconds) in tests.
pub const TEST_NOW_SECS_ENV_VAR: &str = "ORACLE_TEST_NOW_SECS";

/// Maximum accepted size of an inbound message body (1 MB).
pub const MAX_MESSAGE_BODY_BYTES: usize = 1024 * 1024;

/// Blake3 hash size in bytes.
pub const HASH_SIZE: usize = 32;

/// Environment variable naming the data directory (store and default config location).
pub const ORACLE_DATA_DIR_ENV: &str = "ORACLE_DATA_DIR";

/// Environment variable naming an explicit config file.
pub const ORACLE_CONFIG_PATH_ENV: &str = "ORACLE_CONFIG_PATH";
