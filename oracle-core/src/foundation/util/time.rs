use crate::foundation::OracleError;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn current_timestamp_secs_env(env_var: Option<&str>) -> Result<u64, OracleError> {
    if let Some(var) = env_var {
        if let Ok(value) = std::env::var(var) {
            return value.parse::<u64>().map_err(|err| OracleError::Message(err.to_string()));
        }
    }
    let now = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|err| OracleError::Message(err.to_string()))?;
    Ok(now.as_secs())
}

/// Returns the current wall-clock timestamp in unix seconds.
///
/// For test determinism, this respects `TEST_NOW_SECS_ENV_VAR` when set.
pub fn now_secs() -> u64 {
    current_timestamp_secs_env(Some(crate::foundation::constants::TEST_NOW_SECS_ENV_VAR))
        .or_else(|_| current_timestamp_secs_env(None))
        .unwrap_or(0)
}
