mod loader;
mod types;
pub mod validation;

pub use loader::{load_config, load_config_from_file, CONFIG_FILE_NAME};
pub use types::*;

use crate::foundation::{OracleError, ORACLE_CONFIG_PATH_ENV, ORACLE_DATA_DIR_ENV};
use std::path::{Path, PathBuf};

pub fn load_app_config() -> Result<AppConfig, OracleError> {
    let data_dir = resolve_data_dir()?;
    let config_path = resolve_config_path(&data_dir)?;
    let config = load_config_from_file(&config_path, &data_dir)?;
    config.validate().map_err(|errors| OracleError::ConfigError(format!("validation failed: {:?}", errors)))?;
    Ok(config)
}

pub fn load_app_config_from_path(path: &Path) -> Result<AppConfig, OracleError> {
    let data_dir = resolve_data_dir()?;
    let config = load_config_from_file(path, &data_dir)?;
    config.validate().map_err(|errors| OracleError::ConfigError(format!("validation failed: {:?}", errors)))?;
    Ok(config)
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    })
}

pub fn resolve_config_path(data_dir: &Path) -> Result<PathBuf, OracleError> {
    Ok(env_path(ORACLE_CONFIG_PATH_ENV).unwrap_or_else(|| data_dir.join(CONFIG_FILE_NAME)))
}

pub fn resolve_data_dir() -> Result<PathBuf, OracleError> {
    if let Some(data_dir) = env_path(ORACLE_DATA_DIR_ENV) {
        return Ok(data_dir);
    }
    let cwd = std::env::current_dir()
        .map_err(|err| OracleError::StorageError { operation: "env::current_dir".to_string(), details: err.to_string() })?;
    Ok(cwd.join(".oracle"))
}
