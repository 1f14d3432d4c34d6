//! Utility helpers for RocksDB-backed storage.

use crate::foundation::{OracleError, STORAGE_LOCK_TIMEOUT_SECS};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};

const DEFAULT_LOCK_POLL_INTERVAL_MS: u64 = 10;

pub fn acquire_with_timeout<'a, T>(lock: &'a Mutex<T>, operation: &'static str) -> Result<MutexGuard<'a, T>, OracleError> {
    acquire_with_timeout_for(lock, operation, Duration::from_secs(STORAGE_LOCK_TIMEOUT_SECS))
}

pub fn acquire_with_timeout_for<'a, T>(
    lock: &'a Mutex<T>,
    operation: &'static str,
    timeout: Duration,
) -> Result<MutexGuard<'a, T>, OracleError> {
    let start = Instant::now();
    loop {
        match lock.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::Poisoned(_)) => {
                return Err(OracleError::StorageError { operation: operation.to_string(), details: "mutex poisoned".to_string() });
            }
            Err(TryLockError::WouldBlock) => {
                if start.elapsed() >= timeout {
                    return Err(OracleError::StorageLockTimeout { operation: operation.to_string(), timeout_secs: timeout.as_secs() });
                }
                std::thread::sleep(Duration::from_millis(DEFAULT_LOCK_POLL_INTERVAL_MS));
            }
        }
    }
}

pub fn decode_u64_be(bytes: &[u8], operation: &'static str) -> Result<u64, OracleError> {
    let array: [u8; 8] = bytes
        .try_into()
        .map_err(|_| OracleError::StorageError { operation: operation.to_string(), details: "corrupt u64 value".to_string() })?;
    Ok(u64::from_be_bytes(array))
}
