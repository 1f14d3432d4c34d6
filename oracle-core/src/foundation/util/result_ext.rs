//! Result/Option helper traits.
//!
//! Storage lookups return `Result<Option<T>>`; handlers usually need the record to exist.

use crate::foundation::OracleError;

/// Extension for converting `Result<Option<T>>` into `Result<T>`.
pub trait ResultExt<T> {
    /// Convert `Ok(None)` into an error.
    fn required(self, error: impl FnOnce() -> OracleError) -> Result<T, OracleError>;
}

impl<T> ResultExt<T> for Result<Option<T>, OracleError> {
    fn required(self, error: impl FnOnce() -> OracleError) -> Result<T, OracleError> {
        self?.ok_or_else(error)
    }
}
