use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    MalformedRequest,
    MissingField,
    UnknownOperation,
    InvalidTransaction,
    InvalidAmount,
    InvalidCondition,
    InvariantViolation,
    StorageError,
    StorageLockTimeout,
    SchemaMismatch,
    SerializationError,
    EncodingError,
    CryptoError,
    WalletRpcError,
    PriceFeedError,
    TransportError,
    ExternalTimeout,
    ConfigError,
    KeyNotFound,
    Message,
}

#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("missing field '{field}' for operation {operation}")]
    MissingField { operation: String, field: String },

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("invalid amount in {field}: {details}")]
    InvalidAmount { field: String, details: String },

    #[error("invalid condition '{expression}': {details}")]
    InvalidCondition { expression: String, details: String },

    /// A task reached execution carrying data that request validation should have rejected.
    #[error("invariant violation in {context}: {details}")]
    InvariantViolation { context: String, details: String },

    #[error("storage error during {operation}: {details}")]
    StorageError { operation: String, details: String },

    #[error("storage lock timeout: {operation} (waited {timeout_secs}s)")]
    StorageLockTimeout { operation: String, timeout_secs: u64 },

    #[error("schema mismatch: stored={stored} current={current}")]
    SchemaMismatch { stored: u32, current: u32 },

    #[error("{format} serialization error: {details}")]
    SerializationError { format: String, details: String },

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("crypto error during {operation}: {details}")]
    CryptoError { operation: String, details: String },

    #[error("wallet RPC error in {method}: {details}")]
    WalletRpcError { method: String, details: String },

    #[error("price feed error: {0}")]
    PriceFeedError(String),

    #[error("transport error during {operation}: {details}")]
    TransportError { operation: String, details: String },

    #[error("external call timed out: {operation} after {timeout_secs}s")]
    ExternalTimeout { operation: String, timeout_secs: u64 },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, OracleError>;

impl OracleError {
    pub fn code(&self) -> ErrorCode {
        match self {
            OracleError::MalformedRequest(_) => ErrorCode::MalformedRequest,
            OracleError::MissingField { .. } => ErrorCode::MissingField,
            OracleError::UnknownOperation(_) => ErrorCode::UnknownOperation,
            OracleError::InvalidTransaction(_) => ErrorCode::InvalidTransaction,
            OracleError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
            OracleError::InvalidCondition { .. } => ErrorCode::InvalidCondition,
            OracleError::InvariantViolation { .. } => ErrorCode::InvariantViolation,
            OracleError::StorageError { .. } => ErrorCode::StorageError,
            OracleError::StorageLockTimeout { .. } => ErrorCode::StorageLockTimeout,
            OracleError::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            OracleError::SerializationError { .. } => ErrorCode::SerializationError,
            OracleError::EncodingError(_) => ErrorCode::EncodingError,
            OracleError::CryptoError { .. } => ErrorCode::CryptoError,
            OracleError::WalletRpcError { .. } => ErrorCode::WalletRpcError,
            OracleError::PriceFeedError(_) => ErrorCode::PriceFeedError,
            OracleError::TransportError { .. } => ErrorCode::TransportError,
            OracleError::ExternalTimeout { .. } => ErrorCode::ExternalTimeout,
            OracleError::ConfigError(_) => ErrorCode::ConfigError,
            OracleError::KeyNotFound(_) => ErrorCode::KeyNotFound,
            OracleError::Message(_) => ErrorCode::Message,
        }
    }

    pub fn context(&self) -> ErrorContext {
        ErrorContext { code: self.code(), message: self.to_string() }
    }

    /// Failures of an external collaborator that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OracleError::WalletRpcError { .. }
                | OracleError::PriceFeedError(_)
                | OracleError::TransportError { .. }
                | OracleError::ExternalTimeout { .. }
                | OracleError::StorageLockTimeout { .. }
        )
    }

    pub fn invariant(context: impl Into<String>, details: impl ToString) -> Self {
        OracleError::InvariantViolation { context: context.into(), details: details.to_string() }
    }

    pub fn crypto(operation: impl Into<String>, details: impl ToString) -> Self {
        OracleError::CryptoError { operation: operation.into(), details: details.to_string() }
    }

    pub fn transport(operation: impl Into<String>, details: impl ToString) -> Self {
        OracleError::TransportError { operation: operation.into(), details: details.to_string() }
    }

    pub fn wallet(method: impl Into<String>, details: impl ToString) -> Self {
        OracleError::WalletRpcError { method: method.into(), details: details.to_string() }
    }
}

impl From<hex::FromHexError> for OracleError {
    fn from(err: hex::FromHexError) -> Self {
        OracleError::EncodingError(format!("hex decode error: {}", err))
    }
}

impl From<base64::DecodeError> for OracleError {
    fn from(err: base64::DecodeError) -> Self {
        OracleError::EncodingError(format!("base64 decode error: {}", err))
    }
}

impl From<toml::de::Error> for OracleError {
    fn from(err: toml::de::Error) -> Self {
        OracleError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl From<rocksdb::Error> for OracleError {
    fn from(err: rocksdb::Error) -> Self {
        OracleError::StorageError { operation: "rocksdb".to_string(), details: err.to_string() }
    }
}

impl From<bincode::Error> for OracleError {
    fn from(err: bincode::Error) -> Self {
        OracleError::SerializationError { format: "bincode".to_string(), details: err.to_string() }
    }
}

impl From<rsa::Error> for OracleError {
    fn from(err: rsa::Error) -> Self {
        OracleError::CryptoError { operation: "rsa".to_string(), details: err.to_string() }
    }
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return OracleError::ExternalTimeout { operation: "http".to_string(), timeout_secs: 0 };
        }
        OracleError::TransportError { operation: "http".to_string(), details: err.to_string() }
    }
}

#[macro_export]
macro_rules! storage_err {
    ($op:expr, $err:expr) => {
        $crate::foundation::OracleError::StorageError { operation: $op.into(), details: $err.to_string() }
    };
}

#[macro_export]
macro_rules! serde_err {
    ($fmt:expr, $err:expr) => {
        $crate::foundation::OracleError::SerializationError { format: $fmt.into(), details: $err.to_string() }
    };
}

impl From<io::Error> for OracleError {
    fn from(err: io::Error) -> Self {
        OracleError::StorageError { operation: "io".to_string(), details: err.to_string() }
    }
}

impl From<serde_json::Error> for OracleError {
    fn from(err: serde_json::Error) -> Self {
        OracleError::SerializationError { format: "json".to_string(), details: err.to_string() }
    }
}

// NOTE: Avoid adding generic "stringly" error conversions here.
// Use structured `OracleError` variants at the call site to preserve context.
