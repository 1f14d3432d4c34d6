//! Plumbing shared by the HTTP-backed adapters: JSON-RPC, timeouts and circuit breaking.

pub mod circuit_breaker;
pub mod json_rpc;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
pub use json_rpc::JsonRpcClient;

use crate::foundation::OracleError;
use std::future::Future;
use std::time::Duration;

/// Bounds an external call. Elapsed time is reported as `ExternalTimeout` for `operation`.
pub async fn with_timeout<T, Fut>(operation: &str, timeout: Duration, fut: Fut) -> Result<T, OracleError>
where
    Fut: Future<Output = Result<T, OracleError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(OracleError::ExternalTimeout { operation: operation.to_string(), timeout_secs: timeout.as_secs() }),
    }
}

/// Hides credentials embedded in a URL before it reaches the logs.
pub fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let (scheme, rest) = url.split_at(scheme_end + 3);
    let Some(at) = rest.find('@') else {
        return url.to_string();
    };
    format!("{scheme}<redacted>@{}", &rest[at + 1..])
}
