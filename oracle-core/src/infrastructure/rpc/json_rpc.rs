use crate::foundation::OracleError;
use crate::infrastructure::rpc::{redact_url, CircuitBreaker, CircuitBreakerConfig};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Error object returned by the remote node (as opposed to a transport failure).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// JSON-RPC 1.0 client in the dialect bitcoind speaks (basic auth, `{result, error, id}` replies).
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    user: Option<String>,
    password: Option<String>,
    next_id: AtomicU64,
    breaker: CircuitBreaker,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, user: Option<String>, password: Option<String>, timeout: Duration) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| OracleError::ConfigError(format!("json-rpc http client: {}", err)))?;
        Ok(Self {
            http,
            url: url.into(),
            user,
            password,
            next_id: AtomicU64::new(1),
            breaker: CircuitBreaker::new("json_rpc", CircuitBreakerConfig::default()),
        })
    }

    /// Performs a call. The outer error is a transport failure; the inner one is the node's reply.
    pub async fn call_raw(&self, method: &str, params: Value) -> Result<Result<Value, RpcErrorObject>, OracleError> {
        if !self.breaker.allow() {
            return Err(OracleError::wallet(method, "circuit breaker open"));
        }
        let started = Instant::now();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!("json-rpc request url={} method={} id={}", redact_url(&self.url), method, id);

        let mut request = self.http.post(&self.url).json(&RpcRequest { jsonrpc: "1.0", id, method, params: &params });
        if let Some(user) = self.user.as_deref() {
            request = request.basic_auth(user, self.password.as_deref());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                self.breaker.record_failure();
                warn!("json-rpc transport failure method={} error={}", method, err);
                if err.is_timeout() {
                    return Err(OracleError::ExternalTimeout { operation: method.to_string(), timeout_secs: 0 });
                }
                return Err(OracleError::wallet(method, err));
            }
        };
        let status = response.status();
        let body: RpcResponse = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                self.breaker.record_failure();
                return Err(OracleError::wallet(method, format!("status={} undecodable reply: {}", status, err)));
            }
        };
        self.breaker.record_success();
        debug!("json-rpc reply method={} id={} status={} elapsed_ms={}", method, id, status, started.elapsed().as_millis());

        match body.error {
            Some(error) => Ok(Err(error)),
            None => Ok(Ok(body.result)),
        }
    }
}
