use crate::application::locks::KeyedLocks;
use crate::domain::EnginePolicy;
use crate::foundation::Result;
use crate::infrastructure::evaluator::ConditionEvaluator;
use crate::infrastructure::price_feed::PriceFeed;
use crate::infrastructure::rpc::with_timeout;
use crate::infrastructure::storage::Storage;
use crate::infrastructure::transport::Transport;
use crate::infrastructure::wallet::Wallet;
use log::warn;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

/// Everything a handler may touch. Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct OracleContext {
    pub policy: EnginePolicy,
    pub storage: Arc<dyn Storage>,
    pub wallet: Arc<dyn Wallet>,
    pub transport: Arc<dyn Transport>,
    pub price_feed: Arc<dyn PriceFeed>,
    pub evaluator: Arc<dyn ConditionEvaluator>,
    pub locks: Arc<KeyedLocks>,
}

impl OracleContext {
    pub fn new(
        policy: EnginePolicy,
        storage: Arc<dyn Storage>,
        wallet: Arc<dyn Wallet>,
        transport: Arc<dyn Transport>,
        price_feed: Arc<dyn PriceFeed>,
        evaluator: Arc<dyn ConditionEvaluator>,
    ) -> Self {
        Self { policy, storage, wallet, transport, price_feed, evaluator, locks: Arc::new(KeyedLocks::default()) }
    }

    /// Runs an external call under the configured timeout.
    pub async fn call<T, Fut>(&self, operation: &str, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        with_timeout(operation, self.policy.external_call_timeout, fut).await
    }

    /// Broadcasts a JSON body. Delivery failures are logged and swallowed: the state change they
    /// announce is already durable.
    pub async fn broadcast_json<T: Serialize>(&self, subject: &str, body: &T) -> bool {
        let body = match serde_json::to_string(body) {
            Ok(body) => body,
            Err(err) => {
                warn!("broadcast encoding failed subject={} error={}", subject, err);
                return false;
            }
        };
        match self.call("transport.broadcast", self.transport.broadcast(subject, &body)).await {
            Ok(()) => true,
            Err(err) => {
                warn!("broadcast failed subject={} error={}", subject, err);
                false
            }
        }
    }
}
