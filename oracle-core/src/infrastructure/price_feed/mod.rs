//! Last-traded price sources used by pricecheck contracts.

pub mod bitstamp;

pub use bitstamp::BitstampPriceFeed;

use crate::domain::Decimal;
use crate::foundation::OracleError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

pub type Result<T> = std::result::Result<T, OracleError>;

#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Last traded price. Any failure, timeouts included, is reported as an error.
    async fn last_price(&self) -> Result<Decimal>;
}

/// Fixed-answer feed for tests and dry runs. `None` makes every fetch fail.
#[derive(Default)]
pub struct StaticPriceFeed {
    price: Mutex<Option<Decimal>>,
    calls: AtomicU64,
}

impl StaticPriceFeed {
    pub fn fixed(price: Decimal) -> Self {
        Self { price: Mutex::new(Some(price)), calls: AtomicU64::new(0) }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn set_price(&self, price: Option<Decimal>) {
        *self.price.lock() = price;
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PriceFeed for StaticPriceFeed {
    async fn last_price(&self) -> Result<Decimal> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        (*self.price.lock()).ok_or_else(|| OracleError::PriceFeedError("price unavailable".to_string()))
    }
}
