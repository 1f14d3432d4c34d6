use super::{PriceFeed, Result};
use crate::domain::Decimal;
use crate::foundation::OracleError;
use crate::infrastructure::rpc::with_timeout;
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Deserialize)]
struct Ticker {
    last: Value,
}

fn parse_last(ticker: &Ticker) -> Result<Decimal> {
    match &ticker.last {
        Value::String(raw) => Decimal::parse("last", raw),
        Value::Number(number) => Decimal::parse("last", &number.to_string()),
        other => Err(OracleError::PriceFeedError(format!("unexpected last price {}", other))),
    }
}

/// Ticker endpoint answering `{"last": "<decimal>", ...}`.
pub struct BitstampPriceFeed {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl BitstampPriceFeed {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| OracleError::ConfigError(format!("price feed http client: {}", err)))?;
        Ok(Self { http, url: url.into(), timeout })
    }

    async fn fetch(&self) -> Result<Decimal> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::PriceFeedError(format!("ticker returned http {}", status)));
        }
        let ticker: Ticker = response.json().await.map_err(|err| OracleError::PriceFeedError(format!("ticker body: {}", err)))?;
        parse_last(&ticker)
    }
}

#[async_trait]
impl PriceFeed for BitstampPriceFeed {
    async fn last_price(&self) -> Result<Decimal> {
        match with_timeout("price_feed.last_price", self.timeout, self.fetch()).await {
            Ok(price) => {
                debug!("price fetched url={} last={}", self.url, price);
                Ok(price)
            }
            Err(err) => {
                warn!("price fetch failed url={} error={}", self.url, err);
                Err(err)
            }
        }
    }
}
