//! Infrastructure layer: I/O and external integrations.

pub mod config;
pub mod evaluator;
pub mod logging;
pub mod price_feed;
pub mod rpc;
pub mod storage;
pub mod transport;
pub mod wallet;
