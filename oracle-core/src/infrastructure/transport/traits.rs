use crate::domain::InboundMessage;
use crate::foundation::{MessageId, OracleError};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, OracleError>;

/// Store-and-forward messaging channel. Delivery is best-effort; inbox entries stay until trashed.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn broadcast(&self, subject: &str, body: &str) -> Result<()>;
    async fn send_message(&self, to_address: &str, subject: &str, body: &str) -> Result<()>;
    async fn fetch_inbox(&self) -> Result<Vec<InboundMessage>>;
    async fn trash_message(&self, message_id: &MessageId) -> Result<()>;
}
