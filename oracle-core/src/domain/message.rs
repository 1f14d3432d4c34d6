use crate::foundation::MessageId;
use serde::{Deserialize, Serialize};

/// A message pulled from the transport inbox, with its delivery metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message_id: MessageId,
    pub from_address: String,
    pub to_address: String,
    /// Unix seconds as reported by the transport.
    pub received_time: u64,
    pub subject: String,
    pub body: String,
    /// Addressed to one of our addresses rather than a broadcast channel.
    #[serde(default)]
    pub direct: bool,
}
