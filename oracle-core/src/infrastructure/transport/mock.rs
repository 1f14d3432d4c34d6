use super::traits::{Result, Transport};
use crate::domain::InboundMessage;
use crate::foundation::{MessageId, OracleError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    /// `None` for broadcasts.
    pub to_address: Option<String>,
    pub subject: String,
    pub body: String,
}

/// In-memory transport: a scripted inbox plus a log of everything sent.
#[derive(Default)]
pub struct MockTransport {
    inbox: Mutex<Vec<InboundMessage>>,
    sent: Mutex<Vec<SentMessage>>,
    trashed: Mutex<Vec<MessageId>>,
    fail_sends: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_inbound(&self, message: InboundMessage) {
        self.inbox.lock().push(message);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn broadcasts(&self) -> Vec<SentMessage> {
        self.sent.lock().iter().filter(|m| m.to_address.is_none()).cloned().collect()
    }

    pub fn broadcasts_with_subject(&self, subject: &str) -> Vec<SentMessage> {
        self.broadcasts().into_iter().filter(|m| m.subject == subject).collect()
    }

    pub fn trashed(&self) -> Vec<MessageId> {
        self.trashed.lock().clone()
    }

    pub fn inbox_len(&self) -> usize {
        self.inbox.lock().len()
    }

    /// Makes every subsequent broadcast/send fail with a transport error.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Relaxed);
    }

    fn record(&self, to_address: Option<&str>, subject: &str, body: &str) -> Result<()> {
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(OracleError::transport("mock send", "sends disabled"));
        }
        self.sent.lock().push(SentMessage { to_address: to_address.map(str::to_string), subject: subject.to_string(), body: body.to_string() });
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn broadcast(&self, subject: &str, body: &str) -> Result<()> {
        self.record(None, subject, body)
    }

    async fn send_message(&self, to_address: &str, subject: &str, body: &str) -> Result<()> {
        self.record(Some(to_address), subject, body)
    }

    async fn fetch_inbox(&self) -> Result<Vec<InboundMessage>> {
        Ok(self.inbox.lock().clone())
    }

    async fn trash_message(&self, message_id: &MessageId) -> Result<()> {
        self.inbox.lock().retain(|m| &m.message_id != message_id);
        self.trashed.lock().push(message_id.clone());
        Ok(())
    }
}
