//! Bitmessage adapter over the PyBitmessage XML-RPC API.
//!
//! The address book is explicit state: call [`BitmessageTransport::init`] once at startup
//! (creates an address when the node has none) and [`BitmessageTransport::refresh_addresses`]
//! whenever the node's identities may have changed.

pub mod xmlrpc;

use self::xmlrpc::{decode_response, encode_call, Param};
use crate::domain::InboundMessage;
use crate::foundation::{MessageId, OracleError};
use crate::infrastructure::rpc::redact_url;
use crate::infrastructure::transport::traits::{Result, Transport};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::{debug, info, trace, warn};
use parking_lot::RwLock;
use serde::Deserialize;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct BitmessageConnection {
    pub api_url: String,
    pub api_user: Option<String>,
    pub api_password: Option<String>,
    pub default_address_label: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitmessageAddress {
    pub address: String,
    pub label: String,
    pub enabled: bool,
}

#[derive(Clone, Debug, Default)]
struct AddressBook {
    addresses: Vec<BitmessageAddress>,
    default_address: Option<String>,
}

#[derive(Deserialize)]
struct AddressListWire {
    addresses: Vec<AddressWire>,
}

#[derive(Deserialize)]
struct AddressWire {
    address: String,
    #[serde(default)]
    label: String,
    #[serde(default = "default_true")]
    enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct InboxWire {
    #[serde(rename = "inboxMessages")]
    inbox_messages: Vec<InboxMessageWire>,
}

#[derive(Deserialize)]
struct InboxMessageWire {
    msgid: String,
    #[serde(rename = "toAddress")]
    to_address: String,
    #[serde(rename = "fromAddress")]
    from_address: String,
    subject: String,
    message: String,
    #[serde(rename = "receivedTime")]
    received_time: serde_json::Value,
}

pub struct BitmessageTransport {
    http: reqwest::Client,
    connection: BitmessageConnection,
    book: RwLock<AddressBook>,
}

impl BitmessageTransport {
    pub fn new(connection: BitmessageConnection) -> std::result::Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(connection.timeout)
            .build()
            .map_err(|err| OracleError::ConfigError(format!("bitmessage http client: {}", err)))?;
        Ok(Self { http, connection, book: RwLock::new(AddressBook::default()) })
    }

    /// Loads the address book, creating a random address when the node has none.
    pub async fn init(&self) -> Result<()> {
        self.refresh_addresses().await?;
        if self.book.read().addresses.is_empty() {
            info!("bitmessage has no addresses; creating one label={}", self.connection.default_address_label);
            let label = STANDARD.encode(self.connection.default_address_label.as_bytes());
            self.call("createRandomAddress", &[Param::Str(&label)]).await?;
            self.refresh_addresses().await?;
        }
        match self.default_address() {
            Some(address) => {
                info!("bitmessage transport ready default_address={}", address);
                Ok(())
            }
            None => Err(OracleError::transport("bitmessage init", "no usable address after createRandomAddress")),
        }
    }

    pub async fn refresh_addresses(&self) -> Result<()> {
        let raw = self.call("listAddresses2", &[]).await?;
        let wire: AddressListWire = serde_json::from_str(&raw)?;
        let addresses = wire
            .addresses
            .into_iter()
            .map(|a| BitmessageAddress { label: decode_b64_lossy(&a.label), address: a.address, enabled: a.enabled })
            .collect::<Vec<_>>();

        let default_address = addresses
            .iter()
            .find(|a| a.label == self.connection.default_address_label)
            .or_else(|| addresses.first())
            .map(|a| a.address.clone());
        debug!("bitmessage address book refreshed count={} default={:?}", addresses.len(), default_address);
        *self.book.write() = AddressBook { addresses, default_address };
        Ok(())
    }

    pub fn default_address(&self) -> Option<String> {
        self.book.read().default_address.clone()
    }

    pub fn addresses(&self) -> Vec<BitmessageAddress> {
        self.book.read().addresses.clone()
    }

    fn require_default_address(&self, operation: &str) -> Result<String> {
        self.default_address().ok_or_else(|| OracleError::transport(operation, "address book not initialized"))
    }

    async fn call(&self, method: &str, params: &[Param<'_>]) -> Result<String> {
        trace!("bitmessage call url={} method={}", redact_url(&self.connection.api_url), method);
        let mut request =
            self.http.post(&self.connection.api_url).header("Content-Type", "text/xml").body(encode_call(method, params));
        if let Some(user) = self.connection.api_user.as_deref() {
            request = request.basic_auth(user, self.connection.api_password.as_deref());
        }
        let response = request.send().await.map_err(|err| {
            warn!("bitmessage call failed method={} error={}", method, err);
            if err.is_timeout() {
                OracleError::ExternalTimeout { operation: format!("bitmessage {}", method), timeout_secs: self.connection.timeout.as_secs() }
            } else {
                OracleError::transport(format!("bitmessage {}", method), err)
            }
        })?;
        let text = response.text().await.map_err(|err| OracleError::transport(format!("bitmessage {}", method), err))?;
        let value = decode_response(method, &text)?;
        // API errors come back as a plain string result
        if value.starts_with("API Error") {
            return Err(OracleError::transport(format!("bitmessage {}", method), value));
        }
        Ok(value)
    }
}

fn decode_b64_lossy(encoded: &str) -> String {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    match STANDARD.decode(compact) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => encoded.to_string(),
    }
}

fn parse_inbox_message(wire: InboxMessageWire, own_addresses: &[BitmessageAddress]) -> Option<InboundMessage> {
    let received_time = match &wire.received_time {
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok()?,
        serde_json::Value::Number(n) => n.as_u64()?,
        _ => return None,
    };
    let direct = own_addresses.iter().any(|a| a.address == wire.to_address);
    Some(InboundMessage {
        message_id: MessageId::new(wire.msgid),
        from_address: wire.from_address,
        to_address: wire.to_address,
        received_time,
        subject: decode_b64_lossy(&wire.subject),
        body: decode_b64_lossy(&wire.message),
        direct,
    })
}

#[async_trait]
impl Transport for BitmessageTransport {
    async fn broadcast(&self, subject: &str, body: &str) -> Result<()> {
        let from = self.require_default_address("bitmessage sendBroadcast")?;
        let subject_b64 = STANDARD.encode(subject.as_bytes());
        let body_b64 = STANDARD.encode(body.as_bytes());
        let ack = self.call("sendBroadcast", &[Param::Str(&from), Param::Str(&subject_b64), Param::Str(&body_b64)]).await?;
        debug!("bitmessage broadcast sent subject={} ack={}", subject, ack);
        Ok(())
    }

    async fn send_message(&self, to_address: &str, subject: &str, body: &str) -> Result<()> {
        let from = self.require_default_address("bitmessage sendMessage")?;
        let subject_b64 = STANDARD.encode(subject.as_bytes());
        let body_b64 = STANDARD.encode(body.as_bytes());
        let ack = self
            .call("sendMessage", &[Param::Str(to_address), Param::Str(&from), Param::Str(&subject_b64), Param::Str(&body_b64)])
            .await?;
        debug!("bitmessage message sent to={} subject={} ack={}", to_address, subject, ack);
        Ok(())
    }

    async fn fetch_inbox(&self) -> Result<Vec<InboundMessage>> {
        let raw = self.call("getAllInboxMessages", &[]).await?;
        let wire: InboxWire = serde_json::from_str(&raw)?;
        let own = self.addresses();
        let total = wire.inbox_messages.len();
        let messages = wire.inbox_messages.into_iter().filter_map(|m| parse_inbox_message(m, &own)).collect::<Vec<_>>();
        if messages.len() != total {
            warn!("bitmessage inbox entries skipped unparseable={}", total - messages.len());
        }
        Ok(messages)
    }

    async fn trash_message(&self, message_id: &MessageId) -> Result<()> {
        self.call("trashMessage", &[Param::Str(message_id.as_str())]).await?;
        trace!("bitmessage message trashed msgid={}", message_id);
        Ok(())
    }
}
