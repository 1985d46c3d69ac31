//! Transport-agnostic wire event kinds + delivery service interface.
use std::fmt::Display;

use async_trait::async_trait;
use serde_json::Value;

use crate::ds::DeliveryServiceError;

/// Server-assigned identifier of a transmitted event.
pub type ReceiptId = String;

/// The wire type of an outbound event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Plain room message (`m.room.message`).
    RoomMessage,
    /// Annotation/reaction (`m.reaction`).
    Reaction,
    /// Encrypted envelope (`m.room.encrypted`). Set by the encryption gate.
    Encrypted,
    /// Any other event type, carried verbatim.
    Custom(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::RoomMessage => "m.room.message",
            EventKind::Reaction => "m.reaction",
            EventKind::Encrypted => "m.room.encrypted",
            EventKind::Custom(kind) => kind,
        }
    }
}

impl From<&str> for EventKind {
    fn from(kind: &str) -> Self {
        match kind {
            "m.room.message" => EventKind::RoomMessage,
            "m.reaction" => EventKind::Reaction,
            "m.room.encrypted" => EventKind::Encrypted,
            other => EventKind::Custom(other.to_string()),
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The wire transport that actually puts an event on the network.
///
/// One call is one transmission attempt. Retrying is the caller's business;
/// implementations must not retry on their own, and must report failures as
/// a classified [`DeliveryServiceError`] (see
/// [`DeliveryServiceError::from_response`] for HTTP-style servers).
#[async_trait]
pub trait WireTransport: Send + Sync + 'static {
    /// Send one event into a conversation and return the server receipt.
    ///
    /// # Arguments
    /// * `conversation_id` - Target conversation
    /// * `kind` - Wire event type
    /// * `payload` - Serialized content (possibly an encrypted envelope)
    /// * `txn_id` - Client transaction id, identical across retries of one request
    async fn send_event(
        &self,
        conversation_id: &str,
        kind: &EventKind,
        payload: &Value,
        txn_id: &str,
    ) -> Result<ReceiptId, DeliveryServiceError>;
}
