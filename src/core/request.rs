//! Outbound requests and their one-shot receipts.

use serde_json::Value;
use tokio::sync::oneshot;

use crate::ds::{EventKind, ReceiptId};

/// How a request reacts to transient failures.
///
/// Rate limiting is retried under every policy; a forbidden response is
/// never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    pub retryable: bool,
}

impl RetryPolicy {
    /// Keep retrying transient failures until the request goes through.
    pub const fn retryable() -> Self {
        Self { retryable: true }
    }

    /// Fail on the first transient failure.
    pub const fn once() -> Self {
        Self { retryable: false }
    }
}

/// A single "send this to that conversation" request.
///
/// Built with [`OutboundRequest::new`], which also hands back the
/// [`ReceiptRx`] the caller awaits. Consumed exactly once by the dispatcher.
#[derive(Debug)]
pub struct OutboundRequest {
    conversation_id: String,
    kind: EventKind,
    payload: Value,
    retry_policy: RetryPolicy,
    txn_id: String,
    sink: oneshot::Sender<Option<ReceiptId>>,
}

impl OutboundRequest {
    /// Create a request and the receiver for its receipt.
    ///
    /// # Arguments
    /// * `conversation_id` - Target conversation
    /// * `kind` - Wire event type of the plaintext payload
    /// * `payload` - Event content
    /// * `retry_policy` - Whether transient failures are retried
    pub fn new(
        conversation_id: &str,
        kind: EventKind,
        payload: Value,
        retry_policy: RetryPolicy,
    ) -> (Self, ReceiptRx) {
        let (sink, rx) = oneshot::channel();
        let request = Self {
            conversation_id: conversation_id.to_string(),
            kind,
            payload,
            retry_policy,
            txn_id: uuid::Uuid::new_v4().to_string(),
            sink,
        };
        (request, ReceiptRx { rx })
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Client transaction id shared by every attempt of this request.
    pub fn txn_id(&self) -> &str {
        &self.txn_id
    }

    /// Write the final receipt. Consumes the request, so it happens once.
    pub(crate) fn resolve(self, receipt: Option<ReceiptId>) {
        // The producer may have stopped waiting; that's fine.
        let _ = self.sink.send(receipt);
    }
}

/// Receiving end of a request's receipt.
#[derive(Debug)]
pub struct ReceiptRx {
    rx: oneshot::Receiver<Option<ReceiptId>>,
}

impl ReceiptRx {
    /// Wait for the outcome of the request.
    ///
    /// # Returns
    /// `Some(receipt_id)` on success, `None` on terminal failure. Also
    /// `None` if the request was dropped without being resolved.
    pub async fn wait(self) -> Option<ReceiptId> {
        self.rx.await.ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_delivers_receipt() {
        let (request, rx) = OutboundRequest::new(
            "!room:example.org",
            EventKind::RoomMessage,
            json!({"body": "hi"}),
            RetryPolicy::retryable(),
        );
        assert_eq!(request.conversation_id(), "!room:example.org");
        assert!(request.retry_policy().retryable);

        request.resolve(Some("$event".to_string()));
        assert_eq!(rx.wait().await.as_deref(), Some("$event"));
    }

    #[tokio::test]
    async fn test_dropped_request_yields_failure_marker() {
        let (request, rx) = OutboundRequest::new(
            "!room:example.org",
            EventKind::RoomMessage,
            json!({}),
            RetryPolicy::once(),
        );
        drop(request);
        assert_eq!(rx.wait().await, None);
    }

    #[test]
    fn test_each_request_gets_its_own_txn_id() {
        let (a, _) = OutboundRequest::new("!r", EventKind::RoomMessage, json!({}), RetryPolicy::once());
        let (b, _) = OutboundRequest::new("!r", EventKind::RoomMessage, json!({}), RetryPolicy::once());
        assert!(!a.txn_id().is_empty());
        assert_ne!(a.txn_id(), b.txn_id());
    }
}
