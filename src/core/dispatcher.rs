//! Single serializing worker for outbound requests.
//!
//! Producers push [`OutboundRequest`]s into a bounded queue; one task drains
//! it and runs every request through the [`EncryptionGate`] and the
//! [`DeliveryExecutor`] before looking at the next one. Submission order is
//! therefore delivery-attempt order, and group session renewal never races.
//!
//! ```text
//!  producer ─┐
//!  producer ─┼─▶ mpsc(queue_capacity) ─▶ worker ─▶ gate ─▶ executor ─▶ transport
//!  producer ─┘                              │
//!                                           └─▶ receipt (oneshot) per request
//! ```

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::OutboxConfig;
use crate::core::{
    CoreError, DeliveryExecutor, EncryptionGate, OutboundRequest, RetryPolicy,
};
use crate::crypto::RoomCrypto;
use crate::ds::{EventKind, ReceiptId, WireTransport};

/// Cloneable submission handle of the dispatcher worker.
///
/// The worker runs until every clone has been dropped and the queue is
/// drained.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    tx: mpsc::Sender<OutboundRequest>,
}

impl Dispatcher {
    /// Start the worker.
    ///
    /// # Returns
    /// The submission handle and the worker's join handle. The join handle
    /// completes after the last `Dispatcher` clone is dropped and every
    /// queued request has been resolved.
    pub fn spawn<C, T>(
        crypto: Arc<C>,
        transport: Arc<T>,
        config: &OutboxConfig,
    ) -> (Self, JoinHandle<()>)
    where
        C: RoomCrypto,
        T: WireTransport,
    {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let worker = DispatchWorker {
            rx,
            gate: EncryptionGate::new(crypto, config.retry_delay),
            executor: DeliveryExecutor::new(transport, config.retry_delay),
        };
        let handle = tokio::spawn(worker.run());
        (Self { tx }, handle)
    }

    /// Queue a request.
    ///
    /// Waits only while the queue is full. Never fails: if the worker is
    /// gone the request's receipt is resolved with `None` right away.
    pub async fn submit(&self, request: OutboundRequest) {
        if let Err(mpsc::error::SendError(request)) = self.tx.send(request).await {
            warn!(
                conversation = request.conversation_id(),
                "[submit]: {}", CoreError::DispatcherClosed
            );
            request.resolve(None);
        }
    }

    /// Submit a request and wait for its receipt.
    ///
    /// # Returns
    /// `Some(receipt_id)` once the event is on the server, `None` on terminal failure.
    pub async fn send(
        &self,
        conversation_id: &str,
        kind: EventKind,
        payload: Value,
        retry_policy: RetryPolicy,
    ) -> Option<ReceiptId> {
        let (request, receipt) = OutboundRequest::new(conversation_id, kind, payload, retry_policy);
        self.submit(request).await;
        receipt.wait().await
    }

    /// Whether the worker has stopped accepting requests.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct DispatchWorker<C: RoomCrypto, T: WireTransport> {
    rx: mpsc::Receiver<OutboundRequest>,
    gate: EncryptionGate<C>,
    executor: DeliveryExecutor<T>,
}

impl<C: RoomCrypto, T: WireTransport> DispatchWorker<C, T> {
    async fn run(mut self) {
        info!("[dispatcher]: worker started");
        while let Some(request) = self.rx.recv().await {
            let receipt = match self.process(&request).await {
                Ok(receipt) => {
                    debug!(
                        conversation = request.conversation_id(),
                        "[dispatcher]: sent {} as {receipt}",
                        request.kind()
                    );
                    Some(receipt)
                }
                Err(e) => {
                    error!(
                        conversation = request.conversation_id(),
                        txn_id = request.txn_id(),
                        "[dispatcher]: giving up on {}: {e}",
                        request.kind()
                    );
                    None
                }
            };
            request.resolve(receipt);
        }
        info!("[dispatcher]: worker stopped");
    }

    async fn process(&mut self, request: &OutboundRequest) -> Result<ReceiptId, CoreError> {
        let policy = request.retry_policy();
        let prepared = self
            .gate
            .prepare(
                request.conversation_id(),
                request.kind(),
                request.payload(),
                policy,
            )
            .await?;
        self.executor
            .deliver(request.conversation_id(), &prepared, request.txn_id(), policy)
            .await
    }
}
