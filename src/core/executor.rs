//! Delivery executor: one transmission attempt, outcome classification and
//! the retry loop around it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::core::{CoreError, PreparedEvent, RetryPolicy};
use crate::ds::{DeliveryServiceError, ReceiptId, WireTransport};

/// Shortest pause after a rate-limited attempt, whatever the server asked for.
pub const MIN_RATE_LIMIT_WAIT: Duration = Duration::from_millis(100);

/// Classified result of a single transmission attempt.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// The server accepted the event.
    Success(ReceiptId),
    /// The server asked us to come back later.
    RateLimited(Duration),
    /// Insufficient permission. Never retried.
    Forbidden { code: String, message: String },
    /// Any other transport or protocol failure.
    TransientError(DeliveryServiceError),
    /// The server's error response could not be parsed.
    Unparseable(String),
}

impl From<Result<ReceiptId, DeliveryServiceError>> for DeliveryOutcome {
    fn from(result: Result<ReceiptId, DeliveryServiceError>) -> Self {
        match result {
            Ok(receipt) => DeliveryOutcome::Success(receipt),
            Err(DeliveryServiceError::RateLimited { retry_after }) => {
                DeliveryOutcome::RateLimited(retry_after)
            }
            Err(DeliveryServiceError::Forbidden { code, message }) => {
                DeliveryOutcome::Forbidden { code, message }
            }
            Err(DeliveryServiceError::Unparseable(detail)) => DeliveryOutcome::Unparseable(detail),
            Err(e @ (DeliveryServiceError::Transport { .. } | DeliveryServiceError::Other(_))) => {
                DeliveryOutcome::TransientError(e)
            }
        }
    }
}

pub struct DeliveryExecutor<T: WireTransport> {
    transport: Arc<T>,
    retry_delay: Duration,
}

impl<T: WireTransport> DeliveryExecutor<T> {
    pub fn new(transport: Arc<T>, retry_delay: Duration) -> Self {
        Self {
            transport,
            retry_delay,
        }
    }

    /// Perform exactly one transmission and classify the result.
    pub async fn attempt(
        &self,
        conversation_id: &str,
        event: &PreparedEvent,
        txn_id: &str,
    ) -> DeliveryOutcome {
        self.transport
            .send_event(conversation_id, &event.kind, &event.payload, txn_id)
            .await
            .into()
    }

    /// Transmit until the event is accepted or fails terminally.
    ///
    /// - rate limiting sleeps for the server's delay (at least
    ///   [`MIN_RATE_LIMIT_WAIT`]) and retries under every policy
    /// - forbidden fails immediately under every policy
    /// - anything else is retried after `retry_delay` only if the policy is retryable
    pub async fn deliver(
        &self,
        conversation_id: &str,
        event: &PreparedEvent,
        txn_id: &str,
        policy: RetryPolicy,
    ) -> Result<ReceiptId, CoreError> {
        loop {
            let err = match self.attempt(conversation_id, event, txn_id).await {
                DeliveryOutcome::Success(receipt) => return Ok(receipt),
                DeliveryOutcome::RateLimited(retry_after) => {
                    let retry_after = retry_after.max(MIN_RATE_LIMIT_WAIT);
                    warn!(
                        conversation = conversation_id,
                        "[deliver]: rate limited, retrying in {retry_after:?}"
                    );
                    tokio::time::sleep(retry_after).await;
                    continue;
                }
                DeliveryOutcome::Forbidden { code, message } => {
                    error!(
                        conversation = conversation_id,
                        code = code.as_str(),
                        "[deliver]: forbidden: {message}"
                    );
                    return Err(CoreError::Forbidden { code, message });
                }
                DeliveryOutcome::Unparseable(detail) => {
                    warn!(
                        conversation = conversation_id,
                        "[deliver]: failed to parse server response: {detail}"
                    );
                    DeliveryServiceError::Unparseable(detail)
                }
                DeliveryOutcome::TransientError(e) => e,
            };

            if !policy.retryable {
                return Err(CoreError::Delivery(err));
            }
            warn!(
                conversation = conversation_id,
                "[deliver]: {err}, retrying in {:?}", self.retry_delay
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}
