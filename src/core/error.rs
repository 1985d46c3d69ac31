//! Core library errors.

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::ds::DeliveryServiceError;

/// Final, non-retried failure of one outbound request.
///
/// These never cross the submission boundary: the dispatcher logs them and
/// resolves the request's receipt with `None`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Encryption state lookup or encryption failed and the policy forbids retrying.
    #[error("Encryption error: {0}")]
    Encryption(CryptoError),

    /// Re-establishing the group session failed and the policy forbids retrying.
    #[error("Session renewal failed: {0}")]
    SessionRenewal(CryptoError),

    /// The server refused the event. Never retried.
    #[error("Forbidden ({code}): {message}")]
    Forbidden { code: String, message: String },

    /// Transport failure and the policy forbids retrying.
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryServiceError),

    /// The dispatcher worker is no longer running.
    #[error("Dispatcher closed")]
    DispatcherClosed,
}
