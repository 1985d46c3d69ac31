//! Room crypto service trait.
//!
//! This module defines the interface to the end-to-end encryption backend.
//! Implement [`RoomCrypto`] on top of the protocol library that owns the
//! actual olm/megolm (or MLS) state.

use async_trait::async_trait;
use serde_json::Value;

use crate::crypto::CryptoError;
use crate::ds::EventKind;

/// Encryption backend consumed by the encryption gate.
#[async_trait]
pub trait RoomCrypto: Send + Sync + 'static {
    /// Whether events sent into this conversation must be encrypted.
    async fn is_encryption_required(&self, conversation_id: &str) -> Result<bool, CryptoError>;

    /// Encrypt a payload with the conversation's current group session.
    ///
    /// # Returns
    /// The encrypted envelope to send as [`EventKind::Encrypted`].
    ///
    /// # Errors
    /// Must report a missing or stale session as one of the renewal-class
    /// variants ([`CryptoError::needs_renewal`]).
    async fn encrypt(
        &self,
        conversation_id: &str,
        kind: &EventKind,
        payload: &Value,
    ) -> Result<Value, CryptoError>;

    /// Current participants of the conversation.
    async fn members(&self, conversation_id: &str) -> Result<Vec<String>, CryptoError>;

    /// Establish a new group session, or re-share the existing one, with
    /// the given members.
    async fn share_group_session(
        &self,
        conversation_id: &str,
        members: &[String],
    ) -> Result<(), CryptoError>;
}
