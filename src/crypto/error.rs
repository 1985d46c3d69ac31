//! Error types for room crypto operations.

/// Failures reported by a [`RoomCrypto`](super::RoomCrypto) backend.
///
/// The first three variants describe a missing or stale group session and
/// are recoverable by re-sharing the session with the current membership.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("Group session expired")]
    SessionExpired,

    #[error("Group session not shared with current members")]
    SessionNotShared,

    #[error("No group session for this conversation")]
    NoGroupSession,

    #[error("Failed to look up encryption state: {0}")]
    StateLookup(String),

    #[error("Failed to fetch members: {0}")]
    Membership(String),

    #[error("Crypto backend error: {0}")]
    Other(String),
}

impl CryptoError {
    /// Whether re-sharing the group session can resolve this failure.
    pub fn needs_renewal(&self) -> bool {
        matches!(
            self,
            CryptoError::SessionExpired | CryptoError::SessionNotShared | CryptoError::NoGroupSession
        )
    }
}
