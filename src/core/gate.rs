//! Encryption gate.
//!
//! Decides per conversation whether a payload has to be encrypted and keeps
//! the conversation's group session usable. The gate is owned by the
//! dispatcher worker, so session renewal for one request always finishes
//! before the next request is looked at.
//!
//! ```text
//!   Absent ──┐
//!   Expired ─┼── renew (members + share) ──▶ Active ── encrypt ──▶ done
//!   Unshared ┘                                 │
//!                                              └─ other failure ──▶ transient retry
//! ```

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::{CoreError, RetryPolicy};
use crate::crypto::{CryptoError, RoomCrypto};
use crate::ds::EventKind;

/// Group session state of one conversation, as last observed by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupSessionState {
    /// No session has been seen for this conversation.
    #[default]
    Absent,
    /// Session usable for encryption.
    Active,
    /// Session rotated out by the backend.
    Expired,
    /// Session exists but not every current member has it.
    Unshared,
}

impl GroupSessionState {
    fn from_renewal_error(err: &CryptoError) -> Option<Self> {
        match err {
            CryptoError::SessionExpired => Some(GroupSessionState::Expired),
            CryptoError::SessionNotShared => Some(GroupSessionState::Unshared),
            CryptoError::NoGroupSession => Some(GroupSessionState::Absent),
            _ => None,
        }
    }
}

impl Display for GroupSessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            GroupSessionState::Absent => "Absent",
            GroupSessionState::Active => "Active",
            GroupSessionState::Expired => "Expired",
            GroupSessionState::Unshared => "Unshared",
        };
        write!(f, "{state}")
    }
}

/// Event ready for the wire: either the original payload or its encrypted envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedEvent {
    pub kind: EventKind,
    pub payload: Value,
}

pub struct EncryptionGate<C: RoomCrypto> {
    crypto: Arc<C>,
    sessions: HashMap<String, GroupSessionState>,
    retry_delay: Duration,
}

impl<C: RoomCrypto> EncryptionGate<C> {
    pub fn new(crypto: Arc<C>, retry_delay: Duration) -> Self {
        Self {
            crypto,
            sessions: HashMap::new(),
            retry_delay,
        }
    }

    /// Last observed session state for a conversation.
    pub fn session_state(&self, conversation_id: &str) -> GroupSessionState {
        self.sessions
            .get(conversation_id)
            .copied()
            .unwrap_or_default()
    }

    /// Turn a plaintext payload into what goes on the wire.
    ///
    /// Transient failures (state lookup, encryption, session renewal) are
    /// retried after `retry_delay` while the policy allows it.
    ///
    /// # Returns
    /// The payload unchanged for unencrypted conversations, otherwise the
    /// encrypted envelope with kind [`EventKind::Encrypted`].
    pub async fn prepare(
        &mut self,
        conversation_id: &str,
        kind: &EventKind,
        payload: &Value,
        policy: RetryPolicy,
    ) -> Result<PreparedEvent, CoreError> {
        loop {
            match self.try_prepare(conversation_id, kind, payload).await {
                Ok(prepared) => return Ok(prepared),
                Err(e) if !policy.retryable => return Err(e),
                Err(e) => {
                    warn!(
                        conversation = conversation_id,
                        "[prepare]: {e}, retrying in {:?}", self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    async fn try_prepare(
        &mut self,
        conversation_id: &str,
        kind: &EventKind,
        payload: &Value,
    ) -> Result<PreparedEvent, CoreError> {
        let required = self
            .crypto
            .is_encryption_required(conversation_id)
            .await
            .map_err(CoreError::Encryption)?;
        if !required {
            return Ok(PreparedEvent {
                kind: kind.clone(),
                payload: payload.clone(),
            });
        }

        let encrypted = match self.crypto.encrypt(conversation_id, kind, payload).await {
            Ok(encrypted) => encrypted,
            Err(e) if e.needs_renewal() => {
                self.record_failure(conversation_id, &e);
                info!(
                    conversation = conversation_id,
                    "[prepare]: {e}, renewing group session"
                );
                self.renew(conversation_id).await?;

                // One attempt only: a second renewal-class failure is a plain
                // transient error for the outer retry loop.
                match self.crypto.encrypt(conversation_id, kind, payload).await {
                    Ok(encrypted) => encrypted,
                    Err(e) => {
                        self.record_failure(conversation_id, &e);
                        return Err(CoreError::Encryption(e));
                    }
                }
            }
            Err(e) => return Err(CoreError::Encryption(e)),
        };

        self.sessions
            .insert(conversation_id.to_string(), GroupSessionState::Active);
        Ok(PreparedEvent {
            kind: EventKind::Encrypted,
            payload: encrypted,
        })
    }

    async fn renew(&mut self, conversation_id: &str) -> Result<(), CoreError> {
        let members = self
            .crypto
            .members(conversation_id)
            .await
            .map_err(CoreError::SessionRenewal)?;
        debug!(
            conversation = conversation_id,
            "[renew]: sharing group session with {} members",
            members.len()
        );
        self.crypto
            .share_group_session(conversation_id, &members)
            .await
            .map_err(CoreError::SessionRenewal)?;

        self.sessions
            .insert(conversation_id.to_string(), GroupSessionState::Active);
        Ok(())
    }

    fn record_failure(&mut self, conversation_id: &str, err: &CryptoError) {
        if let Some(state) = GroupSessionState::from_renewal_error(err) {
            self.sessions.insert(conversation_id.to_string(), state);
        }
    }
}
