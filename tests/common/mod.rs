//! Shared mock collaborators for the integration tests.
#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use group_outbox::{
    CryptoError, DeliveryServiceError, EventKind, OutboxConfig, ReceiptId, RoomCrypto,
    WireTransport,
};

// ─────────────────────────── Mock Transport ───────────────────────────

#[derive(Debug, Clone)]
pub struct SentEvent {
    pub conversation: String,
    pub kind: EventKind,
    pub payload: Value,
    pub txn_id: String,
}

/// Records every send; replays scripted failures first, then succeeds.
#[derive(Clone, Default)]
pub struct MockTransport {
    calls: Arc<Mutex<Vec<SentEvent>>>,
    script: Arc<Mutex<VecDeque<DeliveryServiceError>>>,
    latency: Duration,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send takes this long before answering.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// The next sends fail with these errors, in order.
    pub fn fail_with(&self, errors: impl IntoIterator<Item = DeliveryServiceError>) {
        self.script.lock().unwrap().extend(errors);
    }

    pub fn calls(&self) -> Vec<SentEvent> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Poll until at least `n` sends have started.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.call_count() < n {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

#[async_trait]
impl WireTransport for MockTransport {
    async fn send_event(
        &self,
        conversation_id: &str,
        kind: &EventKind,
        payload: &Value,
        txn_id: &str,
    ) -> Result<ReceiptId, DeliveryServiceError> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(SentEvent {
                conversation: conversation_id.to_string(),
                kind: kind.clone(),
                payload: payload.clone(),
                txn_id: txn_id.to_string(),
            });
            calls.len()
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(err) => Err(err),
            None => Ok(format!("$event{call_number}")),
        }
    }
}

pub fn rate_limited(ms: u64) -> DeliveryServiceError {
    DeliveryServiceError::RateLimited {
        retry_after: Duration::from_millis(ms),
    }
}

pub fn forbidden() -> DeliveryServiceError {
    DeliveryServiceError::Forbidden {
        code: "M_FORBIDDEN".to_string(),
        message: "You don't have permission to post".to_string(),
    }
}

pub fn server_error() -> DeliveryServiceError {
    DeliveryServiceError::Transport {
        status: 502,
        code: "M_UNKNOWN".to_string(),
        message: "bad gateway".to_string(),
    }
}

// ─────────────────────────── Mock Crypto ───────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoCall {
    Lookup(String),
    Encrypt(String),
    Members(String),
    Share(String, Vec<String>),
}

/// Encrypts for rooms marked encrypted; scripted failures are consumed first.
#[derive(Clone, Default)]
pub struct MockCrypto {
    calls: Arc<Mutex<Vec<CryptoCall>>>,
    encrypted_rooms: Arc<Mutex<HashSet<String>>>,
    lookup_failures: Arc<Mutex<VecDeque<CryptoError>>>,
    encrypt_failures: Arc<Mutex<VecDeque<CryptoError>>>,
    members_failures: Arc<Mutex<VecDeque<CryptoError>>>,
    share_failures: Arc<Mutex<VecDeque<CryptoError>>>,
}

impl MockCrypto {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encrypt_room(&self, room: &str) {
        self.encrypted_rooms.lock().unwrap().insert(room.to_string());
    }

    pub fn fail_lookup(&self, errors: impl IntoIterator<Item = CryptoError>) {
        self.lookup_failures.lock().unwrap().extend(errors);
    }

    pub fn fail_encrypt(&self, errors: impl IntoIterator<Item = CryptoError>) {
        self.encrypt_failures.lock().unwrap().extend(errors);
    }

    pub fn fail_members(&self, errors: impl IntoIterator<Item = CryptoError>) {
        self.members_failures.lock().unwrap().extend(errors);
    }

    pub fn fail_share(&self, errors: impl IntoIterator<Item = CryptoError>) {
        self.share_failures.lock().unwrap().extend(errors);
    }

    pub fn calls(&self) -> Vec<CryptoCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn renewals(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, CryptoCall::Share(..)))
            .count()
    }

    fn record(&self, call: CryptoCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_failure(queue: &Mutex<VecDeque<CryptoError>>) -> Option<CryptoError> {
        queue.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl RoomCrypto for MockCrypto {
    async fn is_encryption_required(&self, conversation_id: &str) -> Result<bool, CryptoError> {
        self.record(CryptoCall::Lookup(conversation_id.to_string()));
        if let Some(err) = Self::next_failure(&self.lookup_failures) {
            return Err(err);
        }
        Ok(self.encrypted_rooms.lock().unwrap().contains(conversation_id))
    }

    async fn encrypt(
        &self,
        conversation_id: &str,
        kind: &EventKind,
        payload: &Value,
    ) -> Result<Value, CryptoError> {
        self.record(CryptoCall::Encrypt(conversation_id.to_string()));
        if let Some(err) = Self::next_failure(&self.encrypt_failures) {
            return Err(err);
        }
        Ok(json!({
            "algorithm": "m.megolm.v1.aes-sha2",
            "ciphertext": format!("{}:{}", kind.as_str(), payload),
        }))
    }

    async fn members(&self, conversation_id: &str) -> Result<Vec<String>, CryptoError> {
        self.record(CryptoCall::Members(conversation_id.to_string()));
        if let Some(err) = Self::next_failure(&self.members_failures) {
            return Err(err);
        }
        Ok(vec![
            "@alice:example.org".to_string(),
            "@bob:example.org".to_string(),
        ])
    }

    async fn share_group_session(
        &self,
        conversation_id: &str,
        members: &[String],
    ) -> Result<(), CryptoError> {
        self.record(CryptoCall::Share(
            conversation_id.to_string(),
            members.to_vec(),
        ));
        if let Some(err) = Self::next_failure(&self.share_failures) {
            return Err(err);
        }
        Ok(())
    }
}

// ─────────────────────────── Helpers ───────────────────────────

pub const ROOM: &str = "!ops:example.org";

pub fn test_config() -> OutboxConfig {
    OutboxConfig {
        retry_delay: Duration::from_millis(50),
        stream_retry_delay: Duration::from_millis(50),
        ..OutboxConfig::default()
    }
}

pub fn body(text: &str) -> Value {
    json!({"msgtype": "m.text", "body": text})
}
