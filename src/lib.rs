//! Outbound delivery core for an end-to-end-encrypted group messaging client.
//!
//! Turns "send this content to this conversation" into a transmitted,
//! correctly encrypted wire event:
//!
//! ```text
//! producers ─▶ Dispatcher ─▶ EncryptionGate ─▶ DeliveryExecutor ─▶ WireTransport
//!     ▲                                                     │
//!     └──────────────── receipt (Some(event_id) | None) ◀───┘
//! ```
//!
//! - [`core`] - dispatcher, encryption gate, delivery executor
//! - [`app`] - live-edit coalescer and payload builders
//! - [`ds`] - wire transport trait and server error classification
//! - [`crypto`] - encryption backend trait
//! - [`config`] / [`logging`] - ambient setup

pub mod app;
pub mod config;
pub mod core;
pub mod crypto;
pub mod ds;
pub mod logging;

pub use app::{LiveEditCoalescer, TerminalSignal, UpdateSink};
pub use config::OutboxConfig;
pub use crate::core::{CoreError, Dispatcher, OutboundRequest, ReceiptRx, RetryPolicy};
pub use crypto::{CryptoError, RoomCrypto};
pub use ds::{DeliveryServiceError, EventKind, ReceiptId, WireTransport};
