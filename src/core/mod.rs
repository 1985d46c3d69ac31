//! Outbound delivery core.
//!
//! # Key Components
//!
//! - [`Dispatcher`] - bounded queue + single worker, FIFO per submission
//! - [`EncryptionGate`] - encrypts when required, renews group sessions
//! - [`DeliveryExecutor`] - one attempt, classification, retry loop
//! - [`OutboundRequest`] / [`ReceiptRx`] - request and its one-shot receipt
//!
//! # Example
//!
//! ```ignore
//! use group_outbox::core::{Dispatcher, OutboundRequest, RetryPolicy};
//!
//! let (dispatcher, worker) = Dispatcher::spawn(crypto, transport, &config);
//! let (request, receipt) =
//!     OutboundRequest::new(room, EventKind::RoomMessage, content, RetryPolicy::retryable());
//! dispatcher.submit(request).await;
//! match receipt.wait().await {
//!     Some(event_id) => { /* proceed */ }
//!     None => { /* tell the user it failed */ }
//! }
//! ```

mod dispatcher;
mod error;
mod executor;
mod gate;
mod request;

pub use dispatcher::Dispatcher;
pub use error::CoreError;
pub use executor::{DeliveryExecutor, DeliveryOutcome, MIN_RATE_LIMIT_WAIT};
pub use gate::{EncryptionGate, GroupSessionState, PreparedEvent};
pub use request::{OutboundRequest, ReceiptRx, RetryPolicy};
