mod error;
mod transport;

pub use error::{DeliveryServiceError, DEFAULT_RETRY_AFTER};
pub use transport::{EventKind, ReceiptId, WireTransport};
