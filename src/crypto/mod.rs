//! End-to-end encryption interface.
//!
//! The crate does not implement any cryptography. It only decides *when* a
//! payload has to go through the backend and when the backend's group
//! session has to be re-established:
//!
//! ```ignore
//! if crypto.is_encryption_required(room).await? {
//!     match crypto.encrypt(room, &kind, &payload).await {
//!         Err(e) if e.needs_renewal() => {
//!             let members = crypto.members(room).await?;
//!             crypto.share_group_session(room, &members).await?;
//!             crypto.encrypt(room, &kind, &payload).await?
//!         }
//!         other => other?,
//!     }
//! }
//! ```

mod api;
mod error;

pub use api::RoomCrypto;
pub use error::CryptoError;
