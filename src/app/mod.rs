//! Producer-side helpers built on top of the dispatcher.
//!
//! - [`LiveEditCoalescer`] - one message, edited in place as a result evolves
//! - [`content`] - payload builders (text, notice, edit, reaction)

pub mod content;
mod live_edit;

pub use live_edit::{LiveEditCoalescer, TerminalSignal, UpdateSink};
