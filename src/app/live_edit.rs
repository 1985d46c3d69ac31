//! Live-edit coalescer.
//!
//! Publishes an evolving result (progress output of a long-running command,
//! for instance) as one message that is created once and then edited in
//! place. Each session runs on its own task. Producers write into a single
//! last-value slot, so a slow server never holds them up: values that arrive
//! while an edit is in flight overwrite each other and only the latest one
//! is sent next.
//!
//! # Flow
//!
//! ```text
//! 1. wait for the first value
//! 2. create the message (retry with the latest value on failure)
//! 3. on every change of the slot: edit with the latest value
//! 4. on terminal: edit one last time with the final value
//! ```
//!
//! # Example
//!
//! ```ignore
//! let coalescer = LiveEditCoalescer::new(dispatcher.clone(), &config);
//! let (updates, terminal) = coalescer.start_stream(room);
//! for line in progress {
//!     updates.update(content::notice(&line, None));
//! }
//! let anchor = terminal.finish().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::app::content;
use crate::config::OutboxConfig;
use crate::core::{Dispatcher, RetryPolicy};
use crate::ds::{EventKind, ReceiptId};

/// Starts live-edit sessions on top of a [`Dispatcher`].
#[derive(Clone, Debug)]
pub struct LiveEditCoalescer {
    dispatcher: Dispatcher,
    retry_delay: Duration,
}

impl LiveEditCoalescer {
    pub fn new(dispatcher: Dispatcher, config: &OutboxConfig) -> Self {
        Self {
            dispatcher,
            retry_delay: config.stream_retry_delay,
        }
    }

    /// Start a session for one conversation.
    ///
    /// # Returns
    /// * [`UpdateSink`] - overwrite the value to display
    /// * [`TerminalSignal`] - end the session and wait for the final edit
    pub fn start_stream(&self, conversation_id: &str) -> (UpdateSink, TerminalSignal) {
        let (slot_tx, slot_rx) = watch::channel(Slot::default());
        let slot = Arc::new(slot_tx);

        let session = StreamSession {
            conversation_id: conversation_id.to_string(),
            dispatcher: self.dispatcher.clone(),
            slot: slot_rx,
            retry_delay: self.retry_delay,
            state: StreamState::default(),
        };
        let worker = tokio::spawn(session.run());

        (
            UpdateSink {
                handle: Arc::new(SinkHandle { slot: slot.clone() }),
            },
            TerminalSignal {
                slot,
                worker: Some(worker),
            },
        )
    }
}

/// Producer-visible side of the session. Written by producers, read by the
/// session worker.
#[derive(Debug, Default)]
struct Slot {
    latest: Option<Value>,
    terminal: bool,
}

fn close(slot: &watch::Sender<Slot>) {
    slot.send_modify(|slot| slot.terminal = true);
}

/// Producer side of a live-edit session.
///
/// Dropping every clone ends the session like [`TerminalSignal::finish`].
#[derive(Clone, Debug)]
pub struct UpdateSink {
    handle: Arc<SinkHandle>,
}

#[derive(Debug)]
struct SinkHandle {
    slot: Arc<watch::Sender<Slot>>,
}

impl Drop for SinkHandle {
    fn drop(&mut self) {
        close(&self.slot);
    }
}

impl UpdateSink {
    /// Replace the value to display. Never waits.
    ///
    /// # Returns
    /// `false` once the session no longer accepts updates.
    pub fn update(&self, content: Value) -> bool {
        self.handle.slot.send_if_modified(|slot| {
            if slot.terminal {
                return false;
            }
            slot.latest = Some(content);
            true
        })
    }
}

/// Ends a live-edit session.
///
/// Dropping it without calling [`finish`](TerminalSignal::finish) also ends
/// the session; the final edit then happens in the background.
#[derive(Debug)]
pub struct TerminalSignal {
    slot: Arc<watch::Sender<Slot>>,
    worker: Option<JoinHandle<Option<ReceiptId>>>,
}

impl TerminalSignal {
    /// Fire the terminal signal and wait for the final edit.
    ///
    /// # Returns
    /// The anchor receipt of the message, or `None` if it was never created.
    pub async fn finish(mut self) -> Option<ReceiptId> {
        close(&self.slot);
        let worker = self.worker.take()?;
        match worker.await {
            Ok(anchor) => anchor,
            Err(e) => {
                error!("[live_edit]: session worker failed: {e}");
                None
            }
        }
    }
}

impl Drop for TerminalSignal {
    fn drop(&mut self) {
        close(&self.slot);
    }
}

/// State owned by one session worker.
#[derive(Debug, Default)]
struct StreamState {
    /// Latest value seen in the slot. Last value wins.
    pending: Option<Value>,
    /// Receipt of the created message; edits target it.
    anchor: Option<ReceiptId>,
    /// Set once the terminal signal fired.
    terminal: bool,
}

struct StreamSession {
    conversation_id: String,
    dispatcher: Dispatcher,
    slot: watch::Receiver<Slot>,
    retry_delay: Duration,
    state: StreamState,
}

impl StreamSession {
    async fn run(mut self) -> Option<ReceiptId> {
        self.observe();
        while self.state.pending.is_none() && !self.state.terminal {
            self.wait_for_change().await;
        }
        if self.state.pending.is_none() {
            debug!(
                conversation = self.conversation_id.as_str(),
                "[live_edit]: ended before the first update"
            );
            return None;
        }

        if !self.create().await {
            return None;
        }

        while !self.state.terminal {
            self.wait_for_change().await;
            if !self.state.terminal {
                self.edit_latest().await;
            }
        }

        // Terminal and the last value come from the same slot, so every
        // update accepted before the signal is already in `pending`.
        self.edit_latest().await;
        debug!(
            conversation = self.conversation_id.as_str(),
            "[live_edit]: session finished"
        );
        self.state.anchor
    }

    /// Wait until the slot changes, then copy it into the session state.
    async fn wait_for_change(&mut self) {
        if self.slot.changed().await.is_err() {
            // Every handle is gone; their drops already marked the slot terminal.
            self.state.terminal = true;
        }
        self.observe();
    }

    fn observe(&mut self) {
        let slot = self.slot.borrow_and_update();
        if let Some(latest) = &slot.latest {
            self.state.pending = Some(latest.clone());
        }
        self.state.terminal |= slot.terminal;
    }

    /// Retry until the message exists. Gives up only when an attempt made
    /// after the terminal signal fails too.
    async fn create(&mut self) -> bool {
        let mut attempt = 0u32;
        loop {
            self.observe();
            let terminal = self.state.terminal;
            let Some(content) = self.state.pending.clone() else {
                return false;
            };
            attempt += 1;

            if let Some(anchor) = self.submit(content).await {
                info!(
                    conversation = self.conversation_id.as_str(),
                    "[live_edit]: created message {anchor}"
                );
                self.state.anchor = Some(anchor);
                return true;
            }

            if terminal {
                error!(
                    conversation = self.conversation_id.as_str(),
                    "[live_edit]: could not create message after {attempt} attempts, abandoning session"
                );
                return false;
            }
            warn!(
                conversation = self.conversation_id.as_str(),
                "[live_edit]: create attempt {attempt} failed, retrying in {:?}", self.retry_delay
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    /// Edit the anchor with the latest value; one delayed retry on failure.
    async fn edit_latest(&mut self) {
        let (Some(anchor), Some(latest)) = (&self.state.anchor, &self.state.pending) else {
            return;
        };
        let edit = content::edit_of(anchor, latest);

        if self.submit(edit.clone()).await.is_some() {
            return;
        }
        warn!(
            conversation = self.conversation_id.as_str(),
            "[live_edit]: edit failed, retrying in {:?}", self.retry_delay
        );
        tokio::time::sleep(self.retry_delay).await;
        if self.submit(edit).await.is_none() {
            warn!(
                conversation = self.conversation_id.as_str(),
                "[live_edit]: edit failed twice, moving on"
            );
        }
    }

    async fn submit(&self, payload: Value) -> Option<ReceiptId> {
        self.dispatcher
            .send(
                &self.conversation_id,
                EventKind::RoomMessage,
                payload,
                RetryPolicy::once(),
            )
            .await
    }
}
