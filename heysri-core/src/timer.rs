//! Single-slot delayed notifications for the assistant event loop.
//!
//! A `TimerSlot` never calls back into its owner. When it fires it posts a
//! [`TimerFired`] into the loop's timer queue and the owner decides, via
//! [`TimerSlot::accept`], whether that notification is still current.
//! Scheduling a new delay cancels the pending one and bumps the
//! generation, so a notification already sitting in the queue from an
//! older schedule is rejected.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Restart the recogniser after it ended while listening was wanted.
    Restart,
    /// Return the command status to idle after a result was shown.
    StatusReset,
    /// Forget a wake word that was not followed by a command.
    WakeWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub generation: u64,
}

pub type TimerSink = mpsc::UnboundedSender<TimerFired>;
pub type TimerReceiver = mpsc::UnboundedReceiver<TimerFired>;

pub fn timer_channel() -> (TimerSink, TimerReceiver) {
    mpsc::unbounded_channel()
}

/// At most one pending delay of a given kind.
///
/// Must be scheduled from within a Tokio runtime.
pub struct TimerSlot {
    kind: TimerKind,
    sink: TimerSink,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl TimerSlot {
    pub fn new(kind: TimerKind, sink: TimerSink) -> Self {
        Self {
            kind,
            sink,
            generation: 0,
            pending: None,
        }
    }

    /// Arm the slot, replacing any pending delay.
    pub fn schedule(&mut self, delay: Duration) {
        self.cancel();
        self.generation = self.generation.wrapping_add(1);
        let fired = TimerFired {
            kind: self.kind,
            generation: self.generation,
        };
        let sink = self.sink.clone();
        trace!(kind = ?self.kind, generation = self.generation, ?delay, "timer scheduled");
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = sink.send(fired);
        }));
    }

    /// Disarm the slot. Returns `true` if a delay was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                handle.abort();
                trace!(kind = ?self.kind, generation = self.generation, "timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Consume a fired notification.
    ///
    /// Returns `false` for other kinds, older generations, or a slot that was
    /// cancelled after the notification was queued.
    pub fn accept(&mut self, fired: TimerFired) -> bool {
        if fired.kind != self.kind || fired.generation != self.generation {
            return false;
        }
        self.pending.take().is_some()
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
