//! Event surface exposed to UI collaborators.
//!
//! [`StatePublisher`] is the single writer of the [`events::AssistantSnapshot`].
//! The session and the dispatcher each hold a clone and publish their own
//! fields; every change is also broadcast as an [`events::AssistantEvent`].

pub mod events;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::command::VoiceCommand;
use events::{AssistantEvent, AssistantEventKind, AssistantSnapshot, CommandStatus};

/// Broadcast channel capacity: 256 events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

#[derive(Clone)]
pub struct StatePublisher {
    snapshot: Arc<Mutex<AssistantSnapshot>>,
    tx: broadcast::Sender<AssistantEvent>,
    seq: Arc<AtomicU64>,
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl StatePublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAP);
        Self {
            snapshot: Arc::new(Mutex::new(AssistantSnapshot::default())),
            tx,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn snapshot(&self) -> AssistantSnapshot {
        self.snapshot.lock().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AssistantEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, kind: AssistantEventKind) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        // No subscribers is fine: the snapshot still holds the state.
        let _ = self.tx.send(AssistantEvent { seq, kind });
    }

    pub fn set_supported(&self, supported: bool) {
        self.snapshot.lock().is_supported = supported;
    }

    pub fn set_listening(&self, is_listening: bool) {
        {
            let mut snap = self.snapshot.lock();
            if snap.is_listening == is_listening {
                return;
            }
            snap.is_listening = is_listening;
        }
        self.emit(AssistantEventKind::ListeningChanged { is_listening });
    }

    pub fn set_transcript(&self, transcript: &str, interim_transcript: &str) {
        {
            let mut snap = self.snapshot.lock();
            if snap.transcript == transcript && snap.interim_transcript == interim_transcript {
                return;
            }
            snap.transcript = transcript.to_string();
            snap.interim_transcript = interim_transcript.to_string();
        }
        self.emit(AssistantEventKind::TranscriptChanged {
            transcript: transcript.to_string(),
            interim_transcript: interim_transcript.to_string(),
        });
    }

    /// Record the last recognition error. `None` clears it silently.
    pub fn set_error(&self, error: Option<String>) {
        self.snapshot.lock().error = error.clone();
        if let Some(error) = error {
            self.emit(AssistantEventKind::RecognitionError { error });
        }
    }

    pub fn set_wake_word_detected(&self, detected: bool, text: &str) {
        {
            let mut snap = self.snapshot.lock();
            if snap.wake_word_detected == detected {
                return;
            }
            snap.wake_word_detected = detected;
        }
        if detected {
            self.emit(AssistantEventKind::WakeWordDetected {
                text: text.to_string(),
            });
        }
    }

    pub fn set_status(&self, status: CommandStatus) {
        {
            let mut snap = self.snapshot.lock();
            if snap.status == status {
                return;
            }
            snap.status = status;
        }
        self.emit(AssistantEventKind::StatusChanged { status });
    }

    pub fn command_dispatched(&self, command: &VoiceCommand) {
        self.snapshot.lock().last_command = Some(command.clone());
        self.emit(AssistantEventKind::CommandDispatched {
            command: command.clone(),
        });
    }

    pub fn command_finished(&self, success: bool, message: &str) {
        self.snapshot.lock().command_result = message.to_string();
        self.emit(AssistantEventKind::CommandFinished {
            success,
            message: message.to_string(),
        });
    }

    pub fn clear_command(&self) {
        let mut snap = self.snapshot.lock();
        snap.last_command = None;
        snap.command_result.clear();
    }
}
