//! State and event types exposed to UI collaborators.
//!
//! The UI observes an [`AssistantSnapshot`] (reactive state) and may
//! subscribe to [`AssistantEvent`]s for one-shot feedback such as the
//! "wake word detected" toast. Field names serialise in camelCase to match
//! the web layer.

use serde::{Deserialize, Serialize};

use crate::command::VoiceCommand;

// ---------------------------------------------------------------------------
// Command status
// ---------------------------------------------------------------------------

/// Lifecycle of one spoken command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    #[default]
    Idle,
    Listening,
    /// A capability call is in flight. Only one at a time.
    Processing,
    Success,
    Error,
}

impl CommandStatus {
    /// Whether a new command may start executing in this status.
    pub fn accepts_new_command(self) -> bool {
        matches!(self, CommandStatus::Idle | CommandStatus::Listening)
    }

    /// Whether this status reports the outcome of a finished command.
    pub fn is_terminal(self) -> bool {
        matches!(self, CommandStatus::Success | CommandStatus::Error)
    }

    /// Status line shown to the user.
    pub fn description(self, wake_word_detected: bool) -> &'static str {
        match self {
            CommandStatus::Listening if wake_word_detected => "Command detected! Listening...",
            CommandStatus::Listening => "Listening for 'Hey Sri'...",
            CommandStatus::Processing => "Processing command...",
            CommandStatus::Success => "Command executed!",
            CommandStatus::Error => "Command failed",
            CommandStatus::Idle => "Tap to start listening",
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything the UI renders, as of the last processed event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantSnapshot {
    /// A recognition engine is available on this platform.
    pub is_supported: bool,
    pub is_listening: bool,
    /// Confirmed (final) transcript.
    pub transcript: String,
    pub interim_transcript: String,
    /// Last recognition error code or descriptive failure.
    pub error: Option<String>,
    pub wake_word_detected: bool,
    pub status: CommandStatus,
    /// Message from the last executed command.
    pub command_result: String,
    pub last_command: Option<VoiceCommand>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A change notification, numbered in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    #[serde(flatten)]
    pub kind: AssistantEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AssistantEventKind {
    ListeningChanged {
        is_listening: bool,
    },
    TranscriptChanged {
        transcript: String,
        interim_transcript: String,
    },
    RecognitionError {
        error: String,
    },
    /// First wake word of the current utterance.
    WakeWordDetected {
        text: String,
    },
    /// A command was requested without the wake word; nothing was executed.
    NoWakeWord {
        transcript: String,
    },
    CommandDispatched {
        command: VoiceCommand,
    },
    CommandFinished {
        success: bool,
        message: String,
    },
    StatusChanged {
        status: CommandStatus,
    },
}
