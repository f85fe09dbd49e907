//! Auto-trigger detector.
//!
//! Runs after every transcript change and decides the earliest moment a
//! complete command has been heard, so the session can be stopped before it
//! captures unrelated trailing speech. It decides *when*; the classifier
//! decides *what*. Both go through [`complete_command`], so a transcript
//! that triggers always classifies as a real command.

use tracing::debug;

use crate::command::{complete_command, contains_wake_word, VoiceCommand};
use crate::ipc::events::CommandStatus;

/// What one evaluation found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerOutcome {
    /// The wake word was heard for the first time in this utterance.
    pub wake_word_detected: bool,
    /// A complete command is ready to execute.
    pub command: Option<VoiceCommand>,
}

#[derive(Debug, Default)]
pub struct AutoTrigger {
    wake_word_seen: bool,
}

impl AutoTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current transcript (final and interim, space-joined).
    ///
    /// Never fires while `status` is busy with or still showing a previous
    /// command.
    pub fn evaluate(&mut self, text: &str, status: CommandStatus) -> TriggerOutcome {
        let text = text.trim();
        if text.is_empty() {
            return TriggerOutcome::default();
        }

        let mut outcome = TriggerOutcome::default();
        if !self.wake_word_seen && contains_wake_word(text) {
            self.wake_word_seen = true;
            outcome.wake_word_detected = true;
            debug!(text, "wake word heard");
        }

        if status.accepts_new_command() {
            outcome.command = complete_command(text);
        } else if complete_command(text).is_some() {
            debug!(?status, "complete command heard while busy, not triggering");
        }
        outcome
    }

    pub fn wake_word_seen(&self) -> bool {
        self.wake_word_seen
    }

    /// Forget the wake word; the next utterance starts clean.
    pub fn reset(&mut self) {
        self.wake_word_seen = false;
    }
}
