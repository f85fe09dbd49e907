//! Speech-recognition engine boundary.
//!
//! The `RecognitionEngine` trait decouples the session from any specific
//! recogniser (browser/WebView speech API, Android `SpeechRecognizer`,
//! the in-process [`scripted::ScriptedEngine`], ...).
//!
//! Engines are callback driven: once configured they push [`EngineEvent`]s
//! into an unbounded channel from whatever thread the platform calls them
//! on. The session drains that channel on its own event loop, so engines
//! never touch session state directly.
//!
//! Engines may end on their own after a pause even with `continuous`
//! set; callers must treat `Ended` as routine, not fatal.

pub mod scripted;
pub mod transcript;

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;

/// Sending half handed to an engine in [`RecognitionEngine::configure`].
pub type EngineEventSink = mpsc::UnboundedSender<EngineEvent>;

/// Receiving half drained by the assistant event loop.
pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Create a matched sink/receiver pair for engine events.
pub fn engine_event_channel() -> (EngineEventSink, EngineEventReceiver) {
    mpsc::unbounded_channel()
}

/// Recogniser configuration flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizerConfig {
    /// Keep recognising across pauses instead of stopping after one phrase.
    pub continuous: bool,
    /// Deliver provisional (interim) segments while speech is ongoing.
    pub interim_results: bool,
    /// BCP-47 language tag.
    pub lang: String,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            continuous: true,
            interim_results: true,
            lang: "en-IN".into(),
        }
    }
}

/// One recognised span of speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionSegment {
    pub transcript: String,
    /// Confirmed transcription; interim segments may still change.
    pub is_final: bool,
}

impl RecognitionSegment {
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            transcript: text.into(),
            is_final: false,
        }
    }

    pub fn final_(text: impl Into<String>) -> Self {
        Self {
            transcript: text.into(),
            is_final: true,
        }
    }
}

/// Error codes reported by recognisers, named after the Web Speech API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineErrorKind {
    Aborted,
    NoSpeech,
    AudioCapture,
    Network,
    NotAllowed,
    ServiceNotAllowed,
    Other(String),
}

impl EngineErrorKind {
    /// Parse a platform error code (`"no-speech"`, `"not-allowed"`, ...).
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "aborted" => EngineErrorKind::Aborted,
            "no-speech" => EngineErrorKind::NoSpeech,
            "audio-capture" => EngineErrorKind::AudioCapture,
            "network" => EngineErrorKind::Network,
            "not-allowed" => EngineErrorKind::NotAllowed,
            "service-not-allowed" => EngineErrorKind::ServiceNotAllowed,
            other => EngineErrorKind::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            EngineErrorKind::Aborted => "aborted",
            EngineErrorKind::NoSpeech => "no-speech",
            EngineErrorKind::AudioCapture => "audio-capture",
            EngineErrorKind::Network => "network",
            EngineErrorKind::NotAllowed => "not-allowed",
            EngineErrorKind::ServiceNotAllowed => "service-not-allowed",
            EngineErrorKind::Other(code) => code,
        }
    }

    /// No usable microphone or no permission to use it. Restarting cannot
    /// help.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineErrorKind::NotAllowed
                | EngineErrorKind::ServiceNotAllowed
                | EngineErrorKind::AudioCapture
        )
    }
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Everything a recogniser can tell the session.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Audio capture began.
    Started,
    /// The engine's full segment list for the current run; new or changed
    /// segments begin at `result_index`.
    Result {
        result_index: usize,
        results: Vec<RecognitionSegment>,
    },
    Error {
        kind: EngineErrorKind,
        message: Option<String>,
    },
    /// The engine closed (silence timeout, stop, abort, after an error).
    Ended,
}

/// Contract for speech recognition backends.
pub trait RecognitionEngine: Send + 'static {
    /// Apply configuration and register the event sink. Called once, when
    /// the owning session is built.
    ///
    /// # Errors
    /// Returns an error if the recogniser cannot be constructed.
    fn configure(&mut self, config: &RecognizerConfig, events: EngineEventSink) -> Result<()>;

    /// Begin capturing.
    ///
    /// # Errors
    /// `AssistantError::AlreadyStarted` if already running (benign);
    /// `AssistantError::MicrophoneDenied` / `AssistantError::Engine` if the
    /// microphone cannot be acquired.
    fn start(&mut self) -> Result<()>;

    /// Stop gracefully; the engine follows up with `Ended`.
    fn stop(&mut self) -> Result<()>;

    /// Stop immediately, discarding pending results.
    fn abort(&mut self);
}
