//! `RecognitionSession` — keeps one recogniser alive across its own hang-ups.
//!
//! ## States
//!
//! ```text
//!            start()                 Ended / Error (desired)
//!   Idle ───────────► Listening ───────────────────────────► Ended
//!    ▲                   ▲                                    │
//!    │                   └──────── restart timer fires ───────┘
//!    │
//!    └──── stop() / teardown / fatal error (from any state)
//! ```
//!
//! ## Ordering
//!
//! `stop()` clears the desired flag *before* stopping the engine. The
//! engine answers a stop with `Ended`; if the flag were still set, that
//! `Ended` would schedule a restart and listening would silently resume.
//!
//! ## Ownership
//!
//! The session exclusively owns its engine and its restart timer. Both are
//! released on every exit path: `stop()`, `teardown()`, a fatal error, and
//! `Drop`.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{
    error::{AssistantError, Result},
    ipc::StatePublisher,
    recognition::{
        transcript::Transcript, EngineErrorKind, EngineEvent, EngineEventSink, RecognitionEngine,
        RecognizerConfig,
    },
    timer::{TimerFired, TimerKind, TimerSink, TimerSlot},
};

/// Default pause before restarting an engine that ended on its own.
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_millis(300);

/// Default number of consecutive error-driven restarts before giving up.
pub const DEFAULT_MAX_FAILED_RESTARTS: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Listening not wanted.
    Idle,
    /// Listening wanted and the engine is capturing.
    Listening,
    /// Listening wanted but the engine is down; a restart is pending or
    /// the engine has not confirmed its start yet.
    Ended,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub recognizer: RecognizerConfig,
    pub restart_delay: Duration,
    pub max_failed_restarts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recognizer: RecognizerConfig::default(),
            restart_delay: DEFAULT_RESTART_DELAY,
            max_failed_restarts: DEFAULT_MAX_FAILED_RESTARTS,
        }
    }
}

pub struct RecognitionSession {
    engine: Option<Box<dyn RecognitionEngine>>,
    supported: bool,
    /// User intent. Independent of whether the engine is actually running.
    desired: bool,
    /// Engine-reported capture state.
    listening: bool,
    transcript: Transcript,
    last_error: Option<String>,
    restart: TimerSlot,
    restart_delay: Duration,
    failed_restarts: u32,
    max_failed_restarts: u32,
    publisher: StatePublisher,
}

impl RecognitionSession {
    /// Build a session around `engine`. `None` means the platform has no
    /// recogniser; every operation then becomes a no-op.
    ///
    /// A recogniser that fails to configure is treated the same way, with
    /// the failure surfaced as the session's last error.
    pub fn new(
        engine: Option<Box<dyn RecognitionEngine>>,
        config: SessionConfig,
        events: EngineEventSink,
        timers: TimerSink,
        publisher: StatePublisher,
    ) -> Self {
        let supported = engine.is_some();
        let mut last_error = None;

        let engine = engine.and_then(|mut engine| {
            match engine.configure(&config.recognizer, events) {
                Ok(()) => {
                    info!(lang = %config.recognizer.lang, "speech recogniser ready");
                    Some(engine)
                }
                Err(e) => {
                    warn!("speech recogniser could not be initialised: {e}");
                    last_error = Some(format!("Speech recognition unavailable: {e}"));
                    None
                }
            }
        });

        if !supported {
            info!("speech recognition not supported on this platform");
        }

        publisher.set_supported(supported);
        if last_error.is_some() {
            publisher.set_error(last_error.clone());
        }

        Self {
            engine,
            supported,
            desired: false,
            listening: false,
            transcript: Transcript::new(),
            last_error,
            restart: TimerSlot::new(TimerKind::Restart, timers),
            restart_delay: config.restart_delay,
            failed_restarts: 0,
            max_failed_restarts: config.max_failed_restarts,
            publisher,
        }
    }

    /// Begin continuous listening.
    ///
    /// No-op without a usable engine. Starting an engine that is already
    /// running is tolerated.
    ///
    /// # Errors
    /// Returns the acquisition error (microphone denied, engine failure)
    /// after surfacing it; the session is back to `Idle`.
    pub fn start(&mut self) -> Result<()> {
        if self.engine.is_none() {
            debug!("start ignored: no speech recogniser");
            return Ok(());
        }

        self.restart.cancel();
        self.transcript.clear();
        self.failed_restarts = 0;
        self.desired = true;
        self.last_error = None;
        self.publisher.set_error(None);
        self.publish_transcript();

        let started = match self.engine.as_mut() {
            Some(engine) => engine.start(),
            None => return Ok(()),
        };

        match started {
            Ok(()) => {
                info!("listening started");
                Ok(())
            }
            Err(e) if e.is_benign() => {
                debug!("engine already running, continuing");
                Ok(())
            }
            Err(e) => {
                warn!("failed to start speech recognition: {e}");
                self.desired = false;
                self.listening = false;
                self.publisher.set_listening(false);
                self.record_error(describe_start_failure(&e));
                Err(e)
            }
        }
    }

    /// Stop listening at the user's request. Idempotent.
    pub fn stop(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        // Must precede engine.stop(): the Ended it triggers checks this flag.
        self.desired = false;
        self.restart.cancel();

        if let Err(e) = engine.stop() {
            debug!("engine stop failed (probably already stopped): {e}");
        }
        info!("listening stopped");
    }

    /// Release everything unconditionally. Safe to call more than once.
    pub fn teardown(&mut self) {
        self.restart.cancel();
        self.desired = false;
        if let Some(engine) = self.engine.as_mut() {
            engine.abort();
        }
        if self.listening {
            self.listening = false;
            self.publisher.set_listening(false);
        }
    }

    /// Clear final and interim text without touching listening state.
    pub fn reset_transcript(&mut self) {
        self.transcript.clear();
        self.publish_transcript();
    }

    /// Apply one engine event. Returns `true` if the transcript changed.
    pub fn handle_event(&mut self, event: EngineEvent) -> bool {
        match event {
            EngineEvent::Started => {
                self.listening = true;
                self.last_error = None;
                self.publisher.set_error(None);
                self.publisher.set_listening(true);
                false
            }

            EngineEvent::Result {
                result_index,
                results,
            } => {
                self.failed_restarts = 0;
                let changed = self.transcript.apply(result_index, &results);
                if changed {
                    self.publish_transcript();
                }
                changed
            }

            EngineEvent::Error { kind, message } => {
                self.handle_error(kind, message);
                false
            }

            EngineEvent::Ended => {
                self.listening = false;
                self.publisher.set_listening(false);
                let changed = self.transcript.clear_interim();
                if changed {
                    self.publish_transcript();
                }
                if self.desired {
                    debug!("engine ended while listening is wanted");
                    self.schedule_restart();
                }
                changed
            }
        }
    }

    /// Handle a fired timer. Ignores notifications that are not the
    /// session's current restart.
    pub fn on_timer(&mut self, fired: TimerFired) {
        if !self.restart.accept(fired) || !self.desired {
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        match engine.start() {
            Ok(()) => debug!("engine restarted"),
            Err(e) if e.is_benign() => debug!("restart skipped: engine already running"),
            Err(e) => {
                warn!("failed to restart speech recognition: {e}");
                self.desired = false;
                self.restart.cancel();
                self.listening = false;
                self.publisher.set_listening(false);
                self.record_error(describe_start_failure(&e));
            }
        }
    }

    fn handle_error(&mut self, kind: EngineErrorKind, message: Option<String>) {
        warn!(code = %kind, message = ?message, "speech recognition error");
        self.listening = false;
        self.publisher.set_listening(false);

        if kind.is_fatal() {
            self.desired = false;
            self.restart.cancel();
            self.record_error(describe_fatal_error(&kind));
            return;
        }

        self.record_error(kind.code().to_string());

        if !self.desired {
            return;
        }

        self.failed_restarts += 1;
        if self.failed_restarts > self.max_failed_restarts {
            warn!(
                failures = self.failed_restarts,
                "speech recognition keeps failing, giving up"
            );
            self.desired = false;
            self.restart.cancel();
            self.record_error(format!("Speech recognition keeps failing ({kind})"));
            return;
        }
        self.schedule_restart();
    }

    fn schedule_restart(&mut self) {
        if !self.desired || self.engine.is_none() {
            return;
        }
        self.restart.schedule(self.restart_delay);
    }

    fn record_error(&mut self, error: String) {
        self.last_error = Some(error.clone());
        self.publisher.set_error(Some(error));
    }

    fn publish_transcript(&self) {
        self.publisher
            .set_transcript(self.transcript.final_text(), self.transcript.interim());
    }

    pub fn state(&self) -> SessionState {
        match (self.desired, self.listening) {
            (false, _) => SessionState::Idle,
            (true, true) => SessionState::Listening,
            (true, false) => SessionState::Ended,
        }
    }

    /// A recogniser exists on this platform (even if it failed to initialise).
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// A recogniser is configured and usable.
    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn desired_listening(&self) -> bool {
        self.desired
    }

    pub fn restart_pending(&self) -> bool {
        self.restart.is_pending()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

impl Drop for RecognitionSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

const MICROPHONE_DENIED_MESSAGE: &str =
    "Microphone access was denied. Allow microphone permission to use voice commands.";

fn describe_start_failure(err: &AssistantError) -> String {
    match err {
        AssistantError::MicrophoneDenied => MICROPHONE_DENIED_MESSAGE.into(),
        other => format!("Could not start speech recognition: {other}"),
    }
}

fn describe_fatal_error(kind: &EngineErrorKind) -> String {
    match kind {
        EngineErrorKind::AudioCapture => {
            "No microphone is available. Connect a microphone to use voice commands.".into()
        }
        _ => MICROPHONE_DENIED_MESSAGE.into(),
    }
}
