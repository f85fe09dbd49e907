//! `VoiceAssistant` — top-level lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! VoiceAssistant::spawn()        → session configured, loop task running, status = Idle
//!     └─► start_listening()      → recogniser running, status = Listening
//!         └─► "hey sri lock my phone"
//!                                → session stopped, status = Processing → Success | Error
//!                                  └─► after status_reset_delay: Idle, listening resumes
//!     └─► shutdown() / drop      → loop ends, recogniser aborted, timers cancelled
//! ```
//!
//! The handle is cheap: every control is a message to the loop task in
//! [`pipeline`], answered once the loop has applied it. Observers read the
//! [`AssistantSnapshot`] or subscribe to the event broadcast.

pub(crate) mod pipeline;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    capability::CapabilityProvider,
    dispatch::{CommandDispatcher, DispatchOutcome, DEFAULT_STATUS_RESET_DELAY},
    error::{AssistantError, Result},
    ipc::{
        events::{AssistantEvent, AssistantSnapshot},
        StatePublisher,
    },
    recognition::{engine_event_channel, RecognitionEngine, RecognizerConfig},
    session::{
        RecognitionSession, SessionConfig, DEFAULT_MAX_FAILED_RESTARTS, DEFAULT_RESTART_DELAY,
    },
    timer::{timer_channel, TimerKind, TimerSlot},
};
use pipeline::{Control, ControlSender, PipelineContext};

/// Default time a wake word stays armed without a command.
pub const DEFAULT_WAKE_WINDOW: Duration = Duration::from_secs(6);

/// Configuration for `VoiceAssistant`.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub recognizer: RecognizerConfig,
    /// Delay before restarting a recogniser that ended on its own.
    /// Default: 300 ms.
    pub restart_delay: Duration,
    /// How long a command result is shown before the status returns to
    /// idle. Default: 3 s.
    pub status_reset_delay: Duration,
    /// How long a wake word stays armed without a command. `None` keeps it
    /// until the next reset. Default: 6 s.
    pub wake_window: Option<Duration>,
    /// Consecutive failed restarts tolerated before giving up. Default: 25.
    pub max_failed_restarts: u32,
    /// Start listening again after an auto-triggered command's status
    /// resets. Default: true.
    pub resume_after_command: bool,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            recognizer: RecognizerConfig::default(),
            restart_delay: DEFAULT_RESTART_DELAY,
            status_reset_delay: DEFAULT_STATUS_RESET_DELAY,
            wake_window: Some(DEFAULT_WAKE_WINDOW),
            max_failed_restarts: DEFAULT_MAX_FAILED_RESTARTS,
            resume_after_command: true,
        }
    }
}

impl AssistantConfig {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            recognizer: self.recognizer.clone(),
            restart_delay: self.restart_delay,
            max_failed_restarts: self.max_failed_restarts,
        }
    }
}

pub struct VoiceAssistant {
    control_tx: ControlSender,
    publisher: StatePublisher,
    task: Option<JoinHandle<()>>,
}

impl VoiceAssistant {
    /// Build the session and dispatcher and start the loop task.
    ///
    /// `engine` is `None` on platforms without speech recognition; the
    /// assistant then reports `is_supported = false` and ignores controls.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        config: AssistantConfig,
        engine: Option<Box<dyn RecognitionEngine>>,
        capability: Arc<dyn CapabilityProvider>,
    ) -> Self {
        let publisher = StatePublisher::new();
        let (events_tx, engine_rx) = engine_event_channel();
        let (timers_tx, timer_rx) = timer_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let native = capability.is_native();
        let session = RecognitionSession::new(
            engine,
            config.session_config(),
            events_tx,
            timers_tx.clone(),
            publisher.clone(),
        );
        let dispatcher = CommandDispatcher::new(
            capability,
            config.status_reset_delay,
            timers_tx.clone(),
            publisher.clone(),
        );

        info!(
            lang = %config.recognizer.lang,
            native,
            "voice assistant starting"
        );

        let ctx = PipelineContext {
            wake_window: TimerSlot::new(TimerKind::WakeWindow, timers_tx),
            config,
            session,
            dispatcher,
            publisher: publisher.clone(),
            control_rx,
            engine_rx,
            timer_rx,
        };
        let task = tokio::spawn(pipeline::run(ctx));

        Self {
            control_tx,
            publisher,
            task: Some(task),
        }
    }

    /// Begin continuous listening for the wake word.
    ///
    /// # Errors
    /// `Unsupported` without a usable recogniser; `MicrophoneDenied` or
    /// `Engine` if capture could not begin (the status returns to idle);
    /// `Closed` after shutdown.
    pub async fn start_listening(&self) -> Result<()> {
        self.request(Control::StartListening).await?
    }

    /// Stop listening. Idempotent.
    pub async fn stop_listening(&self) -> Result<()> {
        self.request(Control::StopListening).await
    }

    /// Stop listening and execute the confirmed transcript.
    pub async fn stop_and_process(&self) -> Result<DispatchOutcome> {
        self.request(Control::StopAndProcess).await
    }

    pub async fn reset_transcript(&self) -> Result<()> {
        self.request(Control::ResetTranscript).await
    }

    /// Stop listening and forget the transcript, wake word and last command.
    pub async fn reset(&self) -> Result<()> {
        self.request(Control::Reset).await
    }

    pub fn snapshot(&self) -> AssistantSnapshot {
        self.publisher.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AssistantEvent> {
        self.publisher.subscribe()
    }

    /// End the loop and wait for the recogniser to be released.
    pub async fn shutdown(mut self) {
        let _ = self.control_tx.send(Control::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("assistant loop ended abnormally: {e}");
            }
        }
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Control) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.control_tx
            .send(make(tx))
            .map_err(|_| AssistantError::Closed)?;
        rx.await.map_err(|_| AssistantError::Closed)
    }
}

impl Drop for VoiceAssistant {
    fn drop(&mut self) {
        // The loop tears the session down when it sees this.
        let _ = self.control_tx.send(Control::Shutdown);
    }
}
