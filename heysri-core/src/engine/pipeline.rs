//! Assistant event loop.
//!
//! ## One iteration
//!
//! ```text
//! select! (biased)
//!   ├─ engine event  → session.handle_event → evaluate transcript
//!   │                     └─ complete command → stop session → dispatcher.execute
//!   ├─ timer fired   → Restart | StatusReset | WakeWindow
//!   └─ control       → start / stop / stop-and-process / reset / shutdown
//! ```
//!
//! Everything runs on this one task, so session, detector and dispatcher
//! state are never touched concurrently. The capability call is awaited
//! inline: engine events and timers that arrive meanwhile wait in their
//! queues and are evaluated against the state left behind by the command.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
    dispatch::{CommandDispatcher, DispatchOutcome},
    engine::AssistantConfig,
    error::{AssistantError, Result},
    ipc::{events::CommandStatus, StatePublisher},
    recognition::{EngineEvent, EngineEventReceiver},
    session::RecognitionSession,
    timer::{TimerFired, TimerKind, TimerReceiver, TimerSlot},
    trigger::AutoTrigger,
};

/// Requests from the [`super::VoiceAssistant`] handle.
#[derive(Debug)]
pub(crate) enum Control {
    StartListening(oneshot::Sender<Result<()>>),
    StopListening(oneshot::Sender<()>),
    StopAndProcess(oneshot::Sender<DispatchOutcome>),
    ResetTranscript(oneshot::Sender<()>),
    Reset(oneshot::Sender<()>),
    Shutdown,
}

pub(crate) type ControlSender = mpsc::UnboundedSender<Control>;
pub(crate) type ControlReceiver = mpsc::UnboundedReceiver<Control>;

/// All context the loop needs, passed as one struct so the spawn stays tidy.
pub(crate) struct PipelineContext {
    pub config: AssistantConfig,
    pub session: RecognitionSession,
    pub dispatcher: CommandDispatcher,
    pub wake_window: TimerSlot,
    pub publisher: StatePublisher,
    pub control_rx: ControlReceiver,
    pub engine_rx: EngineEventReceiver,
    pub timer_rx: TimerReceiver,
}

struct Pipeline {
    session: RecognitionSession,
    dispatcher: CommandDispatcher,
    trigger: AutoTrigger,
    wake_window: TimerSlot,
    wake_window_delay: Option<Duration>,
    resume_after_command: bool,
    /// Restart listening once the current command's status resets.
    resume_pending: bool,
    publisher: StatePublisher,
}

pub(crate) async fn run(ctx: PipelineContext) {
    let PipelineContext {
        config,
        session,
        dispatcher,
        wake_window,
        publisher,
        mut control_rx,
        mut engine_rx,
        mut timer_rx,
    } = ctx;

    let mut pipeline = Pipeline {
        session,
        dispatcher,
        trigger: AutoTrigger::new(),
        wake_window,
        wake_window_delay: config.wake_window,
        resume_after_command: config.resume_after_command,
        resume_pending: false,
        publisher,
    };

    info!(
        supported = pipeline.session.is_supported(),
        available = pipeline.session.is_available(),
        "assistant loop started"
    );

    loop {
        tokio::select! {
            biased;

            Some(event) = engine_rx.recv() => pipeline.handle_engine_event(event).await,
            Some(fired) = timer_rx.recv() => pipeline.handle_timer(fired),
            control = control_rx.recv() => match control {
                Some(Control::Shutdown) | None => break,
                Some(control) => pipeline.handle_control(control).await,
            },
        }
    }

    // Dropping the session aborts the recogniser and cancels every timer.
    drop(pipeline);
    info!("assistant loop stopped");
}

impl Pipeline {
    async fn handle_control(&mut self, control: Control) {
        match control {
            Control::StartListening(reply) => {
                self.resume_pending = false;
                let _ = reply.send(self.start_listening());
            }
            Control::StopListening(reply) => {
                self.resume_pending = false;
                self.stop_listening();
                let _ = reply.send(());
            }
            Control::StopAndProcess(reply) => {
                self.resume_pending = false;
                let outcome = self.stop_and_process().await;
                let _ = reply.send(outcome);
            }
            Control::ResetTranscript(reply) => {
                self.session.reset_transcript();
                let _ = reply.send(());
            }
            Control::Reset(reply) => {
                self.resume_pending = false;
                self.reset();
                let _ = reply.send(());
            }
            // Handled by the loop itself.
            Control::Shutdown => {}
        }
    }

    fn start_listening(&mut self) -> Result<()> {
        if !self.session.is_available() {
            debug!("start_listening ignored: no usable recogniser");
            return Err(AssistantError::Unsupported);
        }

        self.dispatcher.mark_listening();
        self.clear_wake_word();
        match self.session.start() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.dispatcher.mark_idle();
                Err(e)
            }
        }
    }

    fn stop_listening(&mut self) {
        self.session.stop();
        self.wake_window.cancel();
        self.dispatcher.mark_idle();
    }

    /// Manual path: stop, then run whatever was confirmed so far.
    async fn stop_and_process(&mut self) -> DispatchOutcome {
        self.session.stop();
        self.wake_window.cancel();
        let text = self.session.transcript().final_text().to_string();
        let outcome = self.dispatcher.execute(&text).await;
        if !matches!(outcome, DispatchOutcome::Completed { .. }) {
            self.dispatcher.mark_idle();
        }
        outcome
    }

    fn reset(&mut self) {
        self.session.stop();
        self.session.reset_transcript();
        self.clear_wake_word();
        self.dispatcher.reset();
    }

    async fn handle_engine_event(&mut self, event: EngineEvent) {
        let transcript_changed = self.session.handle_event(event);
        self.follow_session_give_up();

        if transcript_changed {
            self.evaluate_transcript().await;
        }
    }

    async fn evaluate_transcript(&mut self) {
        let text = self.session.transcript().combined();
        let outcome = self.trigger.evaluate(&text, self.dispatcher.status());

        if outcome.wake_word_detected {
            info!(text = %text, "wake word detected");
            self.publisher.set_wake_word_detected(true, &text);
            if let Some(window) = self.wake_window_delay {
                self.wake_window.schedule(window);
            }
        }

        let Some(command) = outcome.command else {
            return;
        };
        if !self.session.desired_listening() {
            debug!(kind = ?command.kind, "complete command heard after stop, ignoring");
            return;
        }

        info!(kind = ?command.kind, "complete command heard, stopping session");
        self.session.stop();
        self.wake_window.cancel();

        let outcome = self.dispatcher.execute(&text).await;
        if matches!(outcome, DispatchOutcome::Completed { .. }) {
            self.resume_pending = self.resume_after_command;
        } else {
            warn!(?outcome, "auto-triggered command was not executed");
            self.dispatcher.mark_idle();
        }
    }

    fn handle_timer(&mut self, fired: TimerFired) {
        match fired.kind {
            TimerKind::Restart => {
                self.session.on_timer(fired);
                self.follow_session_give_up();
            }

            TimerKind::StatusReset => {
                if !self.dispatcher.on_reset_timer(fired) {
                    return;
                }
                self.clear_wake_word();
                self.session.reset_transcript();
                if std::mem::take(&mut self.resume_pending) {
                    debug!("resuming listening after command");
                    if let Err(e) = self.start_listening() {
                        warn!("could not resume listening: {e}");
                    }
                }
            }

            TimerKind::WakeWindow => {
                if !self.wake_window.accept(fired) {
                    return;
                }
                if !self.dispatcher.status().accepts_new_command() {
                    return;
                }
                info!("wake word not followed by a command, forgetting it");
                self.clear_wake_word();
                self.session.reset_transcript();
            }
        }
    }

    /// The session gave up (fatal error, failed restart, budget exhausted).
    fn follow_session_give_up(&mut self) {
        if !self.session.desired_listening() && self.dispatcher.status() == CommandStatus::Listening
        {
            self.wake_window.cancel();
            self.dispatcher.mark_idle();
        }
    }

    fn clear_wake_word(&mut self) {
        self.wake_window.cancel();
        self.trigger.reset();
        self.publisher.set_wake_word_detected(false, "");
    }
}
