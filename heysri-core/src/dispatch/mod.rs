//! `CommandDispatcher` — turns a transcript into exactly one device action.
//!
//! ## Lifecycle of one command
//!
//! ```text
//! execute(text)
//!   ├─ empty / already Processing   → Skipped (no capability call)
//!   ├─ no wake word                 → NoWakeWord (status untouched)
//!   └─ Processing → classify → capability → Success | Error
//!                                              └─ status-reset timer
//!                                                   └─ on_reset_timer → Idle
//! ```
//!
//! The `Processing` check and the transition into it happen under one lock,
//! so two overlapping `execute` calls can never both reach the capability.
//! Capability failures of any kind become an `Error` status with a message.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    capability::{ActionResult, CapabilityProvider},
    command::{contains_wake_word, parse_command, CommandKind, VoiceCommand},
    ipc::{
        events::{AssistantEventKind, CommandStatus},
        StatePublisher,
    },
    timer::{TimerFired, TimerKind, TimerSink, TimerSlot},
};

/// Default time a command result stays on screen before the status resets.
pub const DEFAULT_STATUS_RESET_DELAY: Duration = Duration::from_secs(3);

pub const PERMISSION_MISSING_MESSAGE: &str =
    "Device admin not enabled. Please enable it in Permissions.";
pub const UNKNOWN_COMMAND_MESSAGE: &str = "Unknown command. Try: 'Hey Sri, lock my phone'";
const LOCK_FAILED_MESSAGE: &str = "Failed to lock phone";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing was attempted.
    Skipped(SkipReason),
    /// The transcript lacks the wake word; the user may keep talking.
    NoWakeWord,
    Completed {
        command: VoiceCommand,
        result: ActionResult,
    },
}

pub struct CommandDispatcher {
    capability: Arc<dyn CapabilityProvider>,
    status: Mutex<CommandStatus>,
    reset_timer: Mutex<TimerSlot>,
    reset_delay: Duration,
    publisher: StatePublisher,
}

impl CommandDispatcher {
    pub fn new(
        capability: Arc<dyn CapabilityProvider>,
        reset_delay: Duration,
        timers: TimerSink,
        publisher: StatePublisher,
    ) -> Self {
        Self {
            capability,
            status: Mutex::new(CommandStatus::Idle),
            reset_timer: Mutex::new(TimerSlot::new(TimerKind::StatusReset, timers)),
            reset_delay,
            publisher,
        }
    }

    pub fn status(&self) -> CommandStatus {
        *self.status.lock()
    }

    /// Classify `raw_transcript` and run the matching capability.
    pub async fn execute(&self, raw_transcript: &str) -> DispatchOutcome {
        let transcript = raw_transcript.trim();
        if transcript.is_empty() {
            return DispatchOutcome::Skipped(SkipReason::Empty);
        }

        {
            let mut status = self.status.lock();
            if *status == CommandStatus::Processing {
                debug!("command already processing, ignoring");
                return DispatchOutcome::Skipped(SkipReason::Busy);
            }
            if !contains_wake_word(transcript) {
                drop(status);
                info!(transcript, "no wake word in transcript");
                self.publisher.emit(AssistantEventKind::NoWakeWord {
                    transcript: transcript.to_string(),
                });
                return DispatchOutcome::NoWakeWord;
            }
            *status = CommandStatus::Processing;
        }
        self.reset_timer.lock().cancel();
        self.publisher.set_status(CommandStatus::Processing);

        let command = parse_command(transcript);
        info!(kind = ?command.kind, target = ?command.target, "dispatching command");
        self.publisher.command_dispatched(&command);

        let result = self.invoke(&command).await;

        let terminal = if result.success {
            CommandStatus::Success
        } else {
            CommandStatus::Error
        };
        *self.status.lock() = terminal;
        self.publisher.set_status(terminal);
        self.publisher
            .command_finished(result.success, &result.message);
        if result.success {
            info!(message = %result.message, "command succeeded");
        } else {
            warn!(message = %result.message, "command failed");
        }

        self.reset_timer.lock().schedule(self.reset_delay);

        DispatchOutcome::Completed { command, result }
    }

    async fn invoke(&self, command: &VoiceCommand) -> ActionResult {
        let target = command.target.as_deref().unwrap_or("none");
        match command.kind {
            CommandKind::Lock => self.lock_device().await,
            CommandKind::Call | CommandKind::Message | CommandKind::OpenApp => {
                ActionResult::failed(format!(
                    "{} feature coming soon. Target: {target}",
                    command.kind.feature_name()
                ))
            }
            CommandKind::Unknown => ActionResult::failed(UNKNOWN_COMMAND_MESSAGE),
        }
    }

    async fn lock_device(&self) -> ActionResult {
        if !self.capability.is_native() {
            return match self.capability.lock_device().await {
                Ok(result) => result,
                Err(e) => ActionResult::failed(e.to_string()),
            };
        }

        match self.capability.is_elevated_permission_enabled().await {
            Ok(permission) if !permission.enabled => {
                return ActionResult::failed(PERMISSION_MISSING_MESSAGE);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("permission check failed: {e}");
                return ActionResult::failed(failure_message(&e.to_string()));
            }
        }

        match self.capability.lock_device().await {
            Ok(result) => result,
            Err(e) => {
                warn!("lock capability failed: {e}");
                ActionResult::failed(failure_message(&e.to_string()))
            }
        }
    }

    /// Consume the status-reset timer. Returns `true` if the status went
    /// back to `Idle` and the caller should clear the utterance.
    pub fn on_reset_timer(&self, fired: TimerFired) -> bool {
        if !self.reset_timer.lock().accept(fired) {
            return false;
        }
        let mut status = self.status.lock();
        if !status.is_terminal() {
            return false;
        }
        *status = CommandStatus::Idle;
        drop(status);
        self.publisher.set_status(CommandStatus::Idle);
        debug!("command status reset");
        true
    }

    /// Listening began. Drops any pending reset so it cannot wipe the new
    /// utterance.
    pub fn mark_listening(&self) {
        let mut status = self.status.lock();
        if *status == CommandStatus::Processing {
            return;
        }
        self.reset_timer.lock().cancel();
        *status = CommandStatus::Listening;
        drop(status);
        self.publisher.set_status(CommandStatus::Listening);
    }

    /// Listening ended without a command.
    pub fn mark_idle(&self) {
        let mut status = self.status.lock();
        if *status != CommandStatus::Listening {
            return;
        }
        *status = CommandStatus::Idle;
        drop(status);
        self.publisher.set_status(CommandStatus::Idle);
    }

    /// Forget the last command and its result.
    pub fn reset(&self) {
        let mut status = self.status.lock();
        if *status == CommandStatus::Processing {
            return;
        }
        self.reset_timer.lock().cancel();
        *status = CommandStatus::Idle;
        drop(status);
        self.publisher.set_status(CommandStatus::Idle);
        self.publisher.clear_command();
    }
}

fn failure_message(error: &str) -> String {
    if error.trim().is_empty() {
        LOCK_FAILED_MESSAGE.to_string()
    } else {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::capability::{PermissionStatus, WebCapability};
    use crate::error::{AssistantError, Result};
    use crate::timer::{timer_channel, TimerReceiver};

    #[derive(Default)]
    struct FakeCapability {
        admin: AtomicBool,
        throw_on_lock: AtomicBool,
        lock_calls: AtomicUsize,
        permission_calls: AtomicUsize,
        gate: Option<(Notify, Notify)>,
    }

    impl FakeCapability {
        fn granted() -> Self {
            let cap = Self::default();
            cap.admin.store(true, Ordering::SeqCst);
            cap
        }

        fn gated() -> Self {
            Self {
                gate: Some((Notify::new(), Notify::new())),
                ..Self::granted()
            }
        }
    }

    #[async_trait]
    impl CapabilityProvider for FakeCapability {
        async fn lock_device(&self) -> Result<ActionResult> {
            self.lock_calls.fetch_add(1, Ordering::SeqCst);
            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }
            if self.throw_on_lock.load(Ordering::SeqCst) {
                return Err(AssistantError::Capability("bridge unavailable".into()));
            }
            Ok(ActionResult::succeeded("Phone locked successfully"))
        }

        async fn is_elevated_permission_enabled(&self) -> Result<PermissionStatus> {
            self.permission_calls.fetch_add(1, Ordering::SeqCst);
            Ok(PermissionStatus {
                enabled: self.admin.load(Ordering::SeqCst),
            })
        }
    }

    fn dispatcher(
        cap: Arc<dyn CapabilityProvider>,
    ) -> (CommandDispatcher, TimerReceiver, StatePublisher) {
        let (tx, rx) = timer_channel();
        let publisher = StatePublisher::new();
        let d = CommandDispatcher::new(cap, DEFAULT_STATUS_RESET_DELAY, tx, publisher.clone());
        (d, rx, publisher)
    }

    #[tokio::test(start_paused = true)]
    async fn lock_succeeds_with_permission() {
        let cap = Arc::new(FakeCapability::granted());
        let (d, _timers, publisher) = dispatcher(cap.clone());

        let outcome = d.execute("hey sri lock my phone").await;
        match outcome {
            DispatchOutcome::Completed { command, result } => {
                assert_eq!(command.kind, CommandKind::Lock);
                assert!(result.success);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(d.status(), CommandStatus::Success);
        assert_eq!(cap.lock_calls.load(Ordering::SeqCst), 1);
        let snap = publisher.snapshot();
        assert_eq!(snap.command_result, "Phone locked successfully");
        assert_eq!(
            snap.last_command.map(|c| c.kind),
            Some(CommandKind::Lock)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_permission_short_circuits_before_locking() {
        let cap = Arc::new(FakeCapability::default());
        let (d, _timers, _publisher) = dispatcher(cap.clone());

        let outcome = d.execute("hey sri lock my phone").await;
        let DispatchOutcome::Completed { result, .. } = outcome else {
            panic!("expected a completed dispatch");
        };
        assert!(!result.success);
        assert_eq!(result.message, PERMISSION_MISSING_MESSAGE);
        assert_eq!(cap.permission_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cap.lock_calls.load(Ordering::SeqCst), 0);
        assert_eq!(d.status(), CommandStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn capability_errors_become_failed_results() {
        let cap = Arc::new(FakeCapability::granted());
        cap.throw_on_lock.store(true, Ordering::SeqCst);
        let (d, _timers, _publisher) = dispatcher(cap.clone());

        let DispatchOutcome::Completed { result, .. } = d.execute("hey sri lock screen").await
        else {
            panic!("expected a completed dispatch");
        };
        assert!(!result.success);
        assert_eq!(result.message, "bridge unavailable");
        assert_eq!(d.status(), CommandStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn non_native_provider_reports_platform_message() {
        let (d, _timers, _publisher) = dispatcher(Arc::new(WebCapability));
        let DispatchOutcome::Completed { result, .. } = d.execute("hey sri lock my phone").await
        else {
            panic!("expected a completed dispatch");
        };
        assert_eq!(result.message, "Lock command only works on Android");
    }

    #[tokio::test(start_paused = true)]
    async fn stubbed_kinds_report_coming_soon() {
        let cap = Arc::new(FakeCapability::granted());
        let (d, mut timers, _publisher) = dispatcher(cap.clone());

        let cases = [
            ("hey sri call Mom", "Call feature coming soon. Target: mom"),
            (
                "hey sri send message to John",
                "Message feature coming soon. Target: john",
            ),
            ("hey sri open Camera", "Open app feature coming soon. Target: camera"),
            ("hey sri send a message", "Message feature coming soon. Target: none"),
            ("hey sri blah", UNKNOWN_COMMAND_MESSAGE),
        ];
        for (text, expected) in cases {
            let DispatchOutcome::Completed { result, .. } = d.execute(text).await else {
                panic!("expected a completed dispatch for {text}");
            };
            assert!(!result.success);
            assert_eq!(result.message, expected);
            let fired = timers.recv().await.expect("reset timer");
            assert!(d.on_reset_timer(fired));
        }
        assert_eq!(cap.lock_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_transcript_is_skipped() {
        let (d, _timers, _publisher) = dispatcher(Arc::new(FakeCapability::granted()));
        assert_eq!(d.execute("   ").await, DispatchOutcome::Skipped(SkipReason::Empty));
        assert_eq!(d.status(), CommandStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_wake_word_is_rejected_without_capability() {
        let cap = Arc::new(FakeCapability::granted());
        let (d, _timers, publisher) = dispatcher(cap.clone());
        let mut rx = publisher.subscribe();

        assert_eq!(d.execute("lock my phone").await, DispatchOutcome::NoWakeWord);
        assert_eq!(d.status(), CommandStatus::Idle);
        assert_eq!(cap.permission_calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            rx.try_recv().expect("no wake word event").kind,
            AssistantEventKind::NoWakeWord { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn second_execute_while_processing_is_a_no_op() {
        let cap = Arc::new(FakeCapability::gated());
        let (d, _timers, _publisher) = dispatcher(cap.clone());
        let d = Arc::new(d);

        let first = tokio::spawn({
            let d = Arc::clone(&d);
            async move { d.execute("hey sri lock my phone").await }
        });

        let (entered, release) = cap.gate.as_ref().expect("gated capability");
        entered.notified().await;
        assert_eq!(d.status(), CommandStatus::Processing);

        let second = d.execute("hey sri lock my phone").await;
        assert_eq!(second, DispatchOutcome::Skipped(SkipReason::Busy));

        release.notify_one();
        let first = first.await.expect("first dispatch task");
        assert!(matches!(first, DispatchOutcome::Completed { .. }));
        assert_eq!(cap.lock_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn status_resets_to_idle_after_delay() {
        let (d, mut timers, publisher) = dispatcher(Arc::new(FakeCapability::granted()));
        d.execute("hey sri lock my phone").await;
        assert_eq!(d.status(), CommandStatus::Success);

        let start = tokio::time::Instant::now();
        let fired = timers.recv().await.expect("reset timer");
        assert!(start.elapsed() >= DEFAULT_STATUS_RESET_DELAY);
        assert!(d.on_reset_timer(fired));
        assert_eq!(d.status(), CommandStatus::Idle);
        assert_eq!(publisher.snapshot().status, CommandStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn listening_cancels_pending_reset() {
        let (d, mut timers, _publisher) = dispatcher(Arc::new(FakeCapability::granted()));
        d.execute("hey sri lock my phone").await;
        d.mark_listening();
        assert_eq!(d.status(), CommandStatus::Listening);

        let waited = tokio::time::timeout(Duration::from_secs(10), timers.recv()).await;
        assert!(waited.is_err(), "reset timer was cancelled");
    }

    #[tokio::test(start_paused = true)]
    async fn mark_idle_only_leaves_listening() {
        let (d, _timers, _publisher) = dispatcher(Arc::new(FakeCapability::granted()));
        d.mark_listening();
        d.mark_idle();
        assert_eq!(d.status(), CommandStatus::Idle);

        d.execute("hey sri lock my phone").await;
        d.mark_idle();
        assert_eq!(d.status(), CommandStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_last_command() {
        let (d, _timers, publisher) = dispatcher(Arc::new(FakeCapability::granted()));
        d.execute("hey sri lock my phone").await;
        d.reset();
        let snap = publisher.snapshot();
        assert_eq!(snap.status, CommandStatus::Idle);
        assert!(snap.last_command.is_none());
        assert!(snap.command_result.is_empty());
    }
}
