//! `ScriptedEngine` — in-process recogniser driven by a handle.
//!
//! Behaves like a browser speech recogniser so the session and the whole
//! assistant loop can be exercised without a microphone:
//!
//! - `start()` emits `Started`; starting twice fails with `AlreadyStarted`.
//! - `stop()` / `abort()` emit `Ended` when running.
//! - [`ScriptedEngineHandle::fail`] emits `Error` followed by `Ended`.
//! - Result events carry the run's full segment list with a moving
//!   `result_index`, the way the Web Speech API reports them.
//!
//! Speech pushed through the handle while the engine is not running is
//! dropped, as a real recogniser would never hear it.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::{
    EngineErrorKind, EngineEvent, EngineEventSink, RecognitionEngine, RecognitionSegment,
    RecognizerConfig,
};
use crate::error::{AssistantError, Result};

#[derive(Default)]
struct ScriptState {
    sink: Option<EngineEventSink>,
    config: Option<RecognizerConfig>,
    running: bool,
    results: Vec<RecognitionSegment>,
    start_calls: usize,
    stop_calls: usize,
    abort_calls: usize,
    fail_next_start: Option<AssistantError>,
    fail_configure: Option<String>,
}

impl ScriptState {
    fn emit(&self, event: EngineEvent) {
        if let Some(sink) = &self.sink {
            let _ = sink.send(event);
        }
    }

    fn push_segment(&mut self, segment: RecognitionSegment) -> bool {
        if !self.running {
            debug!(text = %segment.transcript, "scripted engine not running, speech dropped");
            return false;
        }
        let index = match self.results.last() {
            Some(last) if !last.is_final => {
                let idx = self.results.len() - 1;
                self.results[idx] = segment;
                idx
            }
            _ => {
                self.results.push(segment);
                self.results.len() - 1
            }
        };
        self.emit(EngineEvent::Result {
            result_index: index,
            results: self.results.clone(),
        });
        true
    }

    fn end(&mut self) {
        if self.running {
            self.running = false;
            self.emit(EngineEvent::Ended);
        }
    }
}

/// The engine half, owned by the recognition session.
pub struct ScriptedEngine {
    shared: Arc<Mutex<ScriptState>>,
}

/// The driver half, kept by tests or the console host.
#[derive(Clone)]
pub struct ScriptedEngineHandle {
    shared: Arc<Mutex<ScriptState>>,
}

impl ScriptedEngine {
    pub fn new() -> (Self, ScriptedEngineHandle) {
        let shared = Arc::new(Mutex::new(ScriptState::default()));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            ScriptedEngineHandle { shared },
        )
    }
}

impl RecognitionEngine for ScriptedEngine {
    fn configure(&mut self, config: &RecognizerConfig, events: EngineEventSink) -> Result<()> {
        let mut state = self.shared.lock();
        if let Some(reason) = state.fail_configure.take() {
            return Err(AssistantError::Engine(reason));
        }
        state.config = Some(config.clone());
        state.sink = Some(events);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        let mut state = self.shared.lock();
        state.start_calls += 1;
        if let Some(err) = state.fail_next_start.take() {
            return Err(err);
        }
        if state.running {
            return Err(AssistantError::AlreadyStarted);
        }
        state.running = true;
        state.results.clear();
        state.emit(EngineEvent::Started);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut state = self.shared.lock();
        state.stop_calls += 1;
        state.end();
        Ok(())
    }

    fn abort(&mut self) {
        let mut state = self.shared.lock();
        state.abort_calls += 1;
        state.end();
    }
}

impl ScriptedEngineHandle {
    /// Deliver a provisional segment. Returns `false` if the engine is not running.
    pub fn partial(&self, text: &str) -> bool {
        self.shared
            .lock()
            .push_segment(RecognitionSegment::interim(text))
    }

    /// Deliver a confirmed segment. Returns `false` if the engine is not running.
    pub fn finalize(&self, text: &str) -> bool {
        self.shared
            .lock()
            .push_segment(RecognitionSegment::final_(text))
    }

    /// The recogniser closes on its own (silence timeout).
    pub fn end(&self) {
        self.shared.lock().end();
    }

    /// The recogniser reports an error and then closes.
    pub fn fail(&self, kind: EngineErrorKind) {
        let mut state = self.shared.lock();
        state.emit(EngineEvent::Error {
            kind,
            message: None,
        });
        state.end();
    }

    /// Make the next `start()` fail with `err`.
    pub fn fail_next_start(&self, err: AssistantError) {
        self.shared.lock().fail_next_start = Some(err);
    }

    /// Make `configure()` fail, simulating a recogniser that cannot be built.
    pub fn fail_configure(&self, reason: impl Into<String>) {
        self.shared.lock().fail_configure = Some(reason.into());
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    pub fn config(&self) -> Option<RecognizerConfig> {
        self.shared.lock().config.clone()
    }

    pub fn start_calls(&self) -> usize {
        self.shared.lock().start_calls
    }

    pub fn stop_calls(&self) -> usize {
        self.shared.lock().stop_calls
    }

    pub fn abort_calls(&self) -> usize {
        self.shared.lock().abort_calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::engine_event_channel;

    fn configured() -> (
        ScriptedEngine,
        ScriptedEngineHandle,
        crate::recognition::EngineEventReceiver,
    ) {
        let (mut engine, handle) = ScriptedEngine::new();
        let (tx, rx) = engine_event_channel();
        engine
            .configure(&RecognizerConfig::default(), tx)
            .expect("configure scripted engine");
        (engine, handle, rx)
    }

    #[test]
    fn start_emits_started_and_rejects_second_start() {
        let (mut engine, handle, mut rx) = configured();
        engine.start().expect("first start");
        assert_eq!(rx.try_recv().expect("started event"), EngineEvent::Started);
        assert!(matches!(engine.start(), Err(AssistantError::AlreadyStarted)));
        assert_eq!(handle.start_calls(), 2);
        assert!(handle.is_running());
    }

    #[test]
    fn partial_then_final_reuse_the_same_slot() {
        let (mut engine, handle, mut rx) = configured();
        engine.start().expect("start");
        let _ = rx.try_recv();

        assert!(handle.partial("hey"));
        assert!(handle.finalize("hey sri"));
        assert!(handle.partial("lock"));

        let mut last = None;
        while let Ok(ev) = rx.try_recv() {
            last = Some(ev);
        }
        match last.expect("result event") {
            EngineEvent::Result {
                result_index,
                results,
            } => {
                assert_eq!(result_index, 1);
                assert_eq!(results.len(), 2);
                assert!(results[0].is_final);
                assert_eq!(results[0].transcript, "hey sri");
                assert!(!results[1].is_final);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn speech_is_dropped_while_stopped() {
        let (_engine, handle, mut rx) = configured();
        assert!(!handle.partial("hey sri"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stop_emits_ended_only_when_running() {
        let (mut engine, handle, mut rx) = configured();
        engine.stop().expect("stop idle engine");
        assert!(rx.try_recv().is_err());

        engine.start().expect("start");
        engine.stop().expect("stop");
        assert_eq!(rx.try_recv().expect("started"), EngineEvent::Started);
        assert_eq!(rx.try_recv().expect("ended"), EngineEvent::Ended);
        assert_eq!(handle.stop_calls(), 2);
    }

    #[test]
    fn fail_reports_error_then_ended() {
        let (mut engine, handle, mut rx) = configured();
        engine.start().expect("start");
        let _ = rx.try_recv();
        handle.fail(EngineErrorKind::NoSpeech);
        assert!(matches!(
            rx.try_recv().expect("error"),
            EngineEvent::Error {
                kind: EngineErrorKind::NoSpeech,
                ..
            }
        ));
        assert_eq!(rx.try_recv().expect("ended"), EngineEvent::Ended);
        assert!(!handle.is_running());
    }

    #[test]
    fn configure_failure_is_reported_once() {
        let (mut engine, handle) = ScriptedEngine::new();
        handle.fail_configure("no recogniser service");
        let (tx, _rx) = engine_event_channel();
        let err = engine
            .configure(&RecognizerConfig::default(), tx)
            .expect_err("configure should fail");
        assert!(err.to_string().contains("no recogniser service"));
        assert!(handle.config().is_none());
    }
}
