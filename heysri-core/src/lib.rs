//! # heysri-core
//!
//! Hands-free "Hey Sri" voice-command engine.
//!
//! ## Architecture
//!
//! ```text
//! RecognitionEngine ──EngineEvent──► RecognitionSession (auto-restart)
//!                                          │ transcript
//!                                    AutoTrigger (wake word + complete command)
//!                                          │ stop session
//!                                    CommandDispatcher ──► CapabilityProvider
//!                                          │
//!                                    StatePublisher ──► snapshot + broadcast<AssistantEvent>
//! ```
//!
//! One tokio task ([`engine::VoiceAssistant`]) owns the session, the
//! detector and the dispatcher and drains engine events, timers and
//! controls in order.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod capability;
pub mod command;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod recognition;
pub mod session;
pub mod timer;
pub mod trigger;

// Convenience re-exports for downstream crates
pub use capability::{
    ActionResult, CapabilityProvider, DeviceAdminCapability, DevicePolicy, PermissionStatus,
    WebCapability,
};
pub use command::{contains_wake_word, parse_command, CommandKind, VoiceCommand};
pub use dispatch::{CommandDispatcher, DispatchOutcome, SkipReason};
pub use engine::{AssistantConfig, VoiceAssistant};
pub use error::{AssistantError, Result};
pub use ipc::events::{AssistantEvent, AssistantEventKind, AssistantSnapshot, CommandStatus};
pub use recognition::{
    scripted::{ScriptedEngine, ScriptedEngineHandle},
    EngineErrorKind, EngineEvent, RecognitionEngine, RecognitionSegment, RecognizerConfig,
};
