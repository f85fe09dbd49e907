use thiserror::Error;

/// All errors produced by heysri-core.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("speech recognition is not supported on this platform")]
    Unsupported,

    #[error("recognition already started")]
    AlreadyStarted,

    #[error("microphone access denied")]
    MicrophoneDenied,

    #[error("recognition engine error: {0}")]
    Engine(String),

    #[error("{0}")]
    Capability(String),

    #[error("assistant has shut down")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AssistantError {
    /// `true` for conditions the session shrugs off without surfacing them.
    pub fn is_benign(&self) -> bool {
        matches!(self, AssistantError::AlreadyStarted)
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;
