use crate::interview::RecordId;

/// Errors surfaced by the interview workflow.
///
/// Every variant is recoverable at the user level: the caller reports it and
/// the user may retry the action that triggered it.
#[derive(Debug, thiserror::Error)]
pub enum InterviewError {
    #[error("No questions available: {0}")]
    SourceUnavailable(String),
    #[error("Speech is not supported in this environment")]
    SpeechUnsupported,
    #[error("Failed to capture an answer for question {index}: {reason}")]
    CaptureFailed { index: usize, reason: String },
    #[error("Persistence failed: {0}")]
    PersistenceFailed(#[from] StoreError),
    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),
    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),
    #[error("Cannot {action} while the session is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

/// Errors from a persistence gateway.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Interview {0} not found")]
    NotFound(RecordId),
    #[error("Interview {0} belongs to another user")]
    Forbidden(RecordId),
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to (de)serialize a stored document: {0}")]
    Serialization(#[from] serde_json::Error),
}
