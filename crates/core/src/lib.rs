pub mod context;
pub mod error;
pub mod evaluation;
pub mod evaluator;
pub mod interview;
pub mod llm;
pub mod profile;
pub mod prompts;
pub mod question_source;
pub mod runner;
pub mod session_state;
pub mod speech;
pub mod store;

pub use context::{OwnerId, SessionContext};
pub use error::{InterviewError, StoreError};

/// Events the session runner issues to whatever front end is attached.
///
/// Keeps the decision-making in [`runner::InterviewRunner`] apart from how the
/// runtime presents things.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Present a question as text. Always sent, spoken or not.
    ShowQuestion {
        index: usize,
        total: usize,
        text: String,
    },
    /// The question is about to be spoken aloud.
    SpeakText(String),
    /// An answer slot was closed. `None` means nothing was captured.
    AnswerCaptured {
        index: usize,
        answer: Option<String>,
    },
    /// Something went wrong but the session continues.
    Notice(String),
    /// The session reached `Finished`, with a closing message.
    SessionComplete(String),
}
