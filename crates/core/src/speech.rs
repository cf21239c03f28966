//! Speech adapters.
//!
//! Audio capability depends on the environment, so each direction is modelled
//! as an enum with an `Available` and an `Unavailable` variant instead of
//! feature checks spread through the session flow.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech is not supported")]
    Unsupported,
    #[error("speech failed: {0}")]
    Failed(String),
    #[error("timed out waiting for speech")]
    TimedOut,
}

/// Turns text into audible speech. Returns once playback has completed.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

/// Captures one utterance and returns its transcript.
///
/// `Ok(None)` means nothing was said.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Listener: Send + Sync {
    async fn listen(&self) -> Result<Option<String>, SpeechError>;
}

pub enum SpeechOutput {
    Available(Box<dyn Speaker>),
    Unavailable,
}

pub enum SpeechInput {
    Available(Box<dyn Listener>),
    Unavailable,
}

impl SpeechOutput {
    pub fn is_available(&self) -> bool {
        matches!(self, SpeechOutput::Available(_))
    }

    pub async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        match self {
            SpeechOutput::Available(speaker) => speaker.speak(text).await,
            SpeechOutput::Unavailable => Err(SpeechError::Unsupported),
        }
    }
}

impl SpeechInput {
    pub fn is_available(&self) -> bool {
        matches!(self, SpeechInput::Available(_))
    }

    pub async fn listen(&self) -> Result<Option<String>, SpeechError> {
        match self {
            SpeechInput::Available(listener) => listener.listen().await,
            SpeechInput::Unavailable => Err(SpeechError::Unsupported),
        }
    }
}
