//! Typed answers from a line-based reader (stdin in practice).

use async_trait::async_trait;
use intervu_core::runner::EndSignal;
use intervu_core::speech::{Listener, SpeechError};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::Mutex;

/// Typing this instead of an answer ends the interview.
pub const END_COMMAND: &str = "/end";

pub struct ConsoleListener<R> {
    lines: Mutex<Lines<R>>,
    end: Arc<EndSignal>,
}

impl<R: AsyncBufRead + Unpin> ConsoleListener<R> {
    pub fn new(reader: R, end: Arc<EndSignal>) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
            end,
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> Listener for ConsoleListener<R> {
    /// One line is one answer. A blank line is no answer; end of input and
    /// [`END_COMMAND`] both end the interview.
    async fn listen(&self) -> Result<Option<String>, SpeechError> {
        let mut lines = self.lines.lock().await;
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.eq_ignore_ascii_case(END_COMMAND) {
                    self.end.request();
                    Ok(None)
                } else if line.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(line.to_string()))
                }
            }
            Ok(None) => {
                tracing::info!("Input closed, ending the interview");
                self.end.request();
                Ok(None)
            }
            Err(e) => Err(SpeechError::Failed(format!("failed to read answer: {e}"))),
        }
    }
}
