//! Speech in and out through one Gemini Live connection.

use async_trait::async_trait;
use intervu_core::speech::{Listener, Speaker, SpeechError};
use intervu_gemini::{LiveClient, LiveEvent};
use std::sync::Arc;
use tokio::sync::Mutex;

/// The connection plus the number of listen requests still awaiting a
/// transcription. Listens cancelled by a timeout or the end signal stay open
/// on the server, and their late transcriptions arrive first.
struct LiveLine {
    client: LiveClient,
    open_utterances: usize,
}

impl LiveLine {
    /// Consumes one transcription. Returns `true` if it answers the most
    /// recent listen request rather than an abandoned one.
    fn take_transcription(&mut self) -> bool {
        let current = self.open_utterances <= 1;
        self.open_utterances = self.open_utterances.saturating_sub(1);
        current
    }
}

/// Shares one [`LiveClient`] between the speaking and listening halves.
///
/// The runner never speaks and listens at once, so a single lock is enough to
/// keep the two event streams apart.
pub fn split(client: LiveClient) -> (LiveSpeaker, LiveListener) {
    let line = Arc::new(Mutex::new(LiveLine {
        client,
        open_utterances: 0,
    }));
    (
        LiveSpeaker { line: line.clone() },
        LiveListener { line },
    )
}

pub struct LiveSpeaker {
    line: Arc<Mutex<LiveLine>>,
}

pub struct LiveListener {
    line: Arc<Mutex<LiveLine>>,
}

fn failed(e: anyhow::Error) -> SpeechError {
    SpeechError::Failed(format!("{e:#}"))
}

#[async_trait]
impl Speaker for LiveSpeaker {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let mut line = self.line.lock().await;
        line.client.send_tts(text.to_string()).await.map_err(failed)?;
        loop {
            match line.client.next_event().await.map_err(failed)? {
                LiveEvent::SpeakingDone => return Ok(()),
                LiveEvent::Speaking => tracing::trace!("Question playback in progress"),
                LiveEvent::Transcription(stale) => {
                    line.take_transcription();
                    tracing::debug!("Dropping transcription received while speaking: {:?}", stale)
                }
                LiveEvent::Error(reason) => return Err(SpeechError::Failed(reason)),
                LiveEvent::Closed => {
                    return Err(SpeechError::Failed("live connection closed".to_string()));
                }
            }
        }
    }
}

#[async_trait]
impl Listener for LiveListener {
    async fn listen(&self) -> Result<Option<String>, SpeechError> {
        let mut line = self.line.lock().await;
        line.open_utterances += 1;
        if let Err(e) = line.client.start_listening().await {
            line.open_utterances -= 1;
            return Err(failed(e));
        }
        loop {
            match line.client.next_event().await.map_err(failed)? {
                LiveEvent::Transcription(text) => {
                    if !line.take_transcription() {
                        tracing::debug!("Dropping late transcription of an abandoned answer: {:?}", text);
                        continue;
                    }
                    let text = text.trim();
                    return Ok((!text.is_empty()).then(|| text.to_string()));
                }
                LiveEvent::Speaking | LiveEvent::SpeakingDone => {}
                LiveEvent::Error(reason) => return Err(SpeechError::Failed(reason)),
                LiveEvent::Closed => {
                    return Err(SpeechError::Failed("live connection closed".to_string()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use secrecy::SecretString;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::protocol::Message;

    /// Accepts one connection and answers each client request with `replies`.
    async fn fake_live_server(replies: Vec<Vec<&'static str>>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            // setup
            ws.next().await.unwrap().unwrap();
            for batch in replies {
                let request = ws.next().await.unwrap().unwrap();
                assert!(request.is_text());
                for reply in batch {
                    ws.send(Message::Text(reply.to_string())).await.unwrap();
                }
            }
        });
        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn speaks_then_transcribes() {
        let url = fake_live_server(vec![
            vec![
                r#"{"event":"speaking"}"#,
                r#"{"event":"transcription","text":"echo"}"#,
                r#"{"event":"speaking_done"}"#,
            ],
            vec![r#"{"event":"transcription","text":"  I would use a hook  "}"#],
        ])
        .await;
        let client = intervu_gemini::live::connect(&url, &SecretString::from("k".to_string()), "test-model")
            .await
            .unwrap();
        let (speaker, listener) = split(client);

        speaker.speak("What is useState?").await.unwrap();
        assert_eq!(
            listener.listen().await.unwrap(),
            Some("I would use a hook".to_string())
        );
    }

    #[tokio::test]
    async fn late_transcription_of_abandoned_listen_is_dropped() {
        let url = fake_live_server(vec![
            vec![],
            vec![
                r#"{"event":"transcription","text":"answer to the first question"}"#,
                r#"{"event":"transcription","text":"answer to the second question"}"#,
            ],
        ])
        .await;
        let client = intervu_gemini::live::connect(&url, &SecretString::from("k".to_string()), "test-model")
            .await
            .unwrap();
        let (_speaker, listener) = split(client);

        let abandoned =
            tokio::time::timeout(std::time::Duration::from_millis(50), listener.listen()).await;
        assert!(abandoned.is_err());

        assert_eq!(
            listener.listen().await.unwrap(),
            Some("answer to the second question".to_string())
        );
    }

    #[tokio::test]
    async fn server_errors_become_speech_failures() {
        let url = fake_live_server(vec![vec![r#"{"event":"error","text":"mic busy"}"#]]).await;
        let client = intervu_gemini::live::connect(&url, &SecretString::from("k".to_string()), "test-model")
            .await
            .unwrap();
        let (_speaker, listener) = split(client);

        match listener.listen().await {
            Err(SpeechError::Failed(reason)) => assert_eq!(reason, "mic busy"),
            other => panic!("expected a failure, got {other:?}"),
        }
    }
}
