use crate::types::{
    ListenPayload, ListenRequest, LiveSetup, ServerEvent, SetupRequest, TtsPayload, TtsRequest,
};
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

pub const DEFAULT_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/live";

type WsWriter =
    futures_util::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsReader = futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Events surfaced by the Live speech endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// Final transcript of one user utterance.
    Transcription(String),
    Speaking,
    SpeakingDone,
    Error(String),
    Closed,
}

impl LiveEvent {
    fn from_server(event: ServerEvent) -> Option<Self> {
        match event.event.as_str() {
            "transcription" => Some(Self::Transcription(event.text.unwrap_or_default())),
            "speaking" => Some(Self::Speaking),
            "speaking_done" | "turn_complete" => Some(Self::SpeakingDone),
            "error" => Some(Self::Error(
                event.text.unwrap_or_else(|| "unknown error".to_string()),
            )),
            other => {
                tracing::debug!("Ignoring unknown live event '{}'", other);
                None
            }
        }
    }
}

/// A client for the Gemini Live WebSocket API, used for speech in and out.
pub struct LiveClient {
    write: WsWriter,
    read: WsReader,
}

/// Appends the API key to `url`, keeping any existing query and giving a
/// bare host the root path.
fn keyed_url(url: &str, api_key: &str) -> Result<String> {
    let uri: Uri = url
        .parse()
        .with_context(|| format!("Invalid Gemini Live URL '{url}'"))?;
    let scheme = uri
        .scheme_str()
        .with_context(|| format!("Gemini Live URL '{url}' has no scheme"))?;
    let authority = uri
        .authority()
        .with_context(|| format!("Gemini Live URL '{url}' has no host"))?;
    let path = match uri.path() {
        "" => "/",
        path => path,
    };
    Ok(match uri.query() {
        Some(query) if !query.is_empty() => {
            format!("{scheme}://{authority}{path}?{query}&key={api_key}")
        }
        _ => format!("{scheme}://{authority}{path}?key={api_key}"),
    })
}

/// Establishes a connection to the Live service and sends the session setup.
pub async fn connect(url: &str, api_key: &SecretString, model: &str) -> Result<LiveClient> {
    let url = keyed_url(url, api_key.expose_secret())?;
    let (ws_stream, _) = connect_async(url)
        .await
        .context("Failed to connect to Gemini Live WebSocket")?;

    tracing::info!("Successfully connected to Gemini Live WebSocket.");
    let (write, read) = ws_stream.split();
    let mut client = LiveClient { write, read };
    client
        .send_setup(
            model,
            "You are a job interviewer. Read questions aloud verbatim and transcribe the candidate's answers.",
        )
        .await?;
    Ok(client)
}

impl LiveClient {
    async fn send_json<T: serde::Serialize>(&mut self, value: &T, what: &'static str) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.write
            .send(Message::Text(json))
            .await
            .with_context(|| format!("Failed to send {what} message"))
    }

    async fn send_setup(&mut self, model: &str, instructions: &str) -> Result<()> {
        let req = SetupRequest {
            setup: LiveSetup {
                model: model.to_string(),
                instructions: instructions.to_string(),
            },
        };
        self.send_json(&req, "setup").await
    }

    /// Asks the service to speak `text`. Completion arrives as [`LiveEvent::SpeakingDone`].
    pub async fn send_tts(&mut self, text: String) -> Result<()> {
        let req = TtsRequest {
            tts: TtsPayload { text },
        };
        self.send_json(&req, "TTS").await
    }

    /// Opens the microphone for a single utterance.
    pub async fn start_listening(&mut self) -> Result<()> {
        let req = ListenRequest {
            listen: ListenPayload {
                single_utterance: true,
            },
        };
        self.send_json(&req, "listen").await
    }

    /// Reads the next event from the server.
    pub async fn next_event(&mut self) -> Result<LiveEvent> {
        while let Some(msg) = self.read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let event: ServerEvent = serde_json::from_str(&text)
                        .context("Failed to deserialize live server event")?;
                    if let Some(event) = LiveEvent::from_server(event) {
                        return Ok(event);
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::warn!("Received unexpected binary message from Gemini Live.");
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Gemini Live WebSocket connection closed.");
                    return Ok(LiveEvent::Closed);
                }
                Err(e) => {
                    tracing::error!("Error reading from Gemini Live WebSocket: {}", e);
                    return Err(e.into());
                }
                _ => { /* Ignore Ping/Pong */ }
            }
        }
        Ok(LiveEvent::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(event: &str, text: Option<&str>) -> ServerEvent {
        ServerEvent {
            event: event.to_string(),
            text: text.map(str::to_string),
        }
    }

    #[test]
    fn key_is_appended_to_live_url() {
        assert_eq!(
            keyed_url("ws://127.0.0.1:9000", "k").unwrap(),
            "ws://127.0.0.1:9000/?key=k"
        );
        assert_eq!(
            keyed_url(DEFAULT_LIVE_URL, "k").unwrap(),
            "wss://generativelanguage.googleapis.com/ws/live?key=k"
        );
        assert_eq!(
            keyed_url("wss://example.com/live?alt=json", "k").unwrap(),
            "wss://example.com/live?alt=json&key=k"
        );
        assert!(keyed_url("not a url", "k").is_err());
    }

    #[test]
    fn maps_server_events() {
        assert_eq!(
            LiveEvent::from_server(server("transcription", Some("I use hooks"))),
            Some(LiveEvent::Transcription("I use hooks".to_string()))
        );
        assert_eq!(
            LiveEvent::from_server(server("turn_complete", None)),
            Some(LiveEvent::SpeakingDone)
        );
        assert_eq!(
            LiveEvent::from_server(server("error", None)),
            Some(LiveEvent::Error("unknown error".to_string()))
        );
        assert_eq!(LiveEvent::from_server(server("pong", None)), None);
    }
}
