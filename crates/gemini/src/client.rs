use crate::types::{GenerateContentRequest, GenerateContentResponse, GenerationConfig};
use anyhow::{Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// A client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends a single prompt and returns the text of the first candidate.
    ///
    /// When `json` is set the model is asked for an `application/json` reply.
    pub async fn generate(&self, prompt: &str, temperature: Option<f32>, json: bool) -> Result<String> {
        let generation_config = GenerationConfig {
            temperature,
            response_mime_type: json.then(|| "application/json".to_string()),
        };
        let body = GenerateContentRequest::from_prompt(prompt, Some(generation_config));
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Sending generateContent request");

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.expose_secret())])
            .json(&body)
            .send()
            .await
            .context("Failed to reach Gemini")?
            .error_for_status()
            .context("Gemini returned an error status")?
            .json::<GenerateContentResponse>()
            .await
            .context("Failed to decode Gemini response")?;

        resp.first_text()
            .ok_or_else(|| anyhow::anyhow!("No candidates in Gemini response"))
    }
}

/// Removes a surrounding markdown code fence (```` ```json ```` or ```` ``` ````).
pub fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}
