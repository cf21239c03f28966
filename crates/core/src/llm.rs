use anyhow::Result;
use async_trait::async_trait;
use intervu_gemini::GeminiClient;
use std::sync::Arc;
#[cfg(test)]
use mockall::automock;

/// Expected shape of a model reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyFormat {
    Text,
    Json,
}

/// A text-in/text-out language model.
///
/// The question source and evaluator depend on this rather than on a concrete
/// provider, so tests can script replies without network calls.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f32, format: ReplyFormat) -> Result<String>;
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, temperature: f32, format: ReplyFormat) -> Result<String> {
        GeminiClient::generate(self, prompt, Some(temperature), format == ReplyFormat::Json).await
    }
}

/// Lets one client be shared by the question source and the evaluator.
#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn generate(&self, prompt: &str, temperature: f32, format: ReplyFormat) -> Result<String> {
        (**self).generate(prompt, temperature, format).await
    }
}
