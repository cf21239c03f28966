//! Thin clients for the Google Gemini APIs used by InterVu.
//!
//! [`GeminiClient`] wraps the REST `generateContent` endpoint for plain text
//! prompts. [`live::LiveClient`] wraps the Live WebSocket endpoint that the
//! interviewer uses to speak questions and transcribe answers.

pub mod client;
pub mod live;
pub mod types;

pub use client::{GeminiClient, strip_code_fences};
pub use live::{LiveClient, LiveEvent};
