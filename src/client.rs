//! HTTP client for the Noddy backend
//!
//! Two endpoints are consumed: `POST /api/chat` for replies and
//! `POST /api/tts` for synthesized speech audio.

use serde::Serialize;

use crate::chat::{ChatReply, Message};
use crate::{Error, Result};

/// Client for the Noddy backend HTTP API
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    api_url: String,
}

impl BackendClient {
    /// Create a client for the backend at `api_url`
    #[must_use]
    pub fn new(api_url: impl Into<String>) -> Self {
        let mut api_url = api_url.into();
        while api_url.ends_with('/') {
            api_url.pop();
        }

        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }

    /// The backend base URL
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Request a chat reply
    ///
    /// `history` is the prior conversation, oldest first. The current
    /// `message` travels in its own field and must not be repeated there.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend answers with a
    /// non-success status.
    pub async fn chat(&self, message: &str, history: &[Message], model: &str) -> Result<ChatReply> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            message: &'a str,
            history: &'a [Message],
            model: &'a str,
        }

        let request = ChatRequest {
            message,
            history,
            model,
        };

        tracing::debug!(model, history_len = history.len(), "sending chat request");

        let response = self
            .client
            .post(format!("{}/api/chat", self.api_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Chat(format!("chat backend error {status}: {body}")));
        }

        let reply: ChatReply = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse chat response");
            e
        })?;

        tracing::debug!(response_len = reply.response.len(), "chat reply received");
        Ok(reply)
    }

    /// Synthesize speech for `text`
    ///
    /// # Returns
    ///
    /// Raw audio bytes (MP3 from the production backend, WAV from the
    /// prototype backend).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend answers with a
    /// non-success status.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(Serialize)]
        struct TtsRequest<'a> {
            text: &'a str,
        }

        let response = self
            .client
            .post(format!("{}/api/tts", self.api_url))
            .json(&TtsRequest { text })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("TTS backend error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(audio_bytes = audio.len(), "TTS audio received");
        Ok(audio.to_vec())
    }
}
