//! Conversation session
//!
//! Holds the ordered transcript, issues chat requests with the
//! greeting-stripped history, and tracks loading/error state. The session
//! never fails outward: a backend failure becomes a user-visible apology in
//! the transcript plus a diagnostic in [`ChatSession::error`].

use serde::{Deserialize, Serialize};

use crate::client::BackendClient;

/// Greeting seeded into every new session. Local-only context: it is never
/// replayed to the backend.
pub const GREETING: &str = "Hi there! I'm Noddy. How can I brighten your day? ✨";

/// Fixed reply appended to the transcript when the backend can't be reached
pub const APOLOGY: &str = "Sorry, I'm having trouble connecting right now. 😓";

/// Who authored a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side of the conversation
    User,
    /// Noddy
    Assistant,
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message author
    pub role: Role,
    /// Message text
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Successful reply from the chat endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    /// Reply text
    pub response: String,

    /// Optional reasoning trace for the thought panel
    #[serde(default)]
    pub thoughts: Option<Vec<String>>,
}

/// A conversation with the Noddy backend
///
/// Owns the transcript exclusively; it is mutated only by
/// [`ChatSession::send_message`].
#[derive(Debug)]
pub struct ChatSession {
    client: BackendClient,
    messages: Vec<Message>,
    is_loading: bool,
    error: Option<String>,
}

impl ChatSession {
    /// Open a session seeded with the greeting
    #[must_use]
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            messages: vec![Message::assistant(GREETING)],
            is_loading: false,
            error: None,
        }
    }

    /// The transcript, oldest first
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether a request is in flight
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Diagnostic from the most recent failed request, cleared on the next
    /// send
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Send `text` to the backend and append the reply to the transcript
    ///
    /// Whitespace-only input is a no-op: no transcript mutation, no request.
    /// Otherwise the user message is appended immediately, and exactly one
    /// assistant message follows: the real reply on success, the fixed
    /// apology on failure. Returns `None` on failure (or empty input) so the
    /// caller knows not to trigger voice playback.
    pub async fn send_message(&mut self, text: &str, model: &str) -> Option<ChatReply> {
        if text.trim().is_empty() {
            return None;
        }

        // History is the conversation as it stood before this call, minus
        // the seeded greeting. The new message travels in its own field.
        let history: Vec<Message> = self.messages.iter().skip(1).cloned().collect();

        self.messages.push(Message::user(text));
        self.is_loading = true;
        self.error = None;

        let result = self.client.chat(text, &history, model).await;
        self.is_loading = false;

        match result {
            Ok(reply) => {
                self.messages.push(Message::assistant(&reply.response));
                Some(reply)
            }
            Err(e) => {
                tracing::error!(error = %e, "chat request failed");
                self.error = Some(e.to_string());
                self.messages.push(Message::assistant(APOLOGY));
                None
            }
        }
    }
}
