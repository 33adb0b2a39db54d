//! Error types for the Noddy client core

use thiserror::Error;

/// Result type alias for Noddy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Noddy client core
#[derive(Debug, Error)]
pub enum Error {
    /// Chat backend error (non-success status or malformed response)
    #[error("chat error: {0}")]
    Chat(String),

    /// Text-to-speech backend error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Voice capture or local synthesis error
    #[error("voice error: {0}")]
    Voice(String),

    /// Audio device or decoding error
    #[error("audio error: {0}")]
    Audio(String),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
