//! Noddy client core - conversational chat and voice for the Noddy assistant
//!
//! This library provides the interactive core behind a Noddy front end:
//! - Conversation session (transcript, chat requests, loading/error state)
//! - Voice interaction controller (speech capture, remote TTS with local
//!   synthesis fallback, playback)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │               Presentation layer                     │
//! │   terminal UI  │  web widget  │  anything else      │
//! └────────────────────┬────────────────────────────────┘
//!                      │ send_message / speak / listen
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Noddy client core                    │
//! │   ChatSession  │  VoiceController  │  BackendClient │
//! └────────────────────┬────────────────────────────────┘
//!                      │ POST /api/chat, POST /api/tts
//! ┌────────────────────▼────────────────────────────────┐
//! │              Noddy backend (HTTP)                    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The two core units are independent: the presentation layer passes the
//! text of a successful reply from the session to the controller when voice
//! output is enabled. They share no internal state.

pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod voice;

pub use chat::{ChatReply, ChatSession, Message, Role};
pub use client::BackendClient;
pub use config::{Config, VoiceSettings};
pub use error::{Error, Result};
pub use models::{DEFAULT_MODEL, MODELS, ModelInfo};
pub use voice::{VoiceBackends, VoiceController};
