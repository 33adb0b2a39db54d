//! The fixed model catalog offered by the settings panel

use serde::Serialize;

/// Default chat model
pub const DEFAULT_MODEL: &str = "meta/llama-3.1-405b-instruct";

/// A selectable chat model
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelInfo {
    /// Model identifier sent to the backend
    pub id: &'static str,
    /// Display name shown to the user
    pub name: &'static str,
}

/// Models the backend can route to, in display order
pub const MODELS: [ModelInfo; 6] = [
    ModelInfo {
        id: "meta/llama-3.1-405b-instruct",
        name: "Llama 3.1 405B (NVIDIA)",
    },
    ModelInfo {
        id: "google/gemini-2.0-flash-exp:free",
        name: "Gemini 2.0 Flash (Free)",
    },
    ModelInfo {
        id: "mistralai/mistral-7b-instruct:free",
        name: "Mistral 7B (Free)",
    },
    ModelInfo {
        id: "x-ai/grok-2-vision-1212",
        name: "Grok 2 Vision",
    },
    ModelInfo {
        id: "openai/gpt-3.5-turbo",
        name: "GPT-3.5 Turbo",
    },
    ModelInfo {
        id: "anthropic/claude-3-haiku",
        name: "Claude 3 Haiku",
    },
];

/// Look up a model by identifier
#[must_use]
pub fn find(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}
