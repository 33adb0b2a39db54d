//! Configuration for the Noddy client core

pub mod file;

use crate::models;

/// Default backend base URL for local development
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL (chat and TTS endpoints live under `/api`)
    pub api_url: String,

    /// Default chat model identifier
    pub model: String,

    /// Voice interaction configuration
    pub voice: VoiceSettings,
}

/// Voice interaction configuration
#[derive(Debug, Clone)]
pub struct VoiceSettings {
    /// Speak successful replies out loud
    pub output_enabled: bool,

    /// Voice names tried in order when selecting a local fallback voice
    pub preferred_voices: Vec<String>,

    /// Pitch for local fallback synthesis (1.0 = engine default)
    pub pitch: f32,

    /// Speaking rate for local fallback synthesis (1.0 = engine default)
    pub rate: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            output_enabled: false,
            preferred_voices: vec![
                "Female".to_string(),
                "Samantha".to_string(),
                "Google US English".to_string(),
            ],
            // Slightly raised pitch suits the persona
            pitch: 1.1,
            rate: 1.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: models::DEFAULT_MODEL.to_string(),
            voice: VoiceSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration: defaults, overlaid with the TOML config file,
    /// overlaid with `NODDY_API_URL` / `NODDY_MODEL` environment variables.
    #[must_use]
    pub fn load() -> Self {
        let mut config = Self::default();
        config.apply_file(&file::load_config_file());

        if let Ok(url) = std::env::var("NODDY_API_URL") {
            if !url.is_empty() {
                config.api_url = url;
            }
        }
        if let Ok(model) = std::env::var("NODDY_MODEL") {
            if !model.is_empty() {
                config.model = model;
            }
        }

        config
    }

    /// Overlay values from the TOML config file
    fn apply_file(&mut self, f: &file::NoddyConfigFile) {
        if let Some(url) = &f.api_url {
            self.api_url = url.clone();
        }
        if let Some(model) = &f.llm.model {
            self.model = model.clone();
        }
        if let Some(enabled) = f.voice.output_enabled {
            self.voice.output_enabled = enabled;
        }
        if let Some(voices) = &f.voice.preferred_voices {
            self.voice.preferred_voices = voices.clone();
        }
        if let Some(pitch) = f.voice.pitch {
            self.voice.pitch = pitch;
        }
        if let Some(rate) = f.voice.rate {
            self.voice.rate = rate;
        }
    }
}
