//! TOML configuration file loading
//!
//! Supports `~/.config/noddy/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct NoddyConfigFile {
    /// Backend base URL (e.g. `http://localhost:8000`)
    #[serde(default)]
    pub api_url: Option<String>,

    /// LLM configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Voice configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Model identifier (e.g. "meta/llama-3.1-405b-instruct")
    pub model: Option<String>,
}

/// Voice configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Speak successful replies out loud
    pub output_enabled: Option<bool>,

    /// Voice names tried in order for local fallback synthesis
    pub preferred_voices: Option<Vec<String>>,

    /// Local fallback pitch (1.0 = engine default)
    pub pitch: Option<f32>,

    /// Local fallback speaking rate (1.0 = engine default)
    pub rate: Option<f32>,
}

/// Load the TOML config file from the standard path
///
/// Returns `NoddyConfigFile::default()` if the file doesn't exist or can't be
/// parsed.
#[must_use]
pub fn load_config_file() -> NoddyConfigFile {
    let Some(path) = config_file_path() else {
        return NoddyConfigFile::default();
    };

    if !path.exists() {
        return NoddyConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                NoddyConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            NoddyConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/noddy/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("noddy").join("config.toml"))
}
