//! Configuration loading utilities.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::schema::Config;

/// Get the default configuration file path (`~/.voicebot/config.json`).
pub fn get_config_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".voicebot").join("config.json")
}

/// Load configuration from a file, or return a default [`Config`] if the file
/// does not exist or cannot be parsed, then apply environment overrides.
///
/// If `config_path` is `None`, the default path (`~/.voicebot/config.json`) is
/// used.
pub fn load_config(config_path: Option<&Path>) -> Config {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => get_config_path(),
    };

    let mut config = Config::default();

    if path.exists() {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Config>(&contents) {
                Ok(cfg) => config = cfg,
                Err(e) => {
                    warn!(
                        "Failed to parse config from {}: {}. Using default configuration.",
                        path.display(),
                        e
                    );
                }
            },
            Err(e) => {
                warn!(
                    "Failed to read config from {}: {}. Using default configuration.",
                    path.display(),
                    e
                );
            }
        }
    }

    apply_env_overrides(&mut config);
    config
}

/// Apply environment variable overrides on top of the file config.
///
/// The storage and turn-table locations are the deploy-time settings the
/// hosting environment injects; service keys follow the same convention.
fn apply_env_overrides(config: &mut Config) {
    if let Ok(v) = std::env::var("VOICEBOT_STORAGE_URL") {
        config.storage.base_url = v;
    }
    if let Ok(v) = std::env::var("VOICEBOT_AUDIO_BUCKET") {
        config.storage.bucket = v;
    }
    if let Ok(v) = std::env::var("VOICEBOT_CONVERSATION_DB") {
        config.storage.db_path = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("VOICEBOT_STORAGE_API_KEY") {
        config.storage.api_key = v;
    }
    if let Ok(v) = std::env::var("VOICEBOT_TRANSCRIBE_URL") {
        config.transcription.base_url = v;
    }
    if let Ok(v) = std::env::var("VOICEBOT_TRANSCRIBE_API_KEY") {
        config.transcription.api_key = v;
    }
    if let Ok(v) = std::env::var("VOICEBOT_LLM_API_KEY") {
        config.llm.api_key = v;
    }
    if let Ok(v) = std::env::var("VOICEBOT_TTS_URL") {
        config.tts.base_url = v;
    }
    if let Ok(v) = std::env::var("VOICEBOT_TTS_API_KEY") {
        config.tts.api_key = v;
    }
}
