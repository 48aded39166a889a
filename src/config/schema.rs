//! Configuration schema for voicebot.
//!
//! All structs use `#[serde(rename_all = "camelCase")]` so that the JSON config
//! file can use camelCase keys while Rust code uses snake_case fields.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Blob storage gateway and turn-table locations.
///
/// `bucket` and `db_path` are the two pieces of required external
/// configuration; everything else has a usable default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Base URL of the blob storage gateway.
    #[serde(default)]
    pub base_url: String,
    /// Bucket that holds input and output audio artifacts.
    #[serde(default)]
    pub bucket: String,
    /// Bearer token for the storage gateway.
    #[serde(default)]
    pub api_key: String,
    /// Location of the SQLite turn table.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".voicebot").join("turns.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            bucket: String::new(),
            api_key: String::new(),
            db_path: default_db_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// Transcription
// ---------------------------------------------------------------------------

/// Async transcription service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Fixed sleep between job status polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Bound on status polls before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_max_attempts() -> u32 {
    30
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            language: default_language(),
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

// ---------------------------------------------------------------------------
// LLM
// ---------------------------------------------------------------------------

/// Text-generation provider configuration (OpenAI-compatible endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    "anthropic/claude-3-haiku".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: default_model(),
        }
    }
}

// ---------------------------------------------------------------------------
// TTS
// ---------------------------------------------------------------------------

/// Speech synthesis service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_voice")]
    pub voice: String,
}

fn default_voice() -> String {
    "joanna".to_string()
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            voice: default_voice(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub tts: TtsConfig,
}

impl Config {
    /// Check that the required external locations are configured.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.storage.base_url.is_empty() {
            anyhow::bail!("storage.baseUrl is required (or set VOICEBOT_STORAGE_URL)");
        }
        if self.storage.bucket.is_empty() {
            anyhow::bail!("storage.bucket is required (or set VOICEBOT_AUDIO_BUCKET)");
        }
        if self.storage.db_path.as_os_str().is_empty() {
            anyhow::bail!("storage.dbPath is required (or set VOICEBOT_CONVERSATION_DB)");
        }
        Ok(())
    }
}
