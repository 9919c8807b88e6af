//! Configuration for the transcription core.
//!
//! Loaded from TOML. Every field has a default so a partial (or absent) file
//! still yields a working config.

use anyhow::Context as _;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transcribe: TranscribeConfig,
    #[serde(default)]
    pub sweeper: SweeperConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;
        Ok(config)
    }
}

/// Limits applied to each transcription job.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscribeConfig {
    /// Audio files over this size are rejected without calling the speech
    /// provider.
    #[serde(default = "default_max_audio_bytes")]
    pub max_audio_bytes: u64,
    /// How long the external speech call may run before the job fails with a
    /// timeout notice.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl TranscribeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            max_audio_bytes: default_max_audio_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Retention of delivered-reply records, used when a voice note is revoked
/// after its transcript was already posted.
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Reply records older than this are no longer needed for revocation
    /// handling and get evicted.
    #[serde(default = "default_reply_retention_secs")]
    pub reply_retention_secs: u64,
    /// How often the sweep runs.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl SweeperConfig {
    pub fn reply_retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.reply_retention_secs as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            reply_retention_secs: default_reply_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Speech provider endpoint (OpenAI-compatible chat completions with
/// `input_audio` parts).
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_speech_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_speech_model")]
    pub model: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: default_speech_base_url(),
            api_key: String::new(),
            model: default_speech_model(),
        }
    }
}

/// Matches the platform's own cap on voice note uploads.
fn default_max_audio_bytes() -> u64 {
    16 * 1024 * 1024
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_reply_retention_secs() -> u64 {
    24 * 60 * 60
}

fn default_sweep_interval_secs() -> u64 {
    60 * 60
}

fn default_speech_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_speech_model() -> String {
    "gpt-4o-mini-audio-preview".to_string()
}
