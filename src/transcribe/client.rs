//! Transcription client: bounds the slow external speech call.
//!
//! The client wraps a [`SpeechEngine`] with the three guarantees every job
//! relies on: oversized audio is rejected before any network traffic, the
//! call is raced against a timeout, and the downloaded audio file is deleted
//! on every exit path — success, failure, timeout, or the size precheck
//! rejecting the file outright.

use crate::config::SpeechConfig;
use crate::error::TranscribeError;

use std::future::Future;
use std::path::Path;
use std::time::Duration;

/// Anything the tracker can run a job through. The production impl is
/// [`TranscriptionClient`]; tests substitute scripted fakes.
pub trait Transcriber: Send + Sync + 'static {
    fn transcribe(
        &self,
        artifact: &Path,
    ) -> impl Future<Output = Result<String, TranscribeError>> + Send;
}

/// The raw speech call, without limits or cleanup.
pub trait SpeechEngine: Send + Sync + 'static {
    fn transcribe_file(&self, path: &Path) -> impl Future<Output = anyhow::Result<String>> + Send;
}

/// Size/timeout/cleanup wrapper around a speech engine.
pub struct TranscriptionClient<E> {
    engine: E,
    max_bytes: u64,
    timeout: Duration,
}

impl<E: SpeechEngine> TranscriptionClient<E> {
    pub fn new(engine: E, max_bytes: u64, timeout: Duration) -> Self {
        Self {
            engine,
            max_bytes,
            timeout,
        }
    }

    /// Transcribe the audio file at `artifact`.
    ///
    /// The file is consumed: it is deleted exactly once before this returns,
    /// whichever branch was taken.
    pub async fn invoke(&self, artifact: &Path) -> Result<String, TranscribeError> {
        let result = self.transcribe_bounded(artifact).await;

        match tokio::fs::remove_file(artifact).await {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                tracing::warn!(%error, path = %artifact.display(), "failed to remove audio file");
            }
        }

        result
    }

    async fn transcribe_bounded(&self, artifact: &Path) -> Result<String, TranscribeError> {
        let metadata = tokio::fs::metadata(artifact)
            .await
            .map_err(|error| TranscribeError::External(format!("failed to stat audio file: {error}")))?;

        let size = metadata.len();
        if size > self.max_bytes {
            return Err(TranscribeError::ArtifactTooLarge {
                size,
                max: self.max_bytes,
            });
        }

        match tokio::time::timeout(self.timeout, self.engine.transcribe_file(artifact)).await {
            Ok(Ok(text)) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    Err(TranscribeError::External(
                        "speech provider returned an empty transcript".into(),
                    ))
                } else {
                    Ok(text)
                }
            }
            Ok(Err(error)) => Err(TranscribeError::External(error.to_string())),
            Err(_) => Err(TranscribeError::Timeout(self.timeout)),
        }
    }
}

impl<E: SpeechEngine> Transcriber for TranscriptionClient<E> {
    fn transcribe(
        &self,
        artifact: &Path,
    ) -> impl Future<Output = Result<String, TranscribeError>> + Send {
        self.invoke(artifact)
    }
}

/// Speech engine backed by an OpenAI-compatible chat completions endpoint
/// that accepts `input_audio` content parts.
pub struct HttpSpeechEngine {
    http: reqwest::Client,
    config: SpeechConfig,
}

impl HttpSpeechEngine {
    pub fn new(http: reqwest::Client, config: SpeechConfig) -> Self {
        Self { http, config }
    }
}

impl SpeechEngine for HttpSpeechEngine {
    async fn transcribe_file(&self, path: &Path) -> anyhow::Result<String> {
        use anyhow::Context as _;

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read audio file: {}", path.display()))?;

        use base64::Engine as _;
        let base64_audio = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let format = audio_format_for_path(path);

        let endpoint = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "text",
                        "text": "Transcribe this audio verbatim. Return only the transcription text."
                    },
                    {
                        "type": "input_audio",
                        "input_audio": {
                            "data": base64_audio,
                            "format": format,
                        }
                    }
                ]
            }],
            "temperature": 0
        });

        let response = self
            .http
            .post(&endpoint)
            .header("authorization", format!("Bearer {}", self.config.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .context("speech request failed")?;

        let status = response.status();
        let response_body: serde_json::Value = response
            .json()
            .await
            .context("invalid speech provider response")?;

        if !status.is_success() {
            let message = response_body["error"]["message"]
                .as_str()
                .unwrap_or("unknown error");
            anyhow::bail!("speech provider returned {status}: {message}");
        }

        Ok(extract_transcript_text(&response_body))
    }
}

/// Map a file extension to the `input_audio.format` hint the provider expects.
fn audio_format_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_lowercase()
        .as_str()
    {
        "mp3" | "mpeg" => "mp3",
        "wav" => "wav",
        "flac" => "flac",
        "aac" => "aac",
        "m4a" | "mp4" => "m4a",
        // Voice notes on the platform arrive as opus-in-ogg.
        _ => "ogg",
    }
}

/// Pull the transcript text out of a chat completions response. The content
/// is either a plain string or an array of typed parts.
fn extract_transcript_text(body: &serde_json::Value) -> String {
    if let Some(text) = body["choices"][0]["message"]["content"].as_str() {
        return text.trim().to_string();
    }

    let Some(parts) = body["choices"][0]["message"]["content"].as_array() else {
        return String::new();
    };

    parts
        .iter()
        .filter_map(|part| {
            if part["type"].as_str() == Some("text") {
                part["text"].as_str().map(str::trim)
            } else {
                None
            }
        })
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
