//! Voice-note transcription core for a chat bot.
//!
//! The bot itself (platform session, plugin registry, command routing) lives
//! elsewhere and talks to this crate through the traits in [`messaging`].
//! What lives here is the part with real concurrency hazards: the
//! [`transcribe::JobTracker`] that serializes transcription jobs per
//! conversation while letting conversations overlap, deduplicates repeated
//! submissions, supports cooperative cancellation when a voice note is
//! deleted, and garbage-collects its reply bookkeeping after a retention
//! window — plus the [`transcribe::TranscriptionClient`] that bounds the slow
//! external speech call with a size precheck, a timeout race, and
//! unconditional cleanup of the downloaded audio file.

pub mod config;
pub mod error;
pub mod messaging;
pub mod transcribe;

pub use config::Config;
pub use error::{Result, TranscribeError};
pub use messaging::{DeliveredReply, SourceMessage};
pub use transcribe::{JobTracker, TrackerStatus, TranscriptionClient};

use serde::{Deserialize, Serialize};

/// Stable identifier of a source message on the platform.
///
/// Unique per message; the dedup and cancellation key for transcription jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of the chat or thread a message belongs to.
///
/// Jobs sharing a ConversationId run strictly in submission order; jobs in
/// different conversations run independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Notification that a source message was deleted/retracted after sending.
///
/// Some platforms issue the revocation notice under a fresh message id and
/// reference the retracted message separately, so the id the signal arrives
/// under is not necessarily the id the job was submitted under. See
/// [`transcribe::canonical_job_id`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeSignal {
    /// The id the revocation notice itself carries.
    pub revoked_id: JobId,
    /// The id of the original message, when the platform provides it.
    pub original_id: Option<JobId>,
}
