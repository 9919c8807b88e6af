//! Error types for the transcription core.

use std::time::Duration;

/// Crate-wide result alias. Most fallible paths carry [`anyhow::Error`] with
/// context; the transcription pipeline uses the typed [`TranscribeError`].
pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;

/// Terminal failure of a single transcription job.
///
/// None of these are retried and none are fatal to the process — each is
/// surfaced to the user once (with wording differentiated by variant) and the
/// job still completes from the tracker's perspective.
#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    /// The audio file exceeds the configured size limit. The external call is
    /// never attempted.
    #[error("audio file is {size} bytes, over the {max} byte limit")]
    ArtifactTooLarge { size: u64, max: u64 },

    /// The external speech call did not settle within the configured timeout.
    #[error("transcription timed out after {0:?}")]
    Timeout(Duration),

    /// The external speech call itself failed.
    #[error("transcription failed: {0}")]
    External(String),

    /// A reply send or delete against the platform failed. Logged only; never
    /// blocks the job from completing or the correlation entry from being
    /// dropped.
    #[error("delivery failed: {0}")]
    Delivery(#[source] anyhow::Error),
}

impl TranscribeError {
    /// True for the timeout variant, which gets its own user-facing notice.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
