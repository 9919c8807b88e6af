//! Revocation handling.
//!
//! When the platform reports a source message as deleted, the matching job is
//! cancelled if it is still in flight; if its transcript was already posted,
//! the transcript is deleted instead.

use super::tracker::JobTracker;
use crate::messaging::{DeliveredReply as _, SourceMessage};
use crate::transcribe::client::Transcriber;
use crate::{JobId, RevokeSignal};

/// Resolve a revoke signal to the id the job was submitted under.
///
/// Revocation notices may arrive under a fresh message id with the retracted
/// message referenced separately; lookups against the tracker registries must
/// use the original id whenever the platform provides it.
pub fn canonical_job_id(signal: &RevokeSignal) -> &JobId {
    signal.original_id.as_ref().unwrap_or(&signal.revoked_id)
}

impl<M: SourceMessage, T: Transcriber> JobTracker<M, T> {
    /// React to a source message being deleted on the platform.
    ///
    /// Pending job: flag it for suppression and let it finish on its own.
    /// Delivered transcript on record: delete it, and drop the record whether
    /// or not the delete succeeds — stale records must not accumulate and the
    /// delete is never retried. Anything else: no-op.
    pub async fn on_revoke(&self, signal: &RevokeSignal) {
        let id = canonical_job_id(signal);

        if self.cancel(id).await {
            tracing::info!(job_id = %id, "revoked voice note has a transcription in flight, cancelled");
            return;
        }

        let record = {
            let mut state = self.inner.state.lock().await;
            state.replies.remove(id)
        };

        let Some(record) = record else {
            tracing::debug!(job_id = %id, "revoke signal for an untracked message, nothing to do");
            return;
        };

        match record.reply.delete(true).await {
            Ok(()) => {
                tracing::info!(job_id = %id, "deleted transcript of revoked voice note");
            }
            Err(error) => {
                tracing::warn!(job_id = %id, %error, "failed to delete transcript of revoked voice note");
            }
        }
    }
}
