//! Traits the platform adapter implements for the transcription core.

use crate::{ConversationId, JobId};

use std::future::Future;

/// Handle to the inbound message a transcription job was created from.
///
/// Replies go through this handle so the transcript is quoted against the
/// *original* voice note rather than posted loose into the chat — the
/// correlation survives out-of-order completion across conversations and
/// manual re-submissions within one.
///
/// Implementations must be cheap to clone; the tracker moves a clone into the
/// conversation's drainer task.
pub trait SourceMessage: Clone + Send + Sync + 'static {
    /// Handle to a reply this message produced, kept so the reply can be
    /// deleted later if the source is revoked.
    type Reply: DeliveredReply;

    /// Stable platform identity of this message.
    fn job_id(&self) -> JobId;

    /// Identity of the chat/thread this message belongs to.
    fn conversation_id(&self) -> ConversationId;

    /// Send `text` as a reply quoting this message.
    fn reply(&self, text: &str) -> impl Future<Output = anyhow::Result<Self::Reply>> + Send;
}

/// A reply the bot already delivered.
pub trait DeliveredReply: Send + Sync + 'static {
    /// Delete the reply, for everyone when the platform supports it.
    fn delete(&self, for_everyone: bool) -> impl Future<Output = anyhow::Result<()>> + Send;
}
