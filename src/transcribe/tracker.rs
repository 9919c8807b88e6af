//! Job tracker: per-conversation serialization of transcription work.
//!
//! One tracker instance owns all bookkeeping: which jobs are in flight, which
//! are done, which are flagged for cancellation, and which delivered replies
//! we still remember. Jobs in the same conversation run strictly in
//! submission order through a lazily spawned drainer task; conversations run
//! independently of each other. Completion order across conversations is
//! therefore unordered, which is why every transcript is delivered as a reply
//! quoting its own voice note rather than as a loose chat message.

use crate::error::TranscribeError;
use crate::messaging::SourceMessage;
use crate::transcribe::client::Transcriber;
use crate::{ConversationId, JobId};

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::Instrument as _;

/// Notice sent when the speech call exceeded its deadline.
pub(super) const TIMEOUT_NOTICE: &str =
    "Transcribing that voice note took too long and was abandoned. Shorter notes work better.";

/// Notice sent when the voice note failed the size precheck.
pub(super) const TOO_LARGE_NOTICE: &str = "That voice note is too large for me to transcribe.";

/// Notice sent for any other transcription failure.
pub(super) const FAILURE_NOTICE: &str =
    "I couldn't transcribe that voice note, sorry. Please try again in a bit.";

/// Tracks every transcription job from submission to completion.
///
/// Cheap to clone; all clones share the same state.
pub struct JobTracker<M: SourceMessage, T> {
    pub(super) inner: Arc<Inner<M, T>>,
}

impl<M: SourceMessage, T> Clone for JobTracker<M, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub(super) struct Inner<M: SourceMessage, T> {
    pub(super) transcriber: T,
    pub(super) state: Mutex<State<M>>,
}

/// All registries live behind one lock. None of the operations below suspend
/// while holding it; replies, deletions and the speech call itself all happen
/// outside.
pub(super) struct State<M: SourceMessage> {
    /// Jobs enqueued or executing. A job id is never in here and in
    /// `completed` at the same time.
    pub(super) pending: HashSet<JobId>,
    /// Jobs that terminated, successfully or with a failure notice. Dedup
    /// only; kept for process lifetime so a late duplicate media event can
    /// never re-run the work.
    pub(super) completed: HashSet<JobId>,
    /// Pending jobs flagged for suppression. Consumed by the job itself once
    /// the speech call returns.
    pub(super) cancelled: HashSet<JobId>,
    /// Delivered transcripts we can still delete if the voice note is
    /// revoked. Evicted by the sweeper after the retention window.
    pub(super) replies: HashMap<JobId, ReplyRecord<M::Reply>>,
    /// Live queue per conversation. An entry is removed by its own drainer
    /// task, under this lock, when the queue is observed empty.
    pub(super) queues: HashMap<ConversationId, mpsc::UnboundedSender<Job<M>>>,
}

/// A delivered transcript reply and when it went out.
pub(super) struct ReplyRecord<R> {
    pub(super) reply: R,
    pub(super) delivered_at: DateTime<Utc>,
}

/// One unit of transcription work. Lives only on its conversation queue.
pub(super) struct Job<M> {
    id: JobId,
    conversation: ConversationId,
    message: M,
    artifact: PathBuf,
    submitted_at: DateTime<Utc>,
}

/// Snapshot of tracker state for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerStatus {
    pub pending: usize,
    pub completed: usize,
    pub active_conversations: usize,
    pub correlated: usize,
}

impl<M: SourceMessage, T: Transcriber> JobTracker<M, T> {
    pub fn new(transcriber: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                transcriber,
                state: Mutex::new(State {
                    pending: HashSet::new(),
                    completed: HashSet::new(),
                    cancelled: HashSet::new(),
                    replies: HashMap::new(),
                    queues: HashMap::new(),
                }),
            }),
        }
    }

    /// Submit a voice note for transcription.
    ///
    /// No-op if the message was already handled or is already in flight.
    /// Otherwise the job is appended to its conversation's queue, spawning
    /// the drainer task for that conversation if none is running. Exactly one
    /// speech call happens per job id.
    pub async fn submit(&self, message: M, artifact: PathBuf) {
        let id = message.job_id();
        let conversation = message.conversation_id();

        let mut state = self.inner.state.lock().await;

        if state.completed.contains(&id) {
            tracing::debug!(job_id = %id, "voice note already transcribed, ignoring duplicate");
            return;
        }
        if state.pending.contains(&id) {
            tracing::debug!(job_id = %id, "transcription already in flight, ignoring duplicate");
            return;
        }

        state.pending.insert(id.clone());

        let job = Job {
            id: id.clone(),
            conversation: conversation.clone(),
            message,
            artifact,
            submitted_at: Utc::now(),
        };

        let job = match state.queues.get(&conversation) {
            Some(queue) => match queue.send(job) {
                Ok(()) => {
                    tracing::info!(
                        job_id = %id,
                        conversation_id = %conversation,
                        "transcription job queued"
                    );
                    return;
                }
                // The drainer exited without unregistering. Replace it.
                Err(mpsc::error::SendError(job)) => {
                    state.queues.remove(&conversation);
                    job
                }
            },
            None => job,
        };

        let (queue, jobs) = mpsc::unbounded_channel();
        queue.send(job).ok();
        state.queues.insert(conversation.clone(), queue);

        let tracker = self.clone();
        let span = tracing::info_span!("transcribe.drain", conversation_id = %conversation);
        tokio::spawn(
            async move {
                tracker.drain_conversation(conversation, jobs).await;
            }
            .instrument(span),
        );

        tracing::info!(job_id = %id, "transcription job queued, drainer spawned");
    }

    /// Whether a job is enqueued or executing.
    pub async fn is_pending(&self, id: &JobId) -> bool {
        self.inner.state.lock().await.pending.contains(id)
    }

    /// Whether a job has terminated.
    pub async fn is_completed(&self, id: &JobId) -> bool {
        self.inner.state.lock().await.completed.contains(id)
    }

    /// Flag a pending job so its reply is suppressed once the speech call
    /// returns. Returns false for jobs that are not pending. The call itself
    /// is never interrupted; suppression is cooperative so the artifact
    /// cleanup inside the client always runs.
    pub async fn cancel(&self, id: &JobId) -> bool {
        let mut state = self.inner.state.lock().await;
        if state.pending.contains(id) {
            state.cancelled.insert(id.clone());
            tracing::info!(job_id = %id, "transcription job cancelled");
            true
        } else {
            false
        }
    }

    /// Diagnostic snapshot. No side effects.
    pub async fn status(&self) -> TrackerStatus {
        let state = self.inner.state.lock().await;
        TrackerStatus {
            pending: state.pending.len(),
            completed: state.completed.len(),
            active_conversations: state.queues.len(),
            correlated: state.replies.len(),
        }
    }

    /// Drop reply records older than `max_age`. Returns how many were
    /// removed. Pending/completed sets are untouched; they are not
    /// time-bounded.
    pub async fn sweep_replies(&self, max_age: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let mut state = self.inner.state.lock().await;
        let before = state.replies.len();
        state.replies.retain(|_, record| record.delivered_at > cutoff);
        before - state.replies.len()
    }

    #[cfg(test)]
    pub(super) async fn backdate_reply(&self, id: &JobId, delivered_at: DateTime<Utc>) {
        let mut state = self.inner.state.lock().await;
        if let Some(record) = state.replies.get_mut(id) {
            record.delivered_at = delivered_at;
        }
    }

    /// Run jobs for one conversation, strictly in order, until the queue is
    /// empty. Retirement re-checks under the registry lock so a concurrent
    /// submit can never enqueue onto a drainer that is about to exit.
    async fn drain_conversation(
        &self,
        conversation: ConversationId,
        mut jobs: mpsc::UnboundedReceiver<Job<M>>,
    ) {
        loop {
            let job = match jobs.try_recv() {
                Ok(job) => job,
                Err(mpsc::error::TryRecvError::Empty) => {
                    let mut state = self.inner.state.lock().await;
                    match jobs.try_recv() {
                        Ok(job) => job,
                        Err(_) => {
                            state.queues.remove(&conversation);
                            break;
                        }
                    }
                }
                Err(mpsc::error::TryRecvError::Disconnected) => break,
            };

            self.run_job(job).await;
        }

        tracing::debug!(conversation_id = %conversation, "transcription drainer retired");
    }

    /// Run one job to completion: speech call, cancellation check, delivery,
    /// registry updates. Never holds the state lock across an await.
    async fn run_job(&self, job: Job<M>) {
        let Job {
            id,
            conversation,
            message,
            artifact,
            submitted_at,
        } = job;

        let result = self.inner.transcriber.transcribe(&artifact).await;

        // Cancellation is observed only after the call returns; consuming the
        // flag here clears the way for the terminal transition below.
        let suppressed = {
            let mut state = self.inner.state.lock().await;
            state.cancelled.remove(&id)
        };

        let mut record = None;
        if suppressed {
            tracing::info!(job_id = %id, "transcript suppressed, source message was revoked");
        } else {
            match result {
                Ok(text) => match message.reply(&text).await {
                    Ok(reply) => {
                        let elapsed_ms = (Utc::now() - submitted_at).num_milliseconds();
                        tracing::info!(
                            job_id = %id,
                            conversation_id = %conversation,
                            elapsed_ms,
                            "transcript delivered"
                        );
                        record = Some(ReplyRecord {
                            reply,
                            delivered_at: Utc::now(),
                        });
                    }
                    Err(error) => {
                        // Accepted silent loss: the job still completes so a
                        // duplicate media event cannot re-run the work.
                        let error = TranscribeError::Delivery(error);
                        tracing::warn!(job_id = %id, %error, "failed to deliver transcript");
                    }
                },
                Err(error) => {
                    tracing::warn!(job_id = %id, %error, "transcription failed");
                    if let Err(delivery_error) = message.reply(failure_notice(&error)).await {
                        tracing::warn!(
                            job_id = %id,
                            error = %delivery_error,
                            "failed to deliver failure notice"
                        );
                    }
                }
            }
        }

        let mut state = self.inner.state.lock().await;
        state.pending.remove(&id);
        state.cancelled.remove(&id);
        state.completed.insert(id.clone());
        if let Some(record) = record {
            state.replies.insert(id, record);
        }
    }
}

/// Pick the user-facing notice for a failed job. Timeouts and oversized
/// notes get their own wording so the user knows a retry is pointless.
fn failure_notice(error: &TranscribeError) -> &'static str {
    match error {
        TranscribeError::Timeout(_) => TIMEOUT_NOTICE,
        TranscribeError::ArtifactTooLarge { .. } => TOO_LARGE_NOTICE,
        _ => FAILURE_NOTICE,
    }
}
