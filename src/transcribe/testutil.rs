//! Shared fakes for tracker, revoke and sweeper tests.

use crate::error::TranscribeError;
use crate::messaging::{DeliveredReply, SourceMessage};
use crate::transcribe::client::Transcriber;
use crate::transcribe::tracker::JobTracker;
use crate::{ConversationId, JobId};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ordered log of externally visible effects, shared across fakes so tests
/// can assert on delivery order across messages and conversations.
#[derive(Clone, Default)]
pub struct EffectLog(Arc<Mutex<Vec<String>>>);

impl EffectLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Source message fake. Records every reply it delivers.
#[derive(Clone)]
pub struct FakeMessage {
    id: JobId,
    conversation: ConversationId,
    log: EffectLog,
    replies: Arc<Mutex<Vec<String>>>,
    fail_reply: bool,
    fail_delete: bool,
    pub deletes: Arc<AtomicUsize>,
}

impl FakeMessage {
    pub fn new(id: &str, conversation: &str, log: EffectLog) -> Self {
        Self {
            id: id.into(),
            conversation: conversation.into(),
            log,
            replies: Arc::new(Mutex::new(Vec::new())),
            fail_reply: false,
            fail_delete: false,
            deletes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every reply attempt from this message fails.
    pub fn failing_reply(mut self) -> Self {
        self.fail_reply = true;
        self
    }

    /// Replies deliver fine but deleting them fails.
    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn reply_texts(&self) -> Vec<String> {
        self.replies.lock().unwrap().clone()
    }
}

impl SourceMessage for FakeMessage {
    type Reply = FakeReply;

    fn job_id(&self) -> JobId {
        self.id.clone()
    }

    fn conversation_id(&self) -> ConversationId {
        self.conversation.clone()
    }

    async fn reply(&self, text: &str) -> anyhow::Result<FakeReply> {
        if self.fail_reply {
            self.log.push(format!("reply-failed:{}", self.id));
            anyhow::bail!("platform rejected the reply");
        }
        self.log.push(format!("reply:{}:{text}", self.id));
        self.replies.lock().unwrap().push(text.to_string());
        Ok(FakeReply {
            job: self.id.clone(),
            log: self.log.clone(),
            deletes: self.deletes.clone(),
            fail_delete: self.fail_delete,
        })
    }
}

/// Delivered reply fake. Counts delete attempts.
#[derive(Clone)]
pub struct FakeReply {
    job: JobId,
    log: EffectLog,
    deletes: Arc<AtomicUsize>,
    fail_delete: bool,
}

impl DeliveredReply for FakeReply {
    async fn delete(&self, _for_everyone: bool) -> anyhow::Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.log.push(format!("delete:{}", self.job));
        if self.fail_delete {
            anyhow::bail!("platform rejected the delete");
        }
        Ok(())
    }
}

enum Outcome {
    Text(String),
    Timeout,
    TooLarge,
    Fail(String),
}

struct Script {
    delay: Duration,
    outcome: Outcome,
}

/// Transcriber fake scripted per artifact path.
#[derive(Clone, Default)]
pub struct FakeTranscriber {
    pub calls: Arc<AtomicUsize>,
    scripts: Arc<Mutex<HashMap<PathBuf, Script>>>,
}

impl FakeTranscriber {
    pub fn script_ok(&self, artifact: PathBuf, delay: Duration, text: &str) {
        self.scripts.lock().unwrap().insert(
            artifact,
            Script {
                delay,
                outcome: Outcome::Text(text.to_string()),
            },
        );
    }

    pub fn script_timeout(&self, artifact: PathBuf) {
        self.scripts.lock().unwrap().insert(
            artifact,
            Script {
                delay: Duration::ZERO,
                outcome: Outcome::Timeout,
            },
        );
    }

    pub fn script_too_large(&self, artifact: PathBuf) {
        self.scripts.lock().unwrap().insert(
            artifact,
            Script {
                delay: Duration::ZERO,
                outcome: Outcome::TooLarge,
            },
        );
    }

    pub fn script_fail(&self, artifact: PathBuf, message: &str) {
        self.scripts.lock().unwrap().insert(
            artifact,
            Script {
                delay: Duration::ZERO,
                outcome: Outcome::Fail(message.to_string()),
            },
        );
    }
}

impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, artifact: &Path) -> Result<String, TranscribeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .remove(artifact)
            .unwrap_or(Script {
                delay: Duration::ZERO,
                outcome: Outcome::Text("ok".to_string()),
            });

        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }

        match script.outcome {
            Outcome::Text(text) => Ok(text),
            Outcome::Timeout => Err(TranscribeError::Timeout(Duration::from_secs(30))),
            Outcome::TooLarge => Err(TranscribeError::ArtifactTooLarge {
                size: 32 * 1024 * 1024,
                max: 16 * 1024 * 1024,
            }),
            Outcome::Fail(message) => Err(TranscribeError::External(message)),
        }
    }
}

/// Wait until no job is pending. Virtual time advances while we poll, so
/// paused-clock tests drain deterministically.
pub async fn wait_idle<M: SourceMessage, T: Transcriber>(tracker: &JobTracker<M, T>) {
    loop {
        if tracker.status().await.pending == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
