//! Recurring eviction of stale reply records.
//!
//! A delivered transcript only needs to stay findable for as long as a revoke
//! of its voice note is plausible. Past the retention window the record is
//! dropped; the transcript itself stays in the chat.

use super::tracker::JobTracker;
use crate::messaging::SourceMessage;
use crate::transcribe::client::Transcriber;

use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawn the background sweep. Every `interval`, reply records older than
/// `max_age` are evicted. Abort the returned handle on shutdown.
pub fn spawn_sweeper<M, T>(
    tracker: JobTracker<M, T>,
    interval: Duration,
    max_age: chrono::Duration,
) -> JoinHandle<()>
where
    M: SourceMessage,
    T: Transcriber,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of an interval fires immediately; skip it so the
        // first sweep happens one full interval after startup.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = tracker.sweep_replies(max_age).await;
            if removed > 0 {
                tracing::info!(removed, "swept stale transcript records");
            } else {
                tracing::debug!("sweep found no stale transcript records");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::testutil::{EffectLog, FakeMessage, FakeTranscriber, wait_idle};

    use std::path::PathBuf;

    fn artifact(name: &str) -> PathBuf {
        PathBuf::from(format!("/tmp/voxbot-test/{name}"))
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_only_entries_past_the_window() {
        let log = EffectLog::default();
        let transcriber = FakeTranscriber::default();
        transcriber.script_ok(artifact("old.ogg"), std::time::Duration::ZERO, "old");
        transcriber.script_ok(artifact("new.ogg"), std::time::Duration::ZERO, "new");

        let tracker = JobTracker::new(transcriber);
        let old = FakeMessage::new("msg-old", "chat-1", log.clone());
        let new = FakeMessage::new("msg-new", "chat-2", log);

        tracker.submit(old, artifact("old.ogg")).await;
        tracker.submit(new, artifact("new.ogg")).await;
        wait_idle(&tracker).await;
        assert_eq!(tracker.status().await.correlated, 2);

        tracker
            .backdate_reply(
                &"msg-old".into(),
                chrono::Utc::now() - chrono::Duration::hours(25),
            )
            .await;

        let removed = tracker.sweep_replies(chrono::Duration::hours(24)).await;
        assert_eq!(removed, 1);
        assert_eq!(
            tracker.status().await.correlated,
            1,
            "the fresh record must survive"
        );

        // Pending/completed are not time-bounded.
        assert!(tracker.is_completed(&"msg-old".into()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn background_sweep_fires_on_the_interval() {
        let log = EffectLog::default();
        let transcriber = FakeTranscriber::default();
        transcriber.script_ok(artifact("a.ogg"), std::time::Duration::ZERO, "text");

        let tracker = JobTracker::new(transcriber);
        let message = FakeMessage::new("msg-a", "chat-1", log);

        tracker.submit(message, artifact("a.ogg")).await;
        wait_idle(&tracker).await;
        tracker
            .backdate_reply(
                &"msg-a".into(),
                chrono::Utc::now() - chrono::Duration::hours(48),
            )
            .await;

        let handle = spawn_sweeper(
            tracker.clone(),
            Duration::from_secs(3600),
            chrono::Duration::hours(24),
        );

        // Just before the first real tick nothing has been evicted.
        tokio::time::sleep(Duration::from_secs(3599)).await;
        assert_eq!(tracker.status().await.correlated, 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(tracker.status().await.correlated, 0);

        handle.abort();
    }
}
