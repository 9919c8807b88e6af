//! Voice-note transcription pipeline.
//!
//! Inbound audio gets downloaded by the platform adapter and handed to the
//! [`JobTracker`], which serializes jobs per conversation, runs the
//! [`TranscriptionClient`] on each, and posts the transcript as a reply
//! quoting the original voice note. Revocation of the voice note cancels the
//! in-flight job or deletes the already-posted transcript; a background sweep
//! evicts stale reply records.

pub mod client;
pub mod revoke;
pub mod sweeper;
pub mod tracker;

#[cfg(test)]
mod testutil;

pub use client::{HttpSpeechEngine, SpeechEngine, Transcriber, TranscriptionClient};
pub use revoke::canonical_job_id;
pub use sweeper::spawn_sweeper;
pub use tracker::{JobTracker, TrackerStatus};
