//! Platform-facing message traits.
//!
//! The platform session (connection, media download, event routing) lives
//! outside this crate and hands us message handles implementing these traits.

pub mod traits;

pub use traits::{DeliveredReply, SourceMessage};
