//! Server API functions for the job feed.
//!
//! This crate contains all shared fullstack server functions for:
//! - Postings (publish, get, feed pages, search, map bounds)
//! - Per-user progress and saved/dismissed collections
//! - Real-time feed events (SSE formatting)

mod collections;
mod postings;
mod progress;

#[cfg(feature = "server")]
mod init;

#[cfg(feature = "server")]
mod realtime;

// Re-export all server functions
pub use collections::*;
pub use postings::*;
pub use progress::*;

#[cfg(feature = "server")]
pub use init::*;

#[cfg(feature = "server")]
pub use realtime::*;

// Re-export core types for convenience
pub use feed_core::{
    Cursor, FeedEvent, FeedSnapshot, JobPosting, MapBounds, PageRequest, PostingDraft,
    PostingFilter, PostingId, ProgressRecord, UserId,
};
