//! Message types for actor communication.

use feed_core::{DismissedSet, FeedSnapshot, JobPosting, PostingId, SavedSet, StoreError};
use ractor::RpcReplyPort;

use crate::progress_sync::{RestoreOutcome, SaveOutcome};

/// Why a best-effort flush was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// The page or app went to the background.
    VisibilityLost,
    /// The page is about to unload.
    BeforeUnload,
}

impl FlushReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushReason::VisibilityLost => "visibility_lost",
            FlushReason::BeforeUnload => "before_unload",
        }
    }
}

/// Messages for the FeedActor.
///
/// The first group are intents issued by the presentation layer; the rest
/// are completions reported back by tasks the actor spawned.
#[derive(Debug)]
pub enum FeedMessage {
    /// The visible position changed.
    SetIndex { index: usize },

    /// Flip saved membership of a posting. Replies with the optimistic state.
    ToggleSave {
        posting_id: PostingId,
        reply: RpcReplyPort<bool>,
    },

    /// Add a posting to the dismissed set.
    Dismiss { posting_id: PostingId },

    /// Expand or collapse the details panel at a position.
    SetDetailsExpanded { position: usize, expanded: bool },

    /// Retry a failed page fetch.
    Retry,

    /// Get the current view of the session.
    GetSnapshot { reply: RpcReplyPort<FeedSnapshot> },

    /// One best-effort save of the current position.
    Flush { reason: FlushReason },

    /// Flush and stop the session.
    Shutdown,

    /// Resume point and remote collections resolved.
    Restored {
        outcome: RestoreOutcome,
        saved: Result<SavedSet, StoreError>,
        dismissed: Result<DismissedSet, StoreError>,
    },

    /// A page fetch finished.
    PageLoaded {
        result: Result<Vec<JobPosting>, StoreError>,
    },

    /// The debounce timer with this generation fired.
    DebouncedSave { generation: u64 },

    /// Periodic autosave tick.
    Autosave,

    /// A progress save finished.
    ProgressSaved { outcome: SaveOutcome },

    /// A remote saved-set write finished.
    SaveResolved {
        posting_id: PostingId,
        seq: u64,
        previous: bool,
        result: Result<(), StoreError>,
    },

    /// A remote dismiss write finished.
    DismissResolved {
        posting_id: PostingId,
        result: Result<(), StoreError>,
    },
}

/// Error type for actor operations.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    #[error("Failed to spawn feed session: {0}")]
    Spawn(String),

    #[error("Failed to send message: {0}")]
    Send(String),

    #[error("Feed session stopped before replying")]
    NoReply,

    #[error("Feed session task failed: {0}")]
    Join(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] feed_core::ConfigError),
}
