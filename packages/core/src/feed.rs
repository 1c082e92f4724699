//! Controller-facing state shapes shared with the UI layer.

use serde::{Deserialize, Serialize};

use crate::{ItemUiState, JobPosting, PostingId};

/// Lifecycle phase of a feed session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedPhase {
    /// Resolving the resume point from local and remote progress.
    #[default]
    Restoring,
    /// Waiting for the first page.
    LoadingFirstPage,
    /// Items are on screen and index changes are accepted.
    Ready,
}

impl FeedPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedPhase::Restoring => "restoring",
            FeedPhase::LoadingFirstPage => "loading_first_page",
            FeedPhase::Ready => "ready",
        }
    }
}

impl std::fmt::Display for FeedPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which subsystem produced an error on the side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSource {
    Restore,
    Pagination,
    Progress,
    Save,
    Dismiss,
}

/// Latest error shown by the UI's error view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedError {
    pub source: ErrorSource,
    pub message: String,
}

/// Point-in-time view of a feed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub phase: FeedPhase,
    pub index: usize,
    pub loaded: usize,
    /// The item at `index`, if loaded.
    pub current: Option<JobPosting>,
    /// Whether the current item is in the saved set.
    pub current_saved: bool,
    pub current_ui: ItemUiState,
    pub fetching: bool,
    pub exhausted: bool,
    pub saved: Vec<PostingId>,
    pub dismissed_count: usize,
    /// Positions that still hold per-item UI state.
    pub retained_positions: Vec<usize>,
    pub last_error: Option<FeedError>,
}
