//! Event types for real-time updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ErrorSource, FeedPhase, PostingId};

/// Events emitted by a feed session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedEvent {
    /// The session moved to a new phase.
    PhaseChanged {
        phase: FeedPhase,
        timestamp: DateTime<Utc>,
    },
    /// The resume point was resolved.
    Restored {
        item_id: Option<PostingId>,
        index: Option<usize>,
        synced_local: bool,
        timestamp: DateTime<Utc>,
    },
    /// A page was appended to the feed.
    PageLoaded {
        appended: usize,
        total: usize,
        exhausted: bool,
        timestamp: DateTime<Utc>,
    },
    /// The visible index changed.
    IndexChanged {
        from: usize,
        to: usize,
        timestamp: DateTime<Utc>,
    },
    /// An item was added to the dismissed set.
    Dismissed {
        posting_id: PostingId,
        timestamp: DateTime<Utc>,
    },
    /// Optimistic save state changed.
    SaveToggled {
        posting_id: PostingId,
        saved: bool,
        timestamp: DateTime<Utc>,
    },
    /// A failed save write rolled the optimistic state back.
    SaveReverted {
        posting_id: PostingId,
        saved: bool,
        timestamp: DateTime<Utc>,
    },
    /// Progress was written.
    ProgressSaved {
        index: usize,
        remote: bool,
        timestamp: DateTime<Utc>,
    },
    /// Non-fatal error on the side channel.
    Error {
        source: ErrorSource,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl FeedEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            FeedEvent::PhaseChanged { timestamp, .. } => *timestamp,
            FeedEvent::Restored { timestamp, .. } => *timestamp,
            FeedEvent::PageLoaded { timestamp, .. } => *timestamp,
            FeedEvent::IndexChanged { timestamp, .. } => *timestamp,
            FeedEvent::Dismissed { timestamp, .. } => *timestamp,
            FeedEvent::SaveToggled { timestamp, .. } => *timestamp,
            FeedEvent::SaveReverted { timestamp, .. } => *timestamp,
            FeedEvent::ProgressSaved { timestamp, .. } => *timestamp,
            FeedEvent::Error { timestamp, .. } => *timestamp,
        }
    }

    /// Get the posting ID associated with this event, if any.
    pub fn posting_id(&self) -> Option<PostingId> {
        match self {
            FeedEvent::Restored { item_id, .. } => *item_id,
            FeedEvent::Dismissed { posting_id, .. } => Some(*posting_id),
            FeedEvent::SaveToggled { posting_id, .. } => Some(*posting_id),
            FeedEvent::SaveReverted { posting_id, .. } => Some(*posting_id),
            _ => None,
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            FeedEvent::PhaseChanged { phase, .. } => format!("Feed -> {}", phase),
            FeedEvent::Restored {
                item_id: Some(id),
                index,
                synced_local,
                ..
            } => {
                let sync = if *synced_local { " (local synced)" } else { "" };
                format!(
                    "Restored at {} (index {}){}",
                    id,
                    index.unwrap_or_default(),
                    sync
                )
            }
            FeedEvent::Restored { item_id: None, .. } => "No resume point".to_string(),
            FeedEvent::PageLoaded {
                appended,
                total,
                exhausted,
                ..
            } => {
                let end = if *exhausted { " (end of feed)" } else { "" };
                format!("Loaded {} items, {} total{}", appended, total, end)
            }
            FeedEvent::IndexChanged { from, to, .. } => format!("Index {} -> {}", from, to),
            FeedEvent::Dismissed { posting_id, .. } => format!("Posting {} dismissed", posting_id),
            FeedEvent::SaveToggled {
                posting_id, saved, ..
            } => {
                let verb = if *saved { "saved" } else { "unsaved" };
                format!("Posting {} {}", posting_id, verb)
            }
            FeedEvent::SaveReverted {
                posting_id, saved, ..
            } => format!("Posting {} save reverted to {}", posting_id, saved),
            FeedEvent::ProgressSaved { index, remote, .. } => {
                let target = if *remote { "local+remote" } else { "local" };
                format!("Progress {} saved ({})", index, target)
            }
            FeedEvent::Error {
                source, message, ..
            } => format!("{:?} error: {}", source, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let event = FeedEvent::IndexChanged {
            from: 3,
            to: 4,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "index_changed");
        assert_eq!(event.description(), "Index 3 -> 4");
        assert_eq!(event.posting_id(), None);
    }
}
