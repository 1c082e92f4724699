//! Real-time event streaming via Server-Sent Events.

use actors::FeedSession;
use feed_core::{FeedEvent, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A feed event tagged with the session's user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFeedEvent {
    pub user_id: UserId,
    #[serde(flatten)]
    pub event: FeedEvent,
}

/// Global event broadcaster.
static EVENT_TX: std::sync::LazyLock<broadcast::Sender<UserFeedEvent>> =
    std::sync::LazyLock::new(|| {
        let (tx, _) = broadcast::channel(1024);
        tx
    });

/// Get the global event broadcaster.
pub fn event_broadcaster() -> broadcast::Sender<UserFeedEvent> {
    EVENT_TX.clone()
}

/// Subscribe to the global event stream.
pub fn subscribe_events() -> broadcast::Receiver<UserFeedEvent> {
    EVENT_TX.subscribe()
}

/// Forward a session's events to the global stream until the session ends.
pub fn forward_session_events(user_id: UserId, session: &FeedSession) {
    let mut rx = session.subscribe();
    let tx = event_broadcaster();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let _ = tx.send(UserFeedEvent {
                        user_id: user_id.clone(),
                        event,
                    });
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event stream for {} lagged by {}", user_id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Helper to format an event for SSE.
pub fn format_sse_event(event: &UserFeedEvent) -> String {
    let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    format!("event: {}\ndata: {}\n\n", event_name(&event.event), json)
}

fn event_name(event: &FeedEvent) -> &'static str {
    match event {
        FeedEvent::PhaseChanged { .. } => "phase_changed",
        FeedEvent::Restored { .. } => "restored",
        FeedEvent::PageLoaded { .. } => "page_loaded",
        FeedEvent::IndexChanged { .. } => "index_changed",
        FeedEvent::Dismissed { .. } => "dismissed",
        FeedEvent::SaveToggled { .. } => "save_toggled",
        FeedEvent::SaveReverted { .. } => "save_reverted",
        FeedEvent::ProgressSaved { .. } => "progress_saved",
        FeedEvent::Error { .. } => "error",
    }
}
