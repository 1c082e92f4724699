//! Typed handle over a running [`FeedActor`].

use std::sync::Arc;

use feed_core::{FeedConfig, FeedEvent, FeedSnapshot, FeedStore, PostingId, ProgressCache, UserId};
use ractor::{Actor, ActorRef};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::feed_actor::{FeedActor, FeedArgs};
use crate::messages::{ActorError, FeedMessage, FlushReason};

/// A running feed session for one user.
pub struct FeedSession {
    actor: ActorRef<FeedMessage>,
    handle: JoinHandle<()>,
    events: broadcast::Sender<FeedEvent>,
}

/// Spawn a feed controller for `user`. Restoring starts immediately.
pub async fn start_feed_session<S, C>(
    user: UserId,
    store: Arc<S>,
    cache: Arc<C>,
    config: FeedConfig,
) -> Result<FeedSession, ActorError>
where
    S: FeedStore,
    C: ProgressCache,
{
    config.validate()?;

    let (event_tx, _) = broadcast::channel(1024);
    let args = FeedArgs {
        user,
        store,
        cache,
        config,
        event_tx: event_tx.clone(),
    };

    let (actor, handle) = Actor::spawn(None, FeedActor::<S, C>::new(), args)
        .await
        .map_err(|e| ActorError::Spawn(e.to_string()))?;

    Ok(FeedSession {
        actor,
        handle,
        events: event_tx,
    })
}

impl FeedSession {
    pub fn actor(&self) -> &ActorRef<FeedMessage> {
        &self.actor
    }

    /// Subscribe to session events.
    ///
    /// Events emitted before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    fn send(&self, message: FeedMessage) -> Result<(), ActorError> {
        self.actor
            .send_message(message)
            .map_err(|e| ActorError::Send(e.to_string()))
    }

    pub fn set_index(&self, index: usize) -> Result<(), ActorError> {
        self.send(FeedMessage::SetIndex { index })
    }

    /// Toggle saved membership; returns the optimistic state.
    pub async fn toggle_save(&self, posting_id: PostingId) -> Result<bool, ActorError> {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.send(FeedMessage::ToggleSave {
            posting_id,
            reply: tx.into(),
        })?;
        rx.await.map_err(|_| ActorError::NoReply)
    }

    pub fn dismiss(&self, posting_id: PostingId) -> Result<(), ActorError> {
        self.send(FeedMessage::Dismiss { posting_id })
    }

    pub fn set_details_expanded(&self, position: usize, expanded: bool) -> Result<(), ActorError> {
        self.send(FeedMessage::SetDetailsExpanded { position, expanded })
    }

    pub fn retry(&self) -> Result<(), ActorError> {
        self.send(FeedMessage::Retry)
    }

    pub fn flush(&self, reason: FlushReason) -> Result<(), ActorError> {
        self.send(FeedMessage::Flush { reason })
    }

    pub async fn snapshot(&self) -> Result<FeedSnapshot, ActorError> {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.send(FeedMessage::GetSnapshot { reply: tx.into() })?;
        rx.await.map_err(|_| ActorError::NoReply)
    }

    /// Flush progress and wait for the actor to stop.
    pub async fn shutdown(self) -> Result<(), ActorError> {
        self.send(FeedMessage::Shutdown)?;
        self.handle
            .await
            .map_err(|e| ActorError::Join(e.to_string()))
    }
}
