//! Feed view controller: owns the current index, the loaded sequence and the
//! per-item UI state, and drives pagination and progress persistence.
//!
//! All remote I/O runs in spawned tasks that report back with a
//! [`FeedMessage`], so the mailbox is never blocked on the network and the
//! controller stays queryable when every persistence path is failing.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use feed_core::{
    DismissedSet, ErrorSource, FeedConfig, FeedError, FeedEvent, FeedLoader, FeedPhase,
    FeedSnapshot, FeedStore, JobPosting, PostingId, ProgressCache, ProgressClock,
    ProgressRecord, RetainedUiState, SavedSet, StoreError, UserId, fetch_page,
};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::messages::FeedMessage;
use crate::progress_sync::{RestoreOutcome, SaveOutcome, restore_progress, save_progress};

/// Arguments for spawning a [`FeedActor`].
pub struct FeedArgs<S, C> {
    pub user: UserId,
    pub store: Arc<S>,
    pub cache: Arc<C>,
    pub config: FeedConfig,
    pub event_tx: broadcast::Sender<FeedEvent>,
}

/// State for the feed actor.
pub struct FeedActorState<S, C> {
    user: UserId,
    store: Arc<S>,
    cache: Arc<C>,
    config: FeedConfig,
    phase: FeedPhase,
    loader: FeedLoader,
    index: usize,
    saved: SavedSet,
    dismissed: DismissedSet,
    ui: RetainedUiState,
    clock: ProgressClock,
    /// Latest toggle sequence per posting; older completions never roll back.
    save_seq: HashMap<PostingId, u64>,
    next_seq: u64,
    /// Postings toggled before the remote saved set arrived.
    toggled_while_restoring: HashSet<PostingId>,
    debounce: Option<JoinHandle<()>>,
    debounce_generation: u64,
    autosave: Option<JoinHandle<()>>,
    last_error: Option<FeedError>,
    event_tx: broadcast::Sender<FeedEvent>,
}

impl<S, C> FeedActorState<S, C>
where
    S: FeedStore,
    C: ProgressCache,
{
    fn new(args: FeedArgs<S, C>) -> Self {
        let FeedArgs {
            user,
            store,
            cache,
            config,
            event_tx,
        } = args;

        Self {
            user,
            store,
            cache,
            loader: FeedLoader::new(config.batch_size),
            ui: RetainedUiState::new(config.retention_window),
            config,
            phase: FeedPhase::Restoring,
            index: 0,
            saved: SavedSet::new(),
            dismissed: DismissedSet::new(),
            clock: ProgressClock::new(),
            save_seq: HashMap::new(),
            next_seq: 0,
            toggled_while_restoring: HashSet::new(),
            debounce: None,
            debounce_generation: 0,
            autosave: None,
            last_error: None,
            event_tx,
        }
    }

    /// Broadcast an event.
    fn broadcast(&self, event: FeedEvent) {
        tracing::debug!("[{}] {}", self.user, event.description());
        let _ = self.event_tx.send(event);
    }

    fn set_phase(&mut self, phase: FeedPhase) {
        if self.phase == phase {
            return;
        }
        tracing::info!("Feed for {}: {} -> {}", self.user, self.phase, phase);
        self.phase = phase;
        self.broadcast(FeedEvent::PhaseChanged {
            phase,
            timestamp: Utc::now(),
        });
    }

    fn record_error(&mut self, source: ErrorSource, err: &StoreError) {
        let message = err.to_string();
        self.last_error = Some(FeedError {
            source,
            message: message.clone(),
        });
        self.broadcast(FeedEvent::Error {
            source,
            message,
            timestamp: Utc::now(),
        });
    }

    fn clear_error(&mut self, source: ErrorSource) {
        if self.last_error.as_ref().is_some_and(|e| e.source == source) {
            self.last_error = None;
        }
    }

    fn snapshot(&self) -> FeedSnapshot {
        let current = self.loader.get(self.index).cloned();
        let current_saved = current
            .as_ref()
            .is_some_and(|item| self.saved.contains(&item.id));

        FeedSnapshot {
            phase: self.phase,
            index: self.index,
            loaded: self.loader.len(),
            current,
            current_saved,
            current_ui: self.ui.get(self.index),
            fetching: self.loader.is_fetching(),
            exhausted: self.loader.is_exhausted(),
            saved: self.saved.iter().copied().collect(),
            dismissed_count: self.dismissed.len(),
            retained_positions: self.ui.positions().collect(),
            last_error: self.last_error.clone(),
        }
    }

    /// Start the next page fetch unless one is in flight or the feed ended.
    fn request_page(&mut self, myself: &ActorRef<FeedMessage>) {
        let Some(request) = self.loader.begin_fetch() else {
            return;
        };

        tracing::debug!("Fetching page for {}: {:?}", self.user, request);
        let store = self.store.clone();
        let myself = myself.clone();
        tokio::spawn(async move {
            let result = fetch_page(&*store, &request).await;
            let _ = myself.send_message(FeedMessage::PageLoaded { result });
        });
    }

    fn maybe_prefetch(&mut self, myself: &ActorRef<FeedMessage>) {
        if self
            .loader
            .should_prefetch(self.index, self.config.prefetch_threshold)
        {
            tracing::debug!(
                "Prefetch at index {} of {} for {}",
                self.index,
                self.loader.len(),
                self.user
            );
            self.request_page(myself);
        }
    }

    /// Restart the debounce timer for the current index.
    fn schedule_debounced_save(&mut self, myself: &ActorRef<FeedMessage>) {
        if let Some(timer) = self.debounce.take() {
            timer.abort();
        }
        self.debounce_generation += 1;

        let generation = self.debounce_generation;
        let delay = self.config.debounce();
        let myself = myself.clone();
        self.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = myself.send_message(FeedMessage::DebouncedSave { generation });
        }));
    }

    /// Save the current position. `remote` also writes the document store.
    fn save_current(&mut self, myself: &ActorRef<FeedMessage>, remote: bool) {
        let Some(item) = self.loader.get(self.index) else {
            return;
        };

        // One timestamp for both writes keeps the two records comparable.
        let record = ProgressRecord::new(
            self.user.clone(),
            item.id,
            self.index,
            Some(item.created_at),
            self.clock.stamp(),
        );

        let store = self.store.clone();
        let cache = self.cache.clone();
        let myself = myself.clone();
        tokio::spawn(async move {
            let outcome = save_progress(&*store, &*cache, record, remote).await;
            let _ = myself.send_message(FeedMessage::ProgressSaved { outcome });
        });
    }

    /// Insert locally and fire the idempotent remote append.
    fn dismiss(&mut self, myself: &ActorRef<FeedMessage>, posting_id: PostingId) {
        if self.dismissed.insert(posting_id) {
            self.broadcast(FeedEvent::Dismissed {
                posting_id,
                timestamp: Utc::now(),
            });
        }

        let store = self.store.clone();
        let user = self.user.clone();
        let myself = myself.clone();
        tokio::spawn(async move {
            let result = store.dismiss(&user, posting_id).await;
            let _ = myself.send_message(FeedMessage::DismissResolved { posting_id, result });
        });
    }

    fn set_just_saved(&mut self, posting_id: PostingId, saved: bool) {
        if let Some(position) = self.loader.position_of(&posting_id) {
            self.ui.update(position, |ui| ui.just_saved = saved);
        }
    }

    /// Optimistically flip membership and spawn the remote write.
    fn toggle_save(&mut self, myself: &ActorRef<FeedMessage>, posting_id: PostingId) -> bool {
        let previous = self.saved.contains(&posting_id);
        let saved = self.saved.toggle(posting_id);

        self.next_seq += 1;
        let seq = self.next_seq;
        self.save_seq.insert(posting_id, seq);
        if self.phase == FeedPhase::Restoring {
            self.toggled_while_restoring.insert(posting_id);
        }
        self.set_just_saved(posting_id, saved);

        self.broadcast(FeedEvent::SaveToggled {
            posting_id,
            saved,
            timestamp: Utc::now(),
        });

        let store = self.store.clone();
        let user = self.user.clone();
        let myself = myself.clone();
        tokio::spawn(async move {
            let result = async {
                let mut remote = store.saved_set(&user).await?;
                remote.set(posting_id, saved);
                store.write_saved_set(&user, &remote).await
            }
            .await;
            let _ = myself.send_message(FeedMessage::SaveResolved {
                posting_id,
                seq,
                previous,
                result,
            });
        });

        saved
    }

    fn handle_index(&mut self, myself: &ActorRef<FeedMessage>, index: usize) {
        if self.phase != FeedPhase::Ready {
            tracing::debug!("Ignoring index {} while {}", index, self.phase);
            return;
        }
        if index >= self.loader.len() {
            tracing::warn!(
                "Ignoring index {} beyond {} loaded items",
                index,
                self.loader.len()
            );
            return;
        }
        if index == self.index {
            return;
        }

        let from = self.index;
        self.index = index;
        self.broadcast(FeedEvent::IndexChanged {
            from,
            to: index,
            timestamp: Utc::now(),
        });

        // Only a single forward step dismisses the item left behind.
        if index == from + 1
            && let Some(previous) = self.loader.get(from).map(|item| item.id)
        {
            self.dismiss(myself, previous);
        }

        self.maybe_prefetch(myself);

        let dropped = self.ui.cleanup(index);
        if dropped > 0 {
            tracing::debug!("Discarded UI state for {} positions", dropped);
        }

        self.schedule_debounced_save(myself);
    }

    fn handle_restored(
        &mut self,
        myself: &ActorRef<FeedMessage>,
        outcome: RestoreOutcome,
        saved: Result<SavedSet, StoreError>,
        dismissed: Result<DismissedSet, StoreError>,
    ) {
        if let Some(err) = &outcome.error {
            self.record_error(ErrorSource::Restore, err);
        }

        // The remote sets were read concurrently with any intents handled
        // while restoring; local membership stays authoritative for those.
        match saved {
            Ok(mut set) => {
                for id in self.toggled_while_restoring.drain() {
                    set.set(id, self.saved.contains(&id));
                }
                self.saved = set;
            }
            Err(err) => {
                tracing::warn!("Could not load saved set for {}: {}", self.user, err);
                self.record_error(ErrorSource::Save, &err);
            }
        }
        self.toggled_while_restoring.clear();
        match dismissed {
            Ok(mut set) => {
                for id in self.dismissed.iter() {
                    set.insert(*id);
                }
                self.dismissed = set;
            }
            Err(err) => {
                tracing::warn!("Could not load dismissed set for {}: {}", self.user, err);
                self.record_error(ErrorSource::Dismiss, &err);
            }
        }

        let resume = outcome.reconciliation.resume;
        self.broadcast(FeedEvent::Restored {
            item_id: resume.as_ref().map(|r| r.item_id),
            index: resume.as_ref().map(|r| r.index),
            synced_local: outcome.reconciliation.sync_local,
            timestamp: Utc::now(),
        });

        self.loader =
            FeedLoader::new(self.config.batch_size).with_resume(resume.map(|r| r.item_id));
        self.set_phase(FeedPhase::LoadingFirstPage);
        self.request_page(myself);
    }

    fn handle_page(
        &mut self,
        myself: &ActorRef<FeedMessage>,
        result: Result<Vec<JobPosting>, StoreError>,
    ) {
        match result {
            Ok(page) => {
                let appended = self.loader.apply_page(page);
                self.clear_error(ErrorSource::Pagination);
                self.broadcast(FeedEvent::PageLoaded {
                    appended,
                    total: self.loader.len(),
                    exhausted: self.loader.is_exhausted(),
                    timestamp: Utc::now(),
                });

                if self.phase == FeedPhase::LoadingFirstPage {
                    self.index = 0;
                    self.set_phase(FeedPhase::Ready);
                }
                self.maybe_prefetch(myself);
            }
            Err(err) => {
                self.loader.fail_fetch();
                tracing::warn!("Page fetch for {} failed: {}", self.user, err);
                self.record_error(ErrorSource::Pagination, &err);
            }
        }
    }

    fn handle_progress_saved(&mut self, outcome: SaveOutcome) {
        if let Err(err) = &outcome.local {
            self.record_error(ErrorSource::Progress, err);
        }
        if let Some(Err(err)) = &outcome.remote {
            self.record_error(ErrorSource::Progress, err);
        }
        if outcome.local.is_ok() {
            self.broadcast(FeedEvent::ProgressSaved {
                index: outcome.record.index,
                remote: outcome.wrote_remote(),
                timestamp: Utc::now(),
            });
        }
    }

    fn handle_save_resolved(
        &mut self,
        posting_id: PostingId,
        seq: u64,
        previous: bool,
        result: Result<(), StoreError>,
    ) {
        let latest = self.save_seq.get(&posting_id) == Some(&seq);
        if latest {
            self.save_seq.remove(&posting_id);
        }

        let Err(err) = result else {
            return;
        };

        tracing::warn!("Saving {} for {} failed: {}", posting_id, self.user, err);
        self.record_error(ErrorSource::Save, &err);

        // A newer toggle owns the optimistic state now.
        if !latest {
            return;
        }

        self.saved.set(posting_id, previous);
        if !previous {
            self.set_just_saved(posting_id, false);
        }
        self.broadcast(FeedEvent::SaveReverted {
            posting_id,
            saved: previous,
            timestamp: Utc::now(),
        });
    }

    /// Re-request a page only when the feed is waiting on one that failed.
    fn retry(&mut self, myself: &ActorRef<FeedMessage>) {
        let failed_fetch = self
            .last_error
            .as_ref()
            .is_some_and(|e| e.source == ErrorSource::Pagination);

        match self.phase {
            FeedPhase::LoadingFirstPage => self.request_page(myself),
            FeedPhase::Ready if failed_fetch => self.request_page(myself),
            _ => tracing::debug!("Nothing to retry for {} while {}", self.user, self.phase),
        }
    }

    fn stop_timers(&mut self) {
        if let Some(timer) = self.debounce.take() {
            timer.abort();
        }
        if let Some(timer) = self.autosave.take() {
            timer.abort();
        }
    }
}

/// Feed view controller actor for one user session.
pub struct FeedActor<S, C> {
    _stores: PhantomData<fn() -> (S, C)>,
}

impl<S, C> FeedActor<S, C> {
    pub fn new() -> Self {
        Self {
            _stores: PhantomData,
        }
    }
}

impl<S, C> Default for FeedActor<S, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C> Actor for FeedActor<S, C>
where
    S: FeedStore,
    C: ProgressCache,
{
    type Msg = FeedMessage;
    type State = FeedActorState<S, C>;
    type Arguments = FeedArgs<S, C>;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting feed session for {}", args.user);
        Ok(FeedActorState::new(args))
    }

    async fn post_start(
        &self,
        myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let store = state.store.clone();
        let cache = state.cache.clone();
        let user = state.user.clone();
        let restorer = myself.clone();
        tokio::spawn(async move {
            let (outcome, saved, dismissed) = tokio::join!(
                restore_progress(&*store, &*cache, &user),
                store.saved_set(&user),
                store.dismissed_set(&user),
            );
            let _ = restorer.send_message(FeedMessage::Restored {
                outcome,
                saved,
                dismissed,
            });
        });

        // Periodic autosave, independent of the debounce timer.
        let period = state.config.autosave_interval();
        let ticker = myself.clone();
        state.autosave = Some(tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                if ticker.send_message(FeedMessage::Autosave).is_err() {
                    break;
                }
            }
        }));

        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            FeedMessage::SetIndex { index } => state.handle_index(&myself, index),

            FeedMessage::ToggleSave { posting_id, reply } => {
                let saved = state.toggle_save(&myself, posting_id);
                let _ = reply.send(saved);
            }

            FeedMessage::Dismiss { posting_id } => state.dismiss(&myself, posting_id),

            FeedMessage::SetDetailsExpanded { position, expanded } => {
                if position < state.loader.len()
                    && !state.ui.update(position, |ui| ui.details_expanded = expanded)
                {
                    tracing::debug!("Ignoring UI state for position {} behind window", position);
                }
            }

            FeedMessage::Retry => state.retry(&myself),

            FeedMessage::GetSnapshot { reply } => {
                let _ = reply.send(state.snapshot());
            }

            FeedMessage::Flush { reason } => {
                tracing::debug!("Flushing progress for {} ({})", state.user, reason.as_str());
                state.save_current(&myself, true);
            }

            FeedMessage::Shutdown => {
                tracing::info!("Shutting down feed session for {}", state.user);
                state.save_current(&myself, true);
                state.stop_timers();
                myself.stop(None);
                return Ok(());
            }

            FeedMessage::Restored {
                outcome,
                saved,
                dismissed,
            } => state.handle_restored(&myself, outcome, saved, dismissed),

            FeedMessage::PageLoaded { result } => state.handle_page(&myself, result),

            FeedMessage::DebouncedSave { generation } => {
                if generation != state.debounce_generation {
                    return Ok(());
                }
                state.debounce = None;
                let remote = state.config.is_remote_checkpoint(state.index);
                state.save_current(&myself, remote);
            }

            FeedMessage::Autosave => match state.phase {
                FeedPhase::Ready => state.save_current(&myself, true),
                // A failed first page retries on the next tick.
                FeedPhase::LoadingFirstPage => state.request_page(&myself),
                FeedPhase::Restoring => {}
            },

            FeedMessage::ProgressSaved { outcome } => state.handle_progress_saved(outcome),

            FeedMessage::SaveResolved {
                posting_id,
                seq,
                previous,
                result,
            } => state.handle_save_resolved(posting_id, seq, previous, result),

            FeedMessage::DismissResolved { posting_id, result } => {
                if let Err(err) = result {
                    tracing::warn!("Dismissing {} for {} failed: {}", posting_id, state.user, err);
                    state.record_error(ErrorSource::Dismiss, &err);
                }
            }
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.stop_timers();
        tracing::info!("Feed session for {} stopped", state.user);
        Ok(())
    }
}
