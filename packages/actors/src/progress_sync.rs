//! Effectful side of progress reconciliation: reading both stores, resyncing
//! the loser, and writing one save to both locations.

use feed_core::{
    FeedStore, ProgressCache, ProgressRecord, Reconciliation, StoreError, UserId, reconcile,
};

/// Result of restoring a session's resume point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOutcome {
    pub reconciliation: Reconciliation,
    /// The fault that forced a fresh start, if any.
    pub error: Option<StoreError>,
}

/// Read local and remote progress, pick the winner and resync the local
/// cache when the remote record won.
///
/// Never fails: any read or write fault is logged and yields a fresh start.
pub async fn restore_progress<S, C>(store: &S, cache: &C, user: &UserId) -> RestoreOutcome
where
    S: FeedStore,
    C: ProgressCache,
{
    match try_restore(store, cache, user).await {
        Ok(reconciliation) => RestoreOutcome {
            reconciliation,
            error: None,
        },
        Err(e) => {
            tracing::warn!("Progress restore for {} failed: {}; starting fresh", user, e);
            RestoreOutcome {
                reconciliation: Reconciliation::fresh_start(),
                error: Some(e),
            }
        }
    }
}

async fn try_restore<S, C>(store: &S, cache: &C, user: &UserId) -> Result<Reconciliation, StoreError>
where
    S: FeedStore,
    C: ProgressCache,
{
    let local = cache.get(user).await?;
    let remote = store.remote_progress(user).await?;

    let reconciliation = reconcile(local, remote);

    if reconciliation.sync_local
        && let Some(winner) = &reconciliation.resume
    {
        cache.put(winner).await?;
        tracing::info!(
            "Local progress for {} synced to {} (index {})",
            user,
            winner.item_id,
            winner.index
        );
    }

    Ok(reconciliation)
}

/// Result of one progress save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub record: ProgressRecord,
    pub local: Result<(), StoreError>,
    /// `None` when the save was local-only.
    pub remote: Option<Result<(), StoreError>>,
}

impl SaveOutcome {
    pub fn wrote_remote(&self) -> bool {
        matches!(self.remote, Some(Ok(())))
    }
}

/// Write `record` to the local cache and, when `remote` is set, to the
/// document store. Both writes carry the record's single timestamp.
///
/// The remote write is attempted even if the local one failed.
pub async fn save_progress<S, C>(
    store: &S,
    cache: &C,
    record: ProgressRecord,
    remote: bool,
) -> SaveOutcome
where
    S: FeedStore,
    C: ProgressCache,
{
    let local = cache.put(&record).await;
    if let Err(e) = &local {
        tracing::warn!("Local progress write for {} failed: {}", record.user_id, e);
    }

    let remote = if remote {
        let result = store.write_remote_progress(&record).await;
        if let Err(e) = &result {
            tracing::warn!("Remote progress write for {} failed: {}", record.user_id, e);
        }
        Some(result)
    } else {
        None
    };

    SaveOutcome {
        record,
        local,
        remote,
    }
}
