use std::time::Duration;

use actors::FeedSession;
use feed_core::{
    Cursor, DismissedSet, FeedConfig, FeedPhase, FeedSnapshot, FeedStore, JobPosting,
    MemoryFeedStore, PostingId, ProgressRecord, SavedSet, StoreError, UserId,
};
use tokio::sync::Notify;

pub fn user() -> UserId {
    UserId::parse("alice").unwrap()
}

/// Defaults with timers short enough for tests; autosave effectively off.
pub fn test_config() -> FeedConfig {
    FeedConfig {
        debounce_ms: 20,
        autosave_secs: 3600,
        ..FeedConfig::default()
    }
}

/// Poll `cond` every 10ms for up to `timeout`.
pub async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll snapshots until `pred` holds.
pub async fn wait_for_snapshot(
    session: &FeedSession,
    pred: impl Fn(&FeedSnapshot) -> bool,
) -> FeedSnapshot {
    for _ in 0..300 {
        let snapshot = session.snapshot().await.unwrap();
        if pred(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("snapshot condition not reached");
}

pub async fn wait_ready(session: &FeedSession) -> FeedSnapshot {
    wait_for_snapshot(session, |s| s.phase == FeedPhase::Ready).await
}

/// Memory store whose remote progress reads wait until [`GatedStore::open`],
/// holding a session in the restoring phase.
pub struct GatedStore {
    pub inner: MemoryFeedStore,
    gate: Notify,
}

impl GatedStore {
    pub fn new(inner: MemoryFeedStore) -> Self {
        Self {
            inner,
            gate: Notify::new(),
        }
    }

    pub fn open(&self) {
        self.gate.notify_one();
    }
}

impl FeedStore for GatedStore {
    async fn posting(&self, id: PostingId) -> Result<Option<JobPosting>, StoreError> {
        self.inner.posting(id).await
    }

    async fn page_after(
        &self,
        after: Option<Cursor>,
        limit: usize,
    ) -> Result<Vec<JobPosting>, StoreError> {
        self.inner.page_after(after, limit).await
    }

    async fn remote_progress(&self, user: &UserId) -> Result<Option<ProgressRecord>, StoreError> {
        self.gate.notified().await;
        self.inner.remote_progress(user).await
    }

    async fn write_remote_progress(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        self.inner.write_remote_progress(record).await
    }

    async fn saved_set(&self, user: &UserId) -> Result<SavedSet, StoreError> {
        self.inner.saved_set(user).await
    }

    async fn write_saved_set(&self, user: &UserId, saved: &SavedSet) -> Result<(), StoreError> {
        self.inner.write_saved_set(user, saved).await
    }

    async fn dismissed_set(&self, user: &UserId) -> Result<DismissedSet, StoreError> {
        self.inner.dismissed_set(user).await
    }

    async fn dismiss(&self, user: &UserId, id: PostingId) -> Result<(), StoreError> {
        self.inner.dismiss(user, id).await
    }
}
