//! In-memory collaborators for offline demos and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Duration, Utc};

use crate::{
    Cursor, DismissedSet, FeedKey, FeedStore, JobPosting, PostingId, ProgressCache,
    ProgressRecord, SavedSet, StoreError, UserId,
};

#[derive(Debug, Default)]
struct Documents {
    postings: BTreeMap<FeedKey, JobPosting>,
    progress: HashMap<UserId, ProgressRecord>,
    saved: HashMap<UserId, SavedSet>,
    dismissed: HashMap<UserId, DismissedSet>,
}

/// Document store kept in process memory.
///
/// Can be switched offline to exercise the degraded paths of the controller.
#[derive(Debug)]
pub struct MemoryFeedStore {
    docs: Mutex<Documents>,
    available: AtomicBool,
    page_requests: AtomicUsize,
    progress_writes: AtomicUsize,
}

impl Default for MemoryFeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFeedStore {
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(Documents::default()),
            available: AtomicBool::new(true),
            page_requests: AtomicUsize::new(0),
            progress_writes: AtomicUsize::new(0),
        }
    }

    /// Store seeded with `count` postings, one second apart.
    pub fn with_postings(count: usize) -> Self {
        let store = Self::new();
        let author = UserId::from_static("seed");
        let start = Utc::now() - Duration::days(1);
        for i in 0..count {
            let posting = JobPosting::new(format!("Job {i}"), "Seed Co", author.clone())
                .with_created_at(start + Duration::seconds(i as i64));
            store.insert(posting);
        }
        store
    }

    fn docs(&self) -> MutexGuard<'_, Documents> {
        self.docs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".into()))
        }
    }

    pub fn insert(&self, posting: JobPosting) {
        self.docs().postings.insert(posting.feed_key(), posting);
    }

    /// All postings in feed order.
    pub fn ordered(&self) -> Vec<JobPosting> {
        self.docs().postings.values().cloned().collect()
    }

    /// Simulate losing (or regaining) connectivity.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn stored_progress(&self, user: &UserId) -> Option<ProgressRecord> {
        self.docs().progress.get(user).cloned()
    }

    pub fn stored_saved(&self, user: &UserId) -> SavedSet {
        self.docs().saved.get(user).cloned().unwrap_or_default()
    }

    pub fn stored_dismissed(&self, user: &UserId) -> DismissedSet {
        self.docs().dismissed.get(user).cloned().unwrap_or_default()
    }

    /// Seed a remote progress record directly.
    pub fn seed_progress(&self, record: ProgressRecord) {
        self.docs().progress.insert(record.user_id.clone(), record);
    }

    /// Number of page queries served (including failed ones).
    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    /// Number of successful remote progress writes.
    pub fn progress_writes(&self) -> usize {
        self.progress_writes.load(Ordering::SeqCst)
    }
}

impl FeedStore for MemoryFeedStore {
    async fn posting(&self, id: PostingId) -> Result<Option<JobPosting>, StoreError> {
        self.check()?;
        Ok(self.docs().postings.values().find(|p| p.id == id).cloned())
    }

    async fn page_after(
        &self,
        after: Option<Cursor>,
        limit: usize,
    ) -> Result<Vec<JobPosting>, StoreError> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let docs = self.docs();
        let page = match after {
            Some(cursor) => docs
                .postings
                .range((std::ops::Bound::Excluded(cursor), std::ops::Bound::Unbounded))
                .map(|(_, p)| p.clone())
                .take(limit)
                .collect(),
            None => docs.postings.values().take(limit).cloned().collect(),
        };
        Ok(page)
    }

    async fn remote_progress(&self, user: &UserId) -> Result<Option<ProgressRecord>, StoreError> {
        self.check()?;
        Ok(self.stored_progress(user))
    }

    async fn write_remote_progress(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        self.check()?;
        self.seed_progress(record.clone());
        self.progress_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn saved_set(&self, user: &UserId) -> Result<SavedSet, StoreError> {
        self.check()?;
        Ok(self.stored_saved(user))
    }

    async fn write_saved_set(&self, user: &UserId, saved: &SavedSet) -> Result<(), StoreError> {
        self.check()?;
        self.docs().saved.insert(user.clone(), saved.clone());
        Ok(())
    }

    async fn dismissed_set(&self, user: &UserId) -> Result<DismissedSet, StoreError> {
        self.check()?;
        Ok(self.stored_dismissed(user))
    }

    async fn dismiss(&self, user: &UserId, id: PostingId) -> Result<(), StoreError> {
        self.check()?;
        self.docs()
            .dismissed
            .entry(user.clone())
            .or_default()
            .insert(id);
        Ok(())
    }
}

/// Progress cache kept in process memory.
#[derive(Debug)]
pub struct MemoryProgressCache {
    records: Mutex<HashMap<UserId, ProgressRecord>>,
    available: AtomicBool,
}

impl Default for MemoryProgressCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProgressCache {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    fn records(&self) -> MutexGuard<'_, HashMap<UserId, ProgressRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn stored(&self, user: &UserId) -> Option<ProgressRecord> {
        self.records().get(user).cloned()
    }

    pub fn seed(&self, record: ProgressRecord) {
        self.records().insert(record.user_id.clone(), record);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Backend("memory cache disabled".into()))
        }
    }
}

impl ProgressCache for MemoryProgressCache {
    async fn get(&self, user: &UserId) -> Result<Option<ProgressRecord>, StoreError> {
        self.check()?;
        Ok(self.stored(user))
    }

    async fn put(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        self.check()?;
        self.seed(record.clone());
        Ok(())
    }
}
