//! [`FeedStore`] implementation over the SurrealDB repositories.

use feed_core::{
    Cursor, DismissedSet, FeedStore, JobPosting, PostingId, ProgressRecord, SavedSet, StoreError,
    UserId,
};

use crate::repositories::{CollectionRepository, PostingRepository, ProgressRepository};
use crate::{Database, DbError};

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotInitialized | DbError::Connection(_) => {
                StoreError::Unavailable(err.to_string())
            }
            DbError::NotFound(what) => StoreError::NotFound(what),
            DbError::Serialization(msg) => StoreError::Corrupt(msg),
            DbError::Query(msg) => StoreError::Backend(msg),
        }
    }
}

/// Remote document store backed by SurrealDB.
#[derive(Debug, Clone)]
pub struct SurrealFeedStore {
    postings: PostingRepository,
    progress: ProgressRepository,
    collections: CollectionRepository,
}

impl SurrealFeedStore {
    pub fn new(db: Database) -> Self {
        Self {
            postings: PostingRepository::new(db.clone()),
            progress: ProgressRepository::new(db.clone()),
            collections: CollectionRepository::new(db),
        }
    }

    pub fn postings(&self) -> &PostingRepository {
        &self.postings
    }

    pub fn progress(&self) -> &ProgressRepository {
        &self.progress
    }

    pub fn collections(&self) -> &CollectionRepository {
        &self.collections
    }
}

impl FeedStore for SurrealFeedStore {
    async fn posting(&self, id: PostingId) -> Result<Option<JobPosting>, StoreError> {
        Ok(self.postings.find(id).await?)
    }

    async fn page_after(
        &self,
        after: Option<Cursor>,
        limit: usize,
    ) -> Result<Vec<JobPosting>, StoreError> {
        Ok(self.postings.page_after(after, limit).await?)
    }

    async fn remote_progress(&self, user: &UserId) -> Result<Option<ProgressRecord>, StoreError> {
        Ok(self.progress.get(user).await?)
    }

    async fn write_remote_progress(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        Ok(self.progress.put(record).await?)
    }

    async fn saved_set(&self, user: &UserId) -> Result<SavedSet, StoreError> {
        Ok(self.collections.saved(user).await?)
    }

    async fn write_saved_set(&self, user: &UserId, saved: &SavedSet) -> Result<(), StoreError> {
        Ok(self.collections.put_saved(user, saved).await?)
    }

    async fn dismissed_set(&self, user: &UserId) -> Result<DismissedSet, StoreError> {
        Ok(self.collections.dismissed(user).await?)
    }

    async fn dismiss(&self, user: &UserId, id: PostingId) -> Result<(), StoreError> {
        Ok(self.collections.dismiss(user, id).await?)
    }
}
