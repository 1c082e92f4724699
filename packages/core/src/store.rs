//! Collaborator seams: the remote document store and the local progress cache.
//!
//! The feed controller is generic over these traits so the same logic runs
//! against SurrealDB, the object-store cache, or in-memory fakes in tests.

use std::future::Future;

use thiserror::Error;

use crate::{Cursor, DismissedSet, JobPosting, PostingId, ProgressRecord, SavedSet, UserId};

/// Errors surfaced by store collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend could not be reached (offline, timeout, connection lost).
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Stored data could not be decoded.
    #[error("corrupt data: {0}")]
    Corrupt(String),
    #[error("store error: {0}")]
    Backend(String),
}

/// Remote document store holding postings and per-user documents.
///
/// Pagination must be stable: `page_after` returns items strictly after the
/// cursor in `FeedKey` ascending order. Progress writes merge into the user
/// document without clobbering unrelated fields.
pub trait FeedStore: Send + Sync + 'static {
    /// Fetch a single posting by id.
    fn posting(
        &self,
        id: PostingId,
    ) -> impl Future<Output = Result<Option<JobPosting>, StoreError>> + Send;

    /// Fetch up to `limit` postings strictly after `after` (from the start when `None`).
    fn page_after(
        &self,
        after: Option<Cursor>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<JobPosting>, StoreError>> + Send;

    fn remote_progress(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<ProgressRecord>, StoreError>> + Send;

    /// Merge-write the user's remote progress record.
    fn write_remote_progress(
        &self,
        record: &ProgressRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn saved_set(&self, user: &UserId) -> impl Future<Output = Result<SavedSet, StoreError>> + Send;

    /// Replace the user's saved set in full.
    fn write_saved_set(
        &self,
        user: &UserId,
        saved: &SavedSet,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn dismissed_set(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<DismissedSet, StoreError>> + Send;

    /// Add an id to the user's dismissed set. Idempotent.
    fn dismiss(
        &self,
        user: &UserId,
        id: PostingId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Local persistent cache of the user's progress record.
pub trait ProgressCache: Send + Sync + 'static {
    fn get(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<ProgressRecord>, StoreError>> + Send;

    fn put(&self, record: &ProgressRecord) -> impl Future<Output = Result<(), StoreError>> + Send;
}
