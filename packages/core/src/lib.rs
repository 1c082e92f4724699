//! Core domain types for the job-discovery feed.
//!
//! This crate contains the logic shared across all packages:
//! - JobPosting and search/publish types for feed items
//! - ProgressRecord and the local/remote reconciliation rule
//! - FeedLoader for cursor-based pagination
//! - Saved/dismissed sets and per-item UI state retention
//! - Store traits the controller is generic over, plus in-memory versions
//! - Events for real-time updates

mod collections;
mod config;
mod events;
mod feed;
mod memory;
mod pagination;
mod posting;
mod progress;
mod retention;
mod store;
mod user;

pub use collections::{DismissedSet, SavedSet};
pub use config::{ConfigError, FeedConfig};
pub use events::FeedEvent;
pub use feed::{ErrorSource, FeedError, FeedPhase, FeedSnapshot};
pub use memory::{MemoryFeedStore, MemoryProgressCache};
pub use pagination::{Cursor, FeedLoader, PageRequest, fetch_page};
pub use posting::{
    EmploymentType, FeedKey, GeoPoint, JobPosting, MapBounds, PostingDraft, PostingFilter,
    PostingId, SalaryRange, ValidationError,
};
pub use progress::{ProgressClock, ProgressRecord, Reconciliation, reconcile};
pub use retention::{ItemUiState, RetainedUiState};
pub use store::{FeedStore, ProgressCache, StoreError};
pub use user::{UserId, UserIdError};
