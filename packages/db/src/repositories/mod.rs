//! Repository implementations for database operations.

mod collection_repo;
mod posting_repo;
mod progress_repo;

pub use collection_repo::CollectionRepository;
pub use posting_repo::PostingRepository;
pub use progress_repo::ProgressRepository;
