//! SurrealDB integration for the job feed.
//!
//! This crate provides database connectivity, repositories for postings,
//! remote progress and the per-user saved/dismissed collections, and
//! [`SurrealFeedStore`], the document-store implementation of
//! [`feed_core::FeedStore`].
//!
//! # Features
//!
//! - `memory` (default): Use in-memory storage for testing
//! - `rocksdb`: Use RocksDB for persistent file-based storage

mod connection;
mod feed_store;
mod schema;
pub mod repositories;

pub use connection::{Database, DbConfig, DbError, connect_db, get_db, init_db};
pub use feed_store::SurrealFeedStore;
pub use schema::init_schema;

/// Initialize the shared database with the given configuration.
///
/// This should be called once at application startup.
pub async fn init(config: DbConfig) -> Result<&'static Database, DbError> {
    let db = init_db(config).await?;
    init_schema(db).await?;
    Ok(db)
}

/// Open a private database with the schema applied.
pub async fn open(config: &DbConfig) -> Result<Database, DbError> {
    let db = connect_db(config).await?;
    init_schema(&db).await?;
    Ok(db)
}
