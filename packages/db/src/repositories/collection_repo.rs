//! Saved and dismissed posting collections, one document per user.

use feed_core::{DismissedSet, PostingId, SavedSet, UserId};
use serde::Deserialize;

use crate::{Database, DbError};

/// Repository for the per-user saved and dismissed sets.
#[derive(Debug, Clone)]
pub struct CollectionRepository {
    db: Database,
}

/// Internal record type for SurrealDB reads.
#[derive(Debug, Default, Deserialize)]
struct CollectionRecord {
    #[serde(default)]
    saved: Option<Vec<PostingId>>,
    #[serde(default)]
    dismissed: Option<Vec<PostingId>>,
}

impl CollectionRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn record(&self, user: &UserId) -> Result<CollectionRecord, DbError> {
        let mut result = self
            .db
            .query("SELECT saved, dismissed FROM type::thing('collection', $user)")
            .bind(("user", user.to_string()))
            .await?;

        let records: Vec<CollectionRecord> = result.take(0)?;

        Ok(records.into_iter().next().unwrap_or_default())
    }

    pub async fn saved(&self, user: &UserId) -> Result<SavedSet, DbError> {
        let record = self.record(user).await?;
        Ok(record.saved.unwrap_or_default().into_iter().collect())
    }

    /// Replace the saved set in full.
    pub async fn put_saved(&self, user: &UserId, saved: &SavedSet) -> Result<(), DbError> {
        let ids: Vec<String> = saved.iter().map(|id| id.to_string()).collect();

        self.db
            .query("UPSERT type::thing('collection', $user) MERGE { saved: $saved } RETURN NONE")
            .bind(("user", user.to_string()))
            .bind(("saved", ids))
            .await?
            .check()?;

        Ok(())
    }

    pub async fn dismissed(&self, user: &UserId) -> Result<DismissedSet, DbError> {
        let record = self.record(user).await?;
        Ok(record.dismissed.unwrap_or_default().into_iter().collect())
    }

    /// Append an id to the dismissed set. Appending twice is a no-op.
    pub async fn dismiss(&self, user: &UserId, id: PostingId) -> Result<(), DbError> {
        self.db
            .query(
                r#"
                UPSERT type::thing('collection', $user)
                SET dismissed = array::union(dismissed ?? [], [$id])
                RETURN NONE
                "#,
            )
            .bind(("user", user.to_string()))
            .bind(("id", id.to_string()))
            .await?
            .check()?;

        Ok(())
    }
}
