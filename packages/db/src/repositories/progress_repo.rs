//! Remote progress repository: one merge-written document per user.

use feed_core::{ProgressRecord, UserId};

use crate::{Database, DbError};

/// Repository for the per-user remote progress record.
#[derive(Debug, Clone)]
pub struct ProgressRepository {
    db: Database,
}

impl ProgressRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn get(&self, user: &UserId) -> Result<Option<ProgressRecord>, DbError> {
        let mut result = self
            .db
            .query("SELECT * OMIT id FROM type::thing('progress', $user)")
            .bind(("user", user.to_string()))
            .await?;

        let records: Vec<ProgressRecord> = result.take(0)?;

        Ok(records.into_iter().next())
    }

    /// Merge the record into the user's document, creating it when missing.
    ///
    /// Fields outside the record are left untouched.
    pub async fn put(&self, record: &ProgressRecord) -> Result<(), DbError> {
        self.db
            .query("UPSERT type::thing('progress', $user) MERGE $record RETURN NONE")
            .bind(("user", record.user_id.to_string()))
            .bind(("record", record.clone()))
            .await?
            .check()?;

        tracing::debug!(
            "Remote progress for {} -> index {} ({})",
            record.user_id,
            record.index,
            record.item_id
        );
        Ok(())
    }
}
