use chrono::{DateTime, Utc};

use db::{Database, DbConfig, DbError};
use feed_core::{JobPosting, UserId};

/// Fresh in-memory database with the schema applied.
pub async fn setup_db() -> Result<Database, DbError> {
    db::open(&DbConfig::memory()).await
}

pub fn user(id: &str) -> UserId {
    UserId::parse(id).unwrap()
}

pub fn at_ms(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
}

pub fn posting_at(title: &str, ms: i64) -> JobPosting {
    JobPosting::new(title, "Acme", user("publisher")).with_created_at(at_ms(ms))
}
