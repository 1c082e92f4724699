//! Database schema definitions using SurrealQL.

use crate::{Database, DbError};

/// Initialize the database schema.
///
/// This creates all necessary tables, fields, and indexes.
pub async fn init_schema(db: &Database) -> Result<(), DbError> {
    tracing::info!("Initializing database schema...");

    db.query(POSTING_SCHEMA).await?.check()?;
    db.query(PROGRESS_SCHEMA).await?.check()?;
    db.query(COLLECTION_SCHEMA).await?.check()?;

    tracing::info!("Database schema initialized");

    Ok(())
}

/// Posting table schema.
///
/// The posting body lives in a nested object; the flattened key and
/// coordinate fields exist for ordering and range queries.
const POSTING_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS posting SCHEMALESS;

DEFINE FIELD IF NOT EXISTS posting_id ON posting TYPE string;
DEFINE FIELD IF NOT EXISTS created_ms ON posting TYPE int;
DEFINE FIELD IF NOT EXISTS lat ON posting TYPE option<float>;
DEFINE FIELD IF NOT EXISTS lng ON posting TYPE option<float>;
DEFINE FIELD IF NOT EXISTS posting ON posting TYPE object;

-- Feed order: created_ms ascending, ties broken by id
DEFINE INDEX IF NOT EXISTS posting_order ON posting FIELDS created_ms, posting_id;
DEFINE INDEX IF NOT EXISTS posting_geo ON posting FIELDS lat, lng;
"#;

/// Remote progress, one document per user keyed by user id.
const PROGRESS_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS progress SCHEMALESS;

DEFINE FIELD IF NOT EXISTS user_id ON progress TYPE string;
DEFINE FIELD IF NOT EXISTS item_id ON progress TYPE string;
"#;

/// Saved and dismissed posting ids, one document per user keyed by user id.
const COLLECTION_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS collection SCHEMALESS;

DEFINE FIELD IF NOT EXISTS saved ON collection TYPE option<array<string>>;
DEFINE FIELD IF NOT EXISTS dismissed ON collection TYPE option<array<string>>;
"#;
