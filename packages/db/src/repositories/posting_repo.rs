//! Posting repository: publish, lookup, feed pages and search.

use feed_core::{Cursor, JobPosting, MapBounds, PostingFilter, PostingId};
use serde::{Deserialize, Serialize};

use crate::{Database, DbError};

/// Default number of results for search queries without a limit.
const DEFAULT_SEARCH_LIMIT: usize = 100;
/// Hard cap on search results.
const MAX_SEARCH_LIMIT: usize = 500;

/// Repository for posting persistence operations.
#[derive(Debug, Clone)]
pub struct PostingRepository {
    db: Database,
}

/// Internal record type for SurrealDB.
///
/// `created_ms` and `posting_id` form the feed ordering key; `lat`/`lng`
/// are copied out of the posting for range queries.
#[derive(Debug, Serialize, Deserialize)]
struct PostingRecord {
    posting_id: String,
    created_ms: i64,
    lat: Option<f64>,
    lng: Option<f64>,
    posting: JobPosting,
}

impl PostingRecord {
    fn from_posting(posting: &JobPosting) -> Self {
        let key = posting.feed_key();
        Self {
            posting_id: key.id.to_string(),
            created_ms: key.created_ms,
            lat: posting.location.map(|p| p.lat),
            lng: posting.location.map(|p| p.lng),
            posting: posting.clone(),
        }
    }

    fn into_posting(self) -> JobPosting {
        self.posting
    }
}

impl PostingRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new posting. Fails if the id already exists.
    pub async fn create(&self, posting: &JobPosting) -> Result<JobPosting, DbError> {
        self.db
            .query("CREATE type::thing('posting', $id) CONTENT $record RETURN NONE")
            .bind(("id", posting.id.to_string()))
            .bind(("record", PostingRecord::from_posting(posting)))
            .await?
            .check()?;

        tracing::debug!("Created posting {} ({})", posting.id, posting.title);
        Ok(posting.clone())
    }

    /// Get a posting by ID.
    pub async fn get(&self, id: PostingId) -> Result<JobPosting, DbError> {
        self.find(id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Posting not found: {}", id)))
    }

    /// Get a posting by ID, `None` when missing.
    pub async fn find(&self, id: PostingId) -> Result<Option<JobPosting>, DbError> {
        let mut result = self
            .db
            .query("SELECT * OMIT id FROM type::thing('posting', $id)")
            .bind(("id", id.to_string()))
            .await?;

        let records: Vec<PostingRecord> = result.take(0)?;

        Ok(records.into_iter().next().map(PostingRecord::into_posting))
    }

    /// Up to `limit` postings strictly after `after` in feed order.
    pub async fn page_after(
        &self,
        after: Option<Cursor>,
        limit: usize,
    ) -> Result<Vec<JobPosting>, DbError> {
        let query = match after {
            Some(cursor) => self
                .db
                .query(
                    r#"
                    SELECT * OMIT id FROM posting
                    WHERE created_ms > $ms OR (created_ms = $ms AND posting_id > $id)
                    ORDER BY created_ms ASC, posting_id ASC
                    LIMIT $limit
                    "#,
                )
                .bind(("ms", cursor.created_ms))
                .bind(("id", cursor.id.to_string())),
            None => self.db.query(
                r#"
                SELECT * OMIT id FROM posting
                ORDER BY created_ms ASC, posting_id ASC
                LIMIT $limit
                "#,
            ),
        };

        let mut result = query.bind(("limit", limit as i64)).await?;
        let records: Vec<PostingRecord> = result.take(0)?;

        Ok(records.into_iter().map(PostingRecord::into_posting).collect())
    }

    /// Search postings, newest first.
    ///
    /// Every filter is applied in the database and results are read a page at
    /// a time. [`JobPosting::matches`] still runs on each row so the keyword
    /// and bounds semantics stay identical to the client-side check.
    pub async fn search(&self, filter: &PostingFilter) -> Result<Vec<JobPosting>, DbError> {
        let mut conditions = Vec::new();
        let mut bindings: Vec<(&'static str, serde_json::Value)> = Vec::new();

        if let Some(keyword) = filter.normalized_keyword() {
            conditions.push(
                "(string::lowercase(posting.title) CONTAINS $keyword \
                 OR string::lowercase(posting.company) CONTAINS $keyword \
                 OR string::lowercase(posting.location_name ?? '') CONTAINS $keyword \
                 OR string::lowercase(array::join(posting.tags ?? [], ' ')) CONTAINS $keyword)",
            );
            bindings.push(("keyword", serde_json::json!(keyword)));
        }

        if let Some(kind) = filter.employment_type {
            conditions.push("posting.employment_type = $employment_type");
            bindings.push(("employment_type", serde_json::json!(kind.as_str())));
        }

        if filter.remote_only {
            conditions.push("posting.remote = true");
        }

        if let Some(min) = filter.min_salary {
            conditions.push("posting.salary.max >= $min_salary");
            bindings.push(("min_salary", serde_json::json!(min)));
        }

        if let Some(bounds) = &filter.bounds {
            conditions.push("lat >= $south AND lat <= $north");
            bindings.push(("south", serde_json::json!(bounds.south_west.lat)));
            bindings.push(("north", serde_json::json!(bounds.north_east.lat)));

            if bounds.south_west.lng <= bounds.north_east.lng {
                conditions.push("lng >= $west AND lng <= $east");
            } else {
                // Viewport crosses the antimeridian
                conditions.push("(lng >= $west OR lng <= $east)");
            }
            bindings.push(("west", serde_json::json!(bounds.south_west.lng)));
            bindings.push(("east", serde_json::json!(bounds.north_east.lng)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT * OMIT id FROM posting {} ORDER BY created_ms DESC, posting_id DESC LIMIT $limit START $start",
            where_clause
        );

        let limit = filter
            .limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT);

        let mut found = Vec::with_capacity(limit);
        let mut start = 0usize;
        loop {
            let mut request = self.db.query(&query);
            for (name, value) in &bindings {
                request = request.bind((*name, value.clone()));
            }

            let mut response = request
                .bind(("limit", limit as i64))
                .bind(("start", start as i64))
                .await?;
            let records: Vec<PostingRecord> = response.take(0)?;
            let fetched = records.len();

            found.extend(
                records
                    .into_iter()
                    .map(PostingRecord::into_posting)
                    .filter(|p| p.matches(filter)),
            );

            if found.len() >= limit || fetched < limit {
                break;
            }
            start += fetched;
        }

        found.truncate(limit);
        Ok(found)
    }

    /// Postings located inside a map viewport, newest first.
    pub async fn within_bounds(
        &self,
        bounds: MapBounds,
        limit: Option<usize>,
    ) -> Result<Vec<JobPosting>, DbError> {
        self.search(&PostingFilter {
            bounds: Some(bounds),
            limit,
            ..Default::default()
        })
        .await
    }

    /// Total number of postings.
    pub async fn count(&self) -> Result<u64, DbError> {
        let mut result = self
            .db
            .query("SELECT count() AS count FROM posting GROUP ALL")
            .await?;

        #[derive(Deserialize)]
        struct Count {
            count: i64,
        }

        let counts: Vec<Count> = result.take(0)?;
        Ok(counts.first().map(|c| c.count as u64).unwrap_or(0))
    }

    /// Delete a posting.
    pub async fn delete(&self, id: PostingId) -> Result<(), DbError> {
        self.db
            .query("DELETE type::thing('posting', $id)")
            .bind(("id", id.to_string()))
            .await?
            .check()?;

        Ok(())
    }
}
