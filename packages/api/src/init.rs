//! Server initialization for the job feed.

use std::sync::Arc;

use actors::{FeedSession, start_feed_session};
use db::{DbConfig, SurrealFeedStore, init as init_db};
use dioxus::prelude::ServerFnError;
use feed_core::{
    EmploymentType, FeedConfig, GeoPoint, JobPosting, PostingDraft, PostingId, UserId,
};
use storage::LocalProgressCache;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Honours `RUST_LOG` and defaults to `info`. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Initialize the feed backend.
///
/// This should be called once at server startup before handling requests.
pub async fn init_feed_backend() -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Initializing job feed backend...");

    let db = init_db(DbConfig::from_env()).await?;
    let store = SurrealFeedStore::new(db.clone());

    // Seed a few demo postings into an empty feed
    if store.postings().count().await? == 0 {
        tracing::info!("Seeding demo postings...");
        for posting in demo_postings()? {
            store.postings().create(&posting).await?;
        }
    }

    tracing::info!("Job feed backend initialized");
    Ok(())
}

/// Document store over the shared database connection.
pub fn feed_store() -> Result<SurrealFeedStore, ServerFnError> {
    let db = db::get_db().map_err(|e| ServerFnError::new(e.to_string()))?;
    Ok(SurrealFeedStore::new(db.clone()))
}

pub(crate) fn parse_user(raw: &str) -> Result<UserId, ServerFnError> {
    UserId::parse(raw).map_err(|e| ServerFnError::new(format!("Invalid user ID: {}", e)))
}

pub(crate) fn parse_posting_id(raw: &str) -> Result<PostingId, ServerFnError> {
    PostingId::parse(raw).map_err(|e| ServerFnError::new(format!("Invalid posting ID: {}", e)))
}

/// Start a feed session for `user` against the shared database and a local
/// cache selected from the environment. Session events are forwarded to the
/// global event stream.
pub async fn open_feed_session(user: UserId) -> Result<FeedSession, Box<dyn std::error::Error>> {
    let db = db::get_db()?;
    let store = Arc::new(SurrealFeedStore::new(db.clone()));
    let cache = Arc::new(LocalProgressCache::from_env().await?);
    let config = FeedConfig::from_env()?;

    let session = start_feed_session(user.clone(), store, cache, config).await?;
    crate::realtime::forward_session_events(user, &session);
    Ok(session)
}

fn demo_postings() -> Result<Vec<JobPosting>, Box<dyn std::error::Error>> {
    let author = UserId::parse("demo")?;

    let drafts = [
        PostingDraft {
            title: "Backend engineer (Rust)".to_string(),
            company: "Northwind".to_string(),
            description: "Build the services behind our logistics platform.".to_string(),
            location_name: "Berlin, DE".to_string(),
            location: Some(GeoPoint::new(52.52, 13.405)),
            salary_min: Some(70_000),
            salary_max: Some(95_000),
            tags: vec!["rust".to_string(), "backend".to_string()],
            ..Default::default()
        },
        PostingDraft {
            title: "Barista".to_string(),
            company: "Corner Coffee".to_string(),
            location_name: "Lisbon, PT".to_string(),
            location: Some(GeoPoint::new(38.722, -9.139)),
            employment_type: EmploymentType::PartTime,
            tags: vec!["coffee".to_string()],
            ..Default::default()
        },
        PostingDraft {
            title: "Product designer".to_string(),
            company: "Fieldnotes".to_string(),
            remote: true,
            employment_type: EmploymentType::Contract,
            salary_min: Some(50_000),
            accent_color: Some("#3b82f6".to_string()),
            ..Default::default()
        },
    ];

    let mut postings = Vec::with_capacity(drafts.len());
    for draft in drafts {
        postings.push(draft.validate(author.clone())?);
    }
    Ok(postings)
}
