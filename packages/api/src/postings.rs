//! Posting server functions: publish, lookup, feed pages, search and map.

use dioxus::prelude::*;
use feed_core::{JobPosting, MapBounds, PageRequest, PostingDraft, PostingFilter};

/// Largest page a client may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Validate a draft and publish it as `author`.
#[post("/api/postings/publish")]
pub async fn publish_posting(author: String, draft: PostingDraft) -> Result<JobPosting, ServerFnError> {
    #[cfg(feature = "server")]
    {
        let author = crate::init::parse_user(&author)?;
        let posting = draft
            .validate(author)
            .map_err(|e| ServerFnError::new(format!("Invalid posting: {}", e)))?;

        let created = crate::init::feed_store()?
            .postings()
            .create(&posting)
            .await
            .map_err(|e| ServerFnError::new(format!("Failed to publish posting: {}", e)))?;

        tracing::info!("Published posting {} by {}", created.id, created.posted_by);
        Ok(created)
    }

    #[cfg(not(feature = "server"))]
    {
        Err(ServerFnError::new("Server-only function"))
    }
}

/// Get a posting by ID.
#[post("/api/postings/get")]
pub async fn get_posting(id: String) -> Result<JobPosting, ServerFnError> {
    #[cfg(feature = "server")]
    {
        let id = crate::init::parse_posting_id(&id)?;

        crate::init::feed_store()?
            .postings()
            .get(id)
            .await
            .map_err(|e| ServerFnError::new(format!("Failed to get posting: {}", e)))
    }

    #[cfg(not(feature = "server"))]
    {
        Err(ServerFnError::new("Server-only function"))
    }
}

/// Run one feed page request. Page sizes are clamped to `1..=MAX_PAGE_SIZE`.
#[post("/api/feed/page")]
pub async fn feed_page(request: PageRequest) -> Result<Vec<JobPosting>, ServerFnError> {
    #[cfg(feature = "server")]
    {
        let request = request.clamp_limit(MAX_PAGE_SIZE);

        let store = crate::init::feed_store()?;
        feed_core::fetch_page(&store, &request)
            .await
            .map_err(|e| ServerFnError::new(format!("Failed to load feed page: {}", e)))
    }

    #[cfg(not(feature = "server"))]
    {
        Err(ServerFnError::new("Server-only function"))
    }
}

/// Search postings, newest first.
#[post("/api/postings/search")]
pub async fn search_postings(filter: PostingFilter) -> Result<Vec<JobPosting>, ServerFnError> {
    #[cfg(feature = "server")]
    {
        crate::init::feed_store()?
            .postings()
            .search(&filter)
            .await
            .map_err(|e| ServerFnError::new(format!("Search failed: {}", e)))
    }

    #[cfg(not(feature = "server"))]
    {
        Err(ServerFnError::new("Server-only function"))
    }
}

/// Postings inside a map viewport.
#[post("/api/postings/bounds")]
pub async fn postings_in_bounds(
    bounds: MapBounds,
    limit: Option<usize>,
) -> Result<Vec<JobPosting>, ServerFnError> {
    #[cfg(feature = "server")]
    {
        crate::init::feed_store()?
            .postings()
            .within_bounds(bounds, limit)
            .await
            .map_err(|e| ServerFnError::new(format!("Map query failed: {}", e)))
    }

    #[cfg(not(feature = "server"))]
    {
        Err(ServerFnError::new("Server-only function"))
    }
}
