//! Saved and dismissed collection server functions.

use dioxus::prelude::*;
use feed_core::PostingId;

/// The user's saved posting ids.
#[post("/api/saved/list")]
pub async fn saved_postings(user: String) -> Result<Vec<PostingId>, ServerFnError> {
    #[cfg(feature = "server")]
    {
        let user = crate::init::parse_user(&user)?;

        let saved = crate::init::feed_store()?
            .collections()
            .saved(&user)
            .await
            .map_err(|e| ServerFnError::new(format!("Failed to load saved postings: {}", e)))?;

        Ok(saved.iter().copied().collect())
    }

    #[cfg(not(feature = "server"))]
    {
        Err(ServerFnError::new("Server-only function"))
    }
}

/// Set saved membership of a posting. Reads the full set and writes it back.
#[post("/api/saved/set")]
pub async fn set_saved(user: String, posting_id: String, saved: bool) -> Result<bool, ServerFnError> {
    #[cfg(feature = "server")]
    {
        let user = crate::init::parse_user(&user)?;
        let posting_id = crate::init::parse_posting_id(&posting_id)?;
        let collections = crate::init::feed_store()?.collections().clone();

        let mut set = collections
            .saved(&user)
            .await
            .map_err(|e| ServerFnError::new(format!("Failed to load saved postings: {}", e)))?;
        set.set(posting_id, saved);
        collections
            .put_saved(&user, &set)
            .await
            .map_err(|e| ServerFnError::new(format!("Failed to save posting: {}", e)))?;

        Ok(saved)
    }

    #[cfg(not(feature = "server"))]
    {
        Err(ServerFnError::new("Server-only function"))
    }
}

/// The user's dismissed posting ids.
#[post("/api/dismissed/list")]
pub async fn dismissed_postings(user: String) -> Result<Vec<PostingId>, ServerFnError> {
    #[cfg(feature = "server")]
    {
        let user = crate::init::parse_user(&user)?;

        let dismissed = crate::init::feed_store()?
            .collections()
            .dismissed(&user)
            .await
            .map_err(|e| ServerFnError::new(format!("Failed to load dismissed postings: {}", e)))?;

        Ok(dismissed.iter().copied().collect())
    }

    #[cfg(not(feature = "server"))]
    {
        Err(ServerFnError::new("Server-only function"))
    }
}

/// Add a posting to the user's dismissed set. Idempotent.
#[post("/api/dismissed/add")]
pub async fn dismiss_posting(user: String, posting_id: String) -> Result<(), ServerFnError> {
    #[cfg(feature = "server")]
    {
        let user = crate::init::parse_user(&user)?;
        let posting_id = crate::init::parse_posting_id(&posting_id)?;

        crate::init::feed_store()?
            .collections()
            .dismiss(&user, posting_id)
            .await
            .map_err(|e| ServerFnError::new(format!("Failed to dismiss posting: {}", e)))
    }

    #[cfg(not(feature = "server"))]
    {
        Err(ServerFnError::new("Server-only function"))
    }
}
