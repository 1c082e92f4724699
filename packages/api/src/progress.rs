//! Remote progress server functions.

use dioxus::prelude::*;
use feed_core::ProgressRecord;

/// Get the user's remote progress record.
#[post("/api/progress/get")]
pub async fn get_progress(user: String) -> Result<Option<ProgressRecord>, ServerFnError> {
    #[cfg(feature = "server")]
    {
        let user = crate::init::parse_user(&user)?;

        crate::init::feed_store()?
            .progress()
            .get(&user)
            .await
            .map_err(|e| ServerFnError::new(format!("Failed to get progress: {}", e)))
    }

    #[cfg(not(feature = "server"))]
    {
        Err(ServerFnError::new("Server-only function"))
    }
}

/// Merge-write the user's remote progress record.
#[post("/api/progress/put")]
pub async fn put_progress(record: ProgressRecord) -> Result<(), ServerFnError> {
    #[cfg(feature = "server")]
    {
        crate::init::feed_store()?
            .progress()
            .put(&record)
            .await
            .map_err(|e| ServerFnError::new(format!("Failed to save progress: {}", e)))
    }

    #[cfg(not(feature = "server"))]
    {
        Err(ServerFnError::new("Server-only function"))
    }
}
