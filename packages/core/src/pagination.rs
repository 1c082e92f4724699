//! Cursor-based feed pagination.
//!
//! The loader is a small state machine: the controller asks it for the next
//! [`PageRequest`], runs [`fetch_page`] against a [`FeedStore`] off the
//! message loop, and hands the result back through [`FeedLoader::apply_page`]
//! or [`FeedLoader::fail_fetch`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{FeedKey, FeedStore, JobPosting, PostingId, StoreError};

/// Opaque marker for the last fetched item.
pub type Cursor = FeedKey;

/// What to fetch next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageRequest {
    /// First page of a restored session: the resume item followed by the
    /// items after it.
    Resume { item_id: PostingId, limit: usize },
    /// First page of a fresh session.
    First { limit: usize },
    /// Next page after the cursor.
    After { cursor: Cursor, limit: usize },
}

impl PageRequest {
    pub fn limit(&self) -> usize {
        match self {
            PageRequest::Resume { limit, .. }
            | PageRequest::First { limit }
            | PageRequest::After { limit, .. } => *limit,
        }
    }

    /// Clamp the page size to `1..=max`.
    ///
    /// A zero limit would return an empty page, which ends pagination.
    pub fn clamp_limit(self, max: usize) -> Self {
        let clamp = |limit: usize| limit.clamp(1, max.max(1));
        match self {
            PageRequest::Resume { item_id, limit } => PageRequest::Resume {
                item_id,
                limit: clamp(limit),
            },
            PageRequest::First { limit } => PageRequest::First {
                limit: clamp(limit),
            },
            PageRequest::After { cursor, limit } => PageRequest::After {
                cursor,
                limit: clamp(limit),
            },
        }
    }
}

/// Ordered, deduplicated, append-only feed sequence.
#[derive(Debug, Clone)]
pub struct FeedLoader {
    batch_size: usize,
    resume: Option<PostingId>,
    items: Vec<JobPosting>,
    seen: HashSet<PostingId>,
    cursor: Option<Cursor>,
    exhausted: bool,
    in_flight: bool,
}

impl FeedLoader {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            resume: None,
            items: Vec::new(),
            seen: HashSet::new(),
            cursor: None,
            exhausted: false,
            in_flight: false,
        }
    }

    /// Seed the first page at a resume item.
    pub fn with_resume(mut self, item_id: Option<PostingId>) -> Self {
        self.resume = item_id;
        self
    }

    /// Claim the next fetch. `None` when pagination ended or a fetch is
    /// already in flight.
    pub fn begin_fetch(&mut self) -> Option<PageRequest> {
        if self.exhausted || self.in_flight {
            return None;
        }
        self.in_flight = true;

        let limit = self.batch_size;
        Some(match (self.cursor, self.resume) {
            (Some(cursor), _) => PageRequest::After { cursor, limit },
            (None, Some(item_id)) => PageRequest::Resume { item_id, limit },
            (None, None) => PageRequest::First { limit },
        })
    }

    /// Append a fetched page. Returns how many items were appended.
    ///
    /// An empty page ends pagination for the session. Items already seen or
    /// not strictly after the cursor are dropped.
    pub fn apply_page(&mut self, page: Vec<JobPosting>) -> usize {
        self.in_flight = false;
        if page.is_empty() {
            self.exhausted = true;
            return 0;
        }

        let page_end = page.last().map(JobPosting::feed_key);
        let mut appended = 0;
        for item in page {
            let key = item.feed_key();
            if self.cursor.is_some_and(|c| key <= c) || !self.seen.insert(item.id) {
                continue;
            }
            self.cursor = Some(key);
            self.items.push(item);
            appended += 1;
        }

        // A page of nothing but duplicates still moves the cursor so the next
        // request cannot return the same page again.
        if let Some(end) = page_end
            && self.cursor.is_none_or(|c| end > c)
        {
            self.cursor = Some(end);
        }
        appended
    }

    /// Release the in-flight claim after a failed fetch.
    pub fn fail_fetch(&mut self) {
        self.in_flight = false;
    }

    /// Whether `index` is close enough to the end to fetch the next page.
    pub fn should_prefetch(&self, index: usize, threshold: usize) -> bool {
        !self.exhausted && !self.in_flight && index >= self.items.len().saturating_sub(threshold)
    }

    pub fn items(&self) -> &[JobPosting] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&JobPosting> {
        self.items.get(index)
    }

    pub fn position_of(&self, id: &PostingId) -> Option<usize> {
        if !self.seen.contains(id) {
            return None;
        }
        self.items.iter().position(|item| item.id == *id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }
}

/// Run a page request against the store.
///
/// A resume item that no longer exists degrades to the first page.
pub async fn fetch_page<S: FeedStore>(
    store: &S,
    request: &PageRequest,
) -> Result<Vec<JobPosting>, StoreError> {
    match request {
        PageRequest::First { limit } => store.page_after(None, *limit).await,
        PageRequest::After { cursor, limit } => store.page_after(Some(*cursor), *limit).await,
        PageRequest::Resume { item_id, limit } => match store.posting(*item_id).await? {
            Some(anchor) => {
                let rest = store.page_after(Some(anchor.feed_key()), *limit).await?;
                let mut page = Vec::with_capacity(rest.len() + 1);
                page.push(anchor);
                page.extend(rest);
                Ok(page)
            }
            None => store.page_after(None, *limit).await,
        },
    }
}
