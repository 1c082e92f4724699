//! Per-user saved and dismissed posting sets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::PostingId;

/// Postings the user bookmarked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedSet(BTreeSet<PostingId>);

impl SavedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &PostingId) -> bool {
        self.0.contains(id)
    }

    /// Flip membership of `id`. Returns whether it is saved afterwards.
    pub fn toggle(&mut self, id: PostingId) -> bool {
        if self.0.remove(&id) {
            false
        } else {
            self.0.insert(id);
            true
        }
    }

    /// Force membership of `id` to `saved`.
    pub fn set(&mut self, id: PostingId, saved: bool) {
        if saved {
            self.0.insert(id);
        } else {
            self.0.remove(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PostingId> {
        self.0.iter()
    }
}

impl FromIterator<PostingId> for SavedSet {
    fn from_iter<T: IntoIterator<Item = PostingId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Postings the user swiped past or rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DismissedSet(BTreeSet<PostingId>);

impl DismissedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &PostingId) -> bool {
        self.0.contains(id)
    }

    /// Add `id`. Returns `false` if it was already dismissed.
    pub fn insert(&mut self, id: PostingId) -> bool {
        self.0.insert(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PostingId> {
        self.0.iter()
    }
}

impl FromIterator<PostingId> for DismissedSet {
    fn from_iter<T: IntoIterator<Item = PostingId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn dismiss_is_idempotent() {
        let id = PostingId::new();
        let mut dismissed = DismissedSet::new();
        assert!(dismissed.insert(id));
        assert!(!dismissed.insert(id));
        assert_eq!(dismissed.len(), 1);
        assert_eq!(dismissed.iter().filter(|d| **d == id).count(), 1);
    }

    #[test]
    fn serializes_as_plain_list() {
        let id = PostingId::new();
        let saved: SavedSet = [id].into_iter().collect();
        let json = serde_json::to_string(&saved).unwrap();
        assert_eq!(json, format!("[\"{id}\"]"));
    }

    proptest! {
        #[test]
        fn toggle_twice_is_identity(existing in 0usize..8, pick in 0usize..16) {
            let pool: Vec<PostingId> = (0..16).map(|_| PostingId::new()).collect();
            let original: SavedSet = pool.iter().take(existing).copied().collect();
            let target = pool[pick];

            let mut saved = original.clone();
            let first = saved.toggle(target);
            let second = saved.toggle(target);

            prop_assert_ne!(first, second);
            prop_assert_eq!(saved, original);
        }
    }
}
