//! Resume-point records and the local/remote reconciliation rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{PostingId, UserId};

/// Where a user left off in the feed.
///
/// The same shape is stored in the local cache and in the remote document
/// store; at most one record exists per user in each location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: UserId,
    /// Item that was on screen.
    pub item_id: PostingId,
    /// Position of that item in the session it was saved from.
    pub index: usize,
    /// Ordering key of the item, kept for cursor seeding.
    #[serde(default)]
    pub item_created_at: Option<DateTime<Utc>>,
    /// Write time in epoch milliseconds. Older data without it reads as 0.
    #[serde(default)]
    pub timestamp: i64,
}

impl ProgressRecord {
    pub fn new(
        user_id: UserId,
        item_id: PostingId,
        index: usize,
        item_created_at: Option<DateTime<Utc>>,
        timestamp: i64,
    ) -> Self {
        Self {
            user_id,
            item_id,
            index,
            item_created_at,
            timestamp,
        }
    }
}

/// Outcome of comparing the local and remote progress records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Record to resume from; `None` means start at index 0.
    pub resume: Option<ProgressRecord>,
    /// The local store lost and must be overwritten with `resume`.
    pub sync_local: bool,
}

impl Reconciliation {
    pub fn fresh_start() -> Self {
        Self {
            resume: None,
            sync_local: false,
        }
    }
}

/// Pick the record to resume from.
///
/// Remote wins only when strictly newer; ties go to local.
pub fn reconcile(local: Option<ProgressRecord>, remote: Option<ProgressRecord>) -> Reconciliation {
    match (local, remote) {
        (None, None) => Reconciliation::fresh_start(),
        (Some(local), None) => Reconciliation {
            resume: Some(local),
            sync_local: false,
        },
        (None, Some(remote)) => Reconciliation {
            resume: Some(remote),
            sync_local: true,
        },
        (Some(local), Some(remote)) => {
            if remote.timestamp > local.timestamp {
                Reconciliation {
                    resume: Some(remote),
                    sync_local: true,
                }
            } else {
                Reconciliation {
                    resume: Some(local),
                    sync_local: false,
                }
            }
        }
    }
}

/// Monotonic millisecond clock for progress writes.
///
/// Wall clocks can step backwards; a save must never carry a timestamp older
/// than the previous one from the same controller.
#[derive(Debug, Clone, Default)]
pub struct ProgressClock {
    last: i64,
}

impl ProgressClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next timestamp: wall clock, bumped past the previous stamp if needed.
    pub fn stamp(&mut self) -> i64 {
        self.stamp_at(Utc::now().timestamp_millis())
    }

    pub fn stamp_at(&mut self, now_ms: i64) -> i64 {
        let next = if now_ms > self.last { now_ms } else { self.last + 1 };
        self.last = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(item: PostingId, index: usize, timestamp: i64) -> ProgressRecord {
        ProgressRecord::new(UserId::parse("u1").unwrap(), item, index, None, timestamp)
    }

    #[test]
    fn newer_remote_wins_and_flags_sync() {
        let a = PostingId::new();
        let b = PostingId::new();
        let out = reconcile(Some(record(a, 10, 1000)), Some(record(b, 25, 2000)));

        let resume = out.resume.unwrap();
        assert_eq!(resume.item_id, b);
        assert_eq!(resume.index, 25);
        assert!(out.sync_local);
    }

    #[test]
    fn tie_goes_to_local() {
        let a = PostingId::new();
        let b = PostingId::new();
        let out = reconcile(Some(record(a, 3, 500)), Some(record(b, 7, 500)));
        assert_eq!(out.resume.unwrap().item_id, a);
        assert!(!out.sync_local);
    }

    #[test]
    fn single_sides() {
        let a = PostingId::new();
        assert_eq!(reconcile(None, None), Reconciliation::fresh_start());

        let local_only = reconcile(Some(record(a, 1, 1)), None);
        assert!(!local_only.sync_local);
        assert_eq!(local_only.resume.unwrap().index, 1);

        let remote_only = reconcile(None, Some(record(a, 2, 1)));
        assert!(remote_only.sync_local);
        assert_eq!(remote_only.resume.unwrap().index, 2);
    }

    #[test]
    fn missing_timestamp_reads_as_zero() {
        let json = format!(
            r#"{{"user_id":"u1","item_id":"{}","index":4}}"#,
            PostingId::new()
        );
        let parsed: ProgressRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.timestamp, 0);
        assert_eq!(parsed.item_created_at, None);
    }

    #[test]
    fn clock_never_goes_backwards() {
        let mut clock = ProgressClock::new();
        assert_eq!(clock.stamp_at(100), 100);
        assert_eq!(clock.stamp_at(90), 101);
        assert_eq!(clock.stamp_at(101), 102);
        assert_eq!(clock.stamp_at(500), 500);
    }

    proptest! {
        #[test]
        fn remote_wins_iff_strictly_newer(
            local_ts in proptest::option::of(0i64..10_000),
            remote_ts in proptest::option::of(0i64..10_000),
        ) {
            let local_id = PostingId::new();
            let remote_id = PostingId::new();
            let local = local_ts.map(|t| record(local_id, 1, t));
            let remote = remote_ts.map(|t| record(remote_id, 2, t));
            let out = reconcile(local, remote);

            match (local_ts, remote_ts) {
                (None, None) => {
                    prop_assert!(out.resume.is_none());
                    prop_assert!(!out.sync_local);
                }
                (Some(_), None) => {
                    prop_assert_eq!(out.resume.map(|r| r.item_id), Some(local_id));
                    prop_assert!(!out.sync_local);
                }
                (None, Some(_)) => {
                    prop_assert_eq!(out.resume.map(|r| r.item_id), Some(remote_id));
                    prop_assert!(out.sync_local);
                }
                (Some(l), Some(r)) => {
                    let remote_wins = r > l;
                    let expected = if remote_wins { remote_id } else { local_id };
                    prop_assert_eq!(out.resume.map(|r| r.item_id), Some(expected));
                    prop_assert_eq!(out.sync_local, remote_wins);
                }
            }
        }
    }
}
