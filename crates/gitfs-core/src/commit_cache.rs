//! Date-bucketed commit history cache backing `HistoryView`.
//!
//! Mirrors the original `CommitCache`: walk history from the tip, bucket
//! each commit under its committer date (`YYYY-MM-DD`), and within a bucket
//! keep commits sorted by timestamp so `readdir` doesn't need to re-sort.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use gitfs_git::{GitOid, Repository};

use crate::error::CoreError;

/// A single commit's cache entry: its short id and time-of-day, used to
/// build the `HH-MM-SS-<10hex>` directory name in a date bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedCommit {
    /// Full OID, needed to check out the commit's tree.
    pub oid: GitOid,
    /// `HH-MM-SS`, local to the commit's own timezone-naive timestamp (UTC
    /// here, since GitFS doesn't special-case timezones).
    pub time: String,
    /// Seconds since the Unix epoch, used for sort order within a bucket.
    pub timestamp: i64,
}

impl CachedCommit {
    /// The directory name this commit gets within its date bucket:
    /// `HH-MM-SS-<10 hex chars of the commit oid>`.
    #[must_use]
    pub fn dir_name(&self) -> String {
        format!("{}-{}", self.time, self.oid.short())
    }
}

/// Date-bucketed, time-sorted view of a repository's commit history.
#[derive(Clone, Default)]
pub struct CommitCache {
    /// `YYYY-MM-DD` -> commits on that date, sorted ascending by timestamp.
    buckets: BTreeMap<String, Vec<CachedCommit>>,
}

impl CommitCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the cache by walking history from `tip`.
    ///
    /// # Errors
    /// Returns [`CoreError`] if a commit in the walked history can't be read.
    pub fn update(&mut self, repo: &Repository, tip: GitOid) -> Result<(), CoreError> {
        self.buckets.clear();
        repo.walk(tip, |oid, info| {
            let date = DateTime::<Utc>::from_timestamp(info.commit_time, 0)
                .unwrap_or_default();
            let bucket_key = date.format("%Y-%m-%d").to_string();
            let commit = CachedCommit {
                oid,
                time: date.format("%H-%M-%S").to_string(),
                timestamp: info.commit_time,
            };
            let bucket = self.buckets.entry(bucket_key).or_default();
            let insert_at = bucket
                .binary_search_by_key(&commit.timestamp, |c| c.timestamp)
                .unwrap_or_else(|i| i);
            bucket.insert(insert_at, commit);
            true
        })?;
        Ok(())
    }

    /// All date buckets, oldest first (e.g., for `readdir` on `/history`).
    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    /// The commits within a given date bucket, oldest first.
    #[must_use]
    pub fn commits_on(&self, date: &str) -> Option<&[CachedCommit]> {
        self.buckets.get(date).map(Vec::as_slice)
    }

    /// Find the commit matching a specific date + short-id pair.
    #[must_use]
    pub fn find(&self, date: &str, short_oid: &str) -> Option<&CachedCommit> {
        self.buckets
            .get(date)?
            .iter()
            .find(|c| c.oid.short() == short_oid)
    }

    /// Total number of cached commits across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Whether the cache holds no commits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(ts: i64, short_tag: u8) -> CachedCommit {
        let mut bytes = [0u8; 20];
        bytes[0] = short_tag;
        CachedCommit {
            oid: GitOid::from_bytes(bytes),
            time: "00-00-00".into(),
            timestamp: ts,
        }
    }

    #[test]
    fn dir_name_combines_time_and_short_oid() {
        let c = commit(0, 0xab);
        assert!(c.dir_name().starts_with("00-00-00-"));
    }

    #[test]
    fn empty_cache_has_no_dates() {
        let cache = CommitCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.dates().count(), 0);
    }
}
