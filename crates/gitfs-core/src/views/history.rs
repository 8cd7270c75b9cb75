//! Read-only, date-bucketed listing of repository history.
//!
//! Handles exactly the directory levels above an individual commit's tree:
//! the history root (date buckets) and a single date bucket (commit
//! entries). Paths one level deeper belong to [`super::commit::CommitView`];
//! the router, not this view, is responsible for handing those off.

use std::sync::Arc;

use crate::commit_cache::CommitCache;
use crate::error::CoreError;
use crate::views::passthrough::FileAttr;
use crate::views::readonly::read_only;

/// Read-only view over a [`CommitCache`] snapshot, rooted at the mount's
/// `history` path. Owns an immutable `Arc` snapshot rather than borrowing
/// the live cache, so it can be cached in a [`crate::view_cache::ViewCache`]
/// the same way `CurrentView` is.
pub struct HistoryView {
    cache: Arc<CommitCache>,
    uid: u32,
    gid: u32,
    mount_time: i64,
}

impl HistoryView {
    /// Build a view over a snapshot of `cache`.
    #[must_use]
    pub fn new(cache: Arc<CommitCache>, uid: u32, gid: u32, mount_time: i64) -> Self {
        Self {
            cache,
            uid,
            gid,
            mount_time,
        }
    }

    fn segments(path: &str) -> Vec<&str> {
        path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect()
    }

    fn dir_attr(&self, ctime: i64) -> FileAttr {
        FileAttr {
            size: 0,
            mode: libc::S_IFDIR | 0o555,
            nlink: 2,
            uid: self.uid,
            gid: self.gid,
            atime: ctime,
            mtime: ctime,
            ctime,
        }
    }

    /// Directory metadata for the history root, a date bucket, or a single
    /// commit entry.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if the date or commit isn't cached.
    pub fn getattr(&self, path: &str) -> Result<FileAttr, CoreError> {
        let segments = Self::segments(path);
        match segments.as_slice() {
            [] => {
                let newest = self
                    .cache
                    .dates()
                    .next_back()
                    .and_then(|d| self.cache.commits_on(d))
                    .and_then(|c| c.last())
                    .map_or(self.mount_time, |c| c.timestamp);
                Ok(self.dir_attr(newest))
            }
            [date] => {
                let commits = self.cache.commits_on(date).ok_or_else(|| CoreError::NotFound {
                    message: path.to_owned(),
                })?;
                let newest = commits.last().map_or(self.mount_time, |c| c.timestamp);
                Ok(self.dir_attr(newest))
            }
            [date, commit_dir] => {
                let (_, id) = commit_dir
                    .rsplit_once('-')
                    .ok_or_else(|| CoreError::NotFound {
                        message: path.to_owned(),
                    })?;
                let found = self.cache.find(date, id).ok_or_else(|| CoreError::NotFound {
                    message: path.to_owned(),
                })?;
                Ok(self.dir_attr(found.timestamp))
            }
            _ => Err(CoreError::NotFound {
                message: path.to_owned(),
            }),
        }
    }

    /// Directory listing for the history root or a date bucket.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if `path` names neither.
    pub fn readdir(&self, path: &str) -> Result<Vec<String>, CoreError> {
        let segments = Self::segments(path);
        let mut entries = vec![".".to_owned(), "..".to_owned()];
        match segments.as_slice() {
            [] => {
                entries.extend(self.cache.dates().map(str::to_owned));
                Ok(entries)
            }
            [date] => {
                let commits = self.cache.commits_on(date).ok_or_else(|| CoreError::NotFound {
                    message: path.to_owned(),
                })?;
                entries.extend(commits.iter().map(super::super::commit_cache::CachedCommit::dir_name));
                Ok(entries)
            }
            _ => Err(CoreError::NotFound {
                message: path.to_owned(),
            }),
        }
    }

    /// Every mutating operation under history fails `EROFS`.
    ///
    /// # Errors
    /// Always returns [`CoreError::ReadOnly`].
    pub fn write(&self, path: &str) -> Result<(), CoreError> {
        Err(read_only(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitfs_git::GitOid;

    fn cache_with_one_commit() -> CommitCache {
        // CommitCache has no public constructor that inserts directly; these
        // unit tests exercise the view's path parsing against an empty
        // cache, leaving walk-populated behavior to the integration tests
        // built on a real repository.
        CommitCache::new()
    }

    #[test]
    fn root_of_empty_cache_uses_mount_time() {
        let cache = cache_with_one_commit();
        let view = HistoryView::new(Arc::new(cache), 1000, 1000, 42);
        let attr = view.getattr("/").unwrap();
        assert_eq!(attr.ctime, 42);
        assert_eq!(attr.mode, libc::S_IFDIR | 0o555);
    }

    #[test]
    fn unknown_date_is_not_found() {
        let cache = cache_with_one_commit();
        let view = HistoryView::new(Arc::new(cache), 1000, 1000, 0);
        assert!(view.getattr("/2099-01-01").is_err());
    }

    #[test]
    fn readdir_root_starts_with_dot_entries() {
        let cache = cache_with_one_commit();
        let view = HistoryView::new(Arc::new(cache), 1000, 1000, 0);
        let entries = view.readdir("/").unwrap();
        assert_eq!(&entries[..2], &[".".to_string(), "..".to_string()]);
    }

    #[test]
    fn write_is_read_only() {
        let cache = cache_with_one_commit();
        let view = HistoryView::new(Arc::new(cache), 1000, 1000, 0);
        assert!(matches!(view.write("/2099-01-01"), Err(CoreError::ReadOnly { .. })));
        let _ = GitOid::ZERO;
    }
}
