//! Resolves an incoming FUSE path to the view responsible for it.
//!
//! Mirrors `router.py::get_view`: a fixed, ordered route table, first-match-
//! wins, with the matched prefix used as an LRU cache key for previously
//! resolved views. `CommitView` and `HistoryView` additionally need a
//! snapshot of the commit cache, which the caller refreshes independently
//! (see [`Router::refresh_commit_cache`]).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use regex::Regex;

use gitfs_git::{GitOid, Repository};
use gitfs_lfs::LfsHook;

use crate::commit_cache::CommitCache;
use crate::error::CoreError;
use crate::ignore::CachedIgnore;
use crate::queue::CommitQueue;
use crate::sync_state::SyncState;
use crate::view_cache::ViewCache;
use crate::views::{CommitView, CurrentView, HistoryView, IndexView};

/// Which view a path resolved to, with the sub-path relative to that view's
/// own root (what the view itself should operate on).
pub enum Resolved {
    /// The synthetic root listing `current`/`history`.
    Index(Arc<IndexView>),
    /// A directory under `history`, not yet down to a specific commit.
    History { view: Arc<HistoryView>, relative: String },
    /// A specific historical commit's read-only tree.
    Commit { view: Arc<CommitView>, relative: String },
    /// The writable tip of the tracked branch.
    Current { view: Arc<CurrentView>, relative: String },
}

/// Normalize an incoming path per `router.py::get_view`: empty, all-
/// whitespace, or a single control character all become `/`.
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    if path.is_empty() {
        return "/";
    }
    if path.trim().is_empty() {
        return "/";
    }
    if path.chars().count() == 1 && path.chars().next().is_some_and(|c| c.is_control()) {
        return "/";
    }
    path
}

/// The route table and view cache. Owns the long-lived shared state
/// (`Repository`, ignore set, LFS hook, commit queue, sync state) and hands
/// out views built from it.
pub struct Router {
    current_path: String,
    history_path: String,
    current_is_root: bool,
    commit_route: Regex,
    date_route: Regex,
    history_route: Regex,
    current_route: Regex,

    repo: Arc<Repository>,
    commit_cache: parking_lot::RwLock<Arc<CommitCache>>,
    uid: u32,
    gid: u32,
    mount_time: i64,

    index_view: Arc<IndexView>,
    current_view: Arc<CurrentView>,
    history_cache: ViewCache<HistoryView>,
    commit_cache_views: ViewCache<CommitView>,

    idle: AtomicI64,
}

impl Router {
    /// Build the route table for the configured `current_path`/`history_path`.
    ///
    /// # Errors
    /// Returns an error only if the regex patterns fail to compile, which
    /// cannot happen for the fixed patterns here except via a malformed
    /// `current_path`/`history_path` containing regex metacharacters.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<Repository>,
        ignore: Arc<CachedIgnore>,
        lfs: Arc<dyn LfsHook>,
        queue: Arc<CommitQueue>,
        state: Arc<SyncState>,
        current_path: String,
        history_path: String,
        max_size: u64,
        uid: u32,
        gid: u32,
        mount_time: i64,
    ) -> Result<Self, CoreError> {
        let current_is_root = current_path == "/";
        let history_name = regex::escape(history_path.trim_start_matches('/'));
        let current_name = regex::escape(current_path.trim_start_matches('/'));

        let commit_route = Regex::new(&format!(
            r"^/{history_name}/(?P<date>\d{{4}}-\d{{1,2}}-\d{{1,2}})/(?P<time>\d{{2}}-\d{{2}}-\d{{2}})-(?P<commit>[0-9a-f]{{10}})"
        ))
        .map_err(|e| CoreError::InvalidArgument {
            message: format!("bad history_path for route regex: {e}"),
        })?;
        let date_route = Regex::new(&format!(r"^/{history_name}/(?P<date>\d{{4}}-\d{{1,2}}-\d{{1,2}})"))
            .map_err(|e| CoreError::InvalidArgument {
                message: format!("bad history_path for route regex: {e}"),
            })?;
        let history_route = Regex::new(&format!(r"^/{history_name}")).map_err(|e| CoreError::InvalidArgument {
            message: format!("bad history_path for route regex: {e}"),
        })?;
        let current_route = Regex::new(&format!(r"^/{current_name}")).map_err(|e| CoreError::InvalidArgument {
            message: format!("bad current_path for route regex: {e}"),
        })?;

        let index_view = Arc::new(IndexView::new(
            current_path.trim_start_matches('/').to_owned(),
            history_path.trim_start_matches('/').to_owned(),
            uid,
            gid,
            mount_time,
        ));
        let synthesized_root_entry =
            current_is_root.then(|| history_path.trim_start_matches('/').to_owned());
        let current_view = Arc::new(CurrentView::new(
            Arc::clone(&repo),
            ignore,
            lfs,
            queue,
            state,
            max_size,
            uid,
            gid,
            synthesized_root_entry,
        ));

        Ok(Self {
            current_path,
            history_path,
            current_is_root,
            commit_route,
            date_route,
            history_route,
            current_route,
            repo,
            commit_cache: parking_lot::RwLock::new(Arc::new(CommitCache::new())),
            uid,
            gid,
            mount_time,
            index_view,
            current_view,
            history_cache: ViewCache::new(crate::view_cache::DEFAULT_CAPACITY),
            commit_cache_views: ViewCache::new(crate::view_cache::DEFAULT_CAPACITY),
            idle: AtomicI64::new(1),
        })
    }

    /// Rebuild the commit cache from the current branch tip. Call after
    /// every successful fetch/merge so `history` reflects new commits.
    ///
    /// # Errors
    /// Returns an error if the branch tip or its history can't be read.
    pub fn refresh_commit_cache(&self, branch: &str) -> Result<(), CoreError> {
        let tip = self.repo.read_ref(&gitfs_git::RefName::branch(branch))?;
        let Some(tip) = tip else {
            return Ok(());
        };
        let mut cache = CommitCache::new();
        cache.update(&self.repo, tip)?;
        *self.commit_cache.write() = Arc::new(cache);
        Ok(())
    }

    /// Resolve `path` to the view responsible for it and the sub-path that
    /// view should operate on.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if a history date/commit segment
    /// doesn't resolve, or other errors from constructing a `CommitView`.
    pub fn resolve(&self, path: &str) -> Result<Resolved, CoreError> {
        self.idle.store(0, Ordering::SeqCst);
        let result = self.resolve_inner(path);
        self.idle.store(1, Ordering::SeqCst);
        result
    }

    /// Whether the router has processed no operation since the last call
    /// cleared this (used by `SyncWorker`'s idle heuristic in the original;
    /// GitFS tracks idleness primarily via [`SyncState`] instead, but this
    /// is kept for parity with `router.py`'s own idle-event toggling).
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.idle.load(Ordering::SeqCst) == 1
    }

    fn resolve_inner(&self, path: &str) -> Result<Resolved, CoreError> {
        let path = normalize_path(path);

        if let Some(caps) = self.commit_route.captures(path) {
            let whole = caps.get(0).expect("whole match").as_str();
            let date = caps.name("date").expect("date group").as_str().to_owned();
            let time = caps.name("time").expect("time group").as_str();
            let commit_id = caps.name("commit").expect("commit group").as_str();
            let dir_name = format!("{time}-{commit_id}");
            let relative = relative_after(path, whole);

            let cache_key = format!("/{}/{date}/{dir_name}", self.history_path.trim_start_matches('/'));
            if let Some(view) = self.commit_cache_views.get(&cache_key) {
                return Ok(Resolved::Commit { view, relative });
            }
            let snapshot = Arc::clone(&self.commit_cache.read());
            let commit = snapshot
                .find(&date, commit_id)
                .ok_or_else(|| CoreError::NotFound {
                    message: path.to_owned(),
                })?;
            let oid: GitOid = commit.oid;
            let view = Arc::new(CommitView::new(Arc::clone(&self.repo), oid, self.uid, self.gid)?);
            self.commit_cache_views.put(cache_key, Arc::clone(&view));
            return Ok(Resolved::Commit { view, relative });
        }

        if let Some(caps) = self.date_route.captures(path) {
            let whole = caps.get(0).expect("whole match").as_str();
            let date = caps.name("date").expect("date group").as_str().to_owned();
            let relative = relative_after(path, whole);
            let cache_key = format!("/{}/{date}", self.history_path.trim_start_matches('/'));
            if let Some(view) = self.history_cache.get(&cache_key) {
                return Ok(Resolved::History { view, relative });
            }
            let snapshot = Arc::clone(&self.commit_cache.read());
            let view = Arc::new(HistoryView::new(snapshot, self.uid, self.gid, self.mount_time));
            self.history_cache.put(cache_key, Arc::clone(&view));
            return Ok(Resolved::History { view, relative });
        }

        if let Some(m) = self.history_route.find(path) {
            let relative = relative_after(path, m.as_str());
            let cache_key = format!("/{}", self.history_path.trim_start_matches('/'));
            if let Some(view) = self.history_cache.get(&cache_key) {
                return Ok(Resolved::History { view, relative });
            }
            let snapshot = Arc::clone(&self.commit_cache.read());
            let view = Arc::new(HistoryView::new(snapshot, self.uid, self.gid, self.mount_time));
            self.history_cache.put(cache_key, Arc::clone(&view));
            return Ok(Resolved::History { view, relative });
        }

        if !self.current_is_root {
            if let Some(m) = self.current_route.find(path) {
                let relative = relative_after(path, m.as_str());
                return Ok(Resolved::Current {
                    view: Arc::clone(&self.current_view),
                    relative,
                });
            }
            if path == "/" {
                return Ok(Resolved::Index(Arc::clone(&self.index_view)));
            }
        } else if path == "/" || path.starts_with('/') {
            return Ok(Resolved::Current {
                view: Arc::clone(&self.current_view),
                relative: path.to_owned(),
            });
        }

        Err(CoreError::NoRoute { path: path.to_owned() })
    }

    /// Mount-configured path names, for constructing `readdir` results at
    /// the synthesized mount root.
    #[must_use]
    pub fn paths(&self) -> (&str, &str) {
        (&self.current_path, &self.history_path)
    }
}

fn relative_after(path: &str, matched: &str) -> String {
    let rest = &path[matched.len()..];
    if rest.is_empty() {
        "/".to_owned()
    } else {
        rest.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_empty_and_whitespace_become_root() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("   "), "/");
        assert_eq!(normalize_path("\0"), "/");
    }

    #[test]
    fn normalize_leaves_real_paths_alone() {
        assert_eq!(normalize_path("/current/foo"), "/current/foo");
    }

    #[test]
    fn relative_after_root_match_is_slash() {
        assert_eq!(relative_after("/current", "/current"), "/");
        assert_eq!(relative_after("/current/foo", "/current"), "/foo");
    }
}
