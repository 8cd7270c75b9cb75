//! Read-only snapshot of a single historical commit's tree.
//!
//! The router resolves `/<date>/<time>-<sha>` down to a commit OID via the
//! commit cache and hands the remaining sub-path to this view, which walks
//! the commit's tree object by object — no worktree checkout involved.

use std::sync::Arc;

use gitfs_git::{EntryMode, GitOid, Repository, TreeEntry};

use crate::error::CoreError;
use crate::views::passthrough::FileAttr;
use crate::views::readonly::read_only;

/// A read-only view fixed to one commit's tree. Owns an `Arc<Repository>`
/// rather than borrowing, so it can be cached in a
/// [`crate::view_cache::ViewCache`] the same way `CurrentView` is.
pub struct CommitView {
    repo: Arc<Repository>,
    tree_oid: GitOid,
    commit_time: i64,
    uid: u32,
    gid: u32,
}

impl CommitView {
    /// Build a view over the commit at `commit_oid`.
    ///
    /// # Errors
    /// Returns [`CoreError`] if the commit can't be read.
    pub fn new(repo: Arc<Repository>, commit_oid: GitOid, uid: u32, gid: u32) -> Result<Self, CoreError> {
        let info = repo.read_commit(commit_oid)?;
        Ok(Self {
            repo,
            tree_oid: info.tree_oid,
            commit_time: info.commit_time,
            uid,
            gid,
        })
    }

    fn segments(path: &str) -> Vec<&str> {
        path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Resolve `path` (relative to the commit root) to its tree entry, or
    /// `None` for the root itself.
    fn resolve(&self, path: &str) -> Result<Option<TreeEntry>, CoreError> {
        let segments = Self::segments(path);
        let mut current_tree = self.tree_oid;
        let mut entry = None;
        for (i, segment) in segments.iter().enumerate() {
            let entries = self.repo.read_tree(current_tree)?;
            let found = entries
                .into_iter()
                .find(|e| e.name == *segment)
                .ok_or_else(|| CoreError::NotFound {
                    message: path.to_owned(),
                })?;
            let is_last = i == segments.len() - 1;
            if !is_last {
                match found.mode {
                    EntryMode::Tree => current_tree = found.oid,
                    _ => {
                        return Err(CoreError::NotFound {
                            message: path.to_owned(),
                        })
                    }
                }
            }
            entry = Some(found);
        }
        Ok(entry)
    }

    /// Metadata for `path`: directory mode for trees, blob mode/size for
    /// files, derived times from the commit.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if `path` doesn't exist in this tree.
    pub fn getattr(&self, path: &str) -> Result<FileAttr, CoreError> {
        let entry = self.resolve(path)?;
        let (mode, size) = match entry {
            None => (libc::S_IFDIR | 0o555, 0),
            Some(e) => match e.mode {
                EntryMode::Tree => (libc::S_IFDIR | 0o555, 0),
                EntryMode::Link => (libc::S_IFLNK | 0o555, self.repo.read_blob(e.oid)?.len() as u64),
                EntryMode::BlobExecutable => (libc::S_IFREG | 0o555, self.repo.read_blob(e.oid)?.len() as u64),
                EntryMode::Blob | EntryMode::Commit => {
                    (libc::S_IFREG | 0o444, self.repo.read_blob(e.oid)?.len() as u64)
                }
            },
        };
        Ok(FileAttr {
            size,
            mode,
            nlink: 1,
            uid: self.uid,
            gid: self.gid,
            atime: self.commit_time,
            mtime: self.commit_time,
            ctime: self.commit_time,
        })
    }

    /// Tree entries under `path`.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if `path` is not a directory.
    pub fn readdir(&self, path: &str) -> Result<Vec<String>, CoreError> {
        let tree_oid = match self.resolve(path)? {
            None => self.tree_oid,
            Some(e) if matches!(e.mode, EntryMode::Tree) => e.oid,
            Some(_) => {
                return Err(CoreError::NotFound {
                    message: path.to_owned(),
                })
            }
        };
        let mut entries = vec![".".to_owned(), "..".to_owned()];
        entries.extend(self.repo.read_tree(tree_oid)?.into_iter().map(|e| e.name));
        Ok(entries)
    }

    /// Byte range of the blob at `path`.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if `path` is not a file.
    pub fn read(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>, CoreError> {
        let entry = self.resolve(path)?.ok_or_else(|| CoreError::NotFound {
            message: path.to_owned(),
        })?;
        if matches!(entry.mode, EntryMode::Tree) {
            return Err(CoreError::NotFound {
                message: path.to_owned(),
            });
        }
        let data = self.repo.read_blob(entry.oid)?;
        let start = (offset as usize).min(data.len());
        let end = (start + len).min(data.len());
        Ok(data[start..end].to_vec())
    }

    /// Every mutating operation against a commit snapshot fails `EROFS`.
    ///
    /// # Errors
    /// Always returns [`CoreError::ReadOnly`].
    pub fn write(&self, path: &str) -> Result<(), CoreError> {
        Err(read_only(path))
    }
}
