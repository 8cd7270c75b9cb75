//! The [`Repository`] facade — the single entry point GitFS views use to talk to git.
//!
//! Local, object-level operations (reading/writing blobs, trees, commits,
//! refs, the index, and checkout) go through gix. Operations that require
//! talking to a remote (clone, fetch, push) shell out to the `git` CLI — see
//! [`crate::network`] for why.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use crate::credentials::Credentials;
use crate::error::GitError;
use crate::types::*;

/// An open git repository, backed by gix for local object access.
pub struct Repository {
    pub(crate) repo: gix::Repository,
    /// The working directory (checkout target), if this is not a bare repo.
    pub(crate) workdir: PathBuf,
    /// Filesystem path to the `.git` directory's parent (the repo root).
    pub(crate) repo_path: PathBuf,
    /// Credentials used for network operations against the configured remote.
    pub(crate) credentials: Credentials,
    /// Set by [`Repository::fetch`] when the local tip is behind the remote
    /// tip; cleared once [`Repository::checkout_head`] or a successful merge
    /// catches up. Read by `SyncWorker` to decide whether a merge is needed
    /// before pushing.
    pub(crate) behind: AtomicBool,
}

impl Repository {
    /// Open an already-cloned repository at `repo_path`, using `repo_path`
    /// itself as the worktree.
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] if `repo_path` is not a git repository.
    pub fn open(repo_path: impl Into<PathBuf>, credentials: Credentials) -> Result<Self, GitError> {
        let repo_path = repo_path.into();
        let repo = gix::open(&repo_path).map_err(|e| GitError::BackendError {
            message: format!("failed to open repository at {}: {e}", repo_path.display()),
        })?;
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| repo_path.clone());
        Ok(Self {
            repo,
            workdir,
            repo_path,
            credentials,
            behind: AtomicBool::new(false),
        })
    }

    /// Clone `remote_url` into `repo_path` on the given `branch`, then open it.
    ///
    /// Delegates to the `git` CLI — see [`crate::network::clone`].
    ///
    /// # Errors
    /// Returns [`GitError::CloneFailed`] if the clone subprocess fails.
    pub fn clone(
        remote_url: &str,
        repo_path: impl Into<PathBuf>,
        branch: &str,
        credentials: Credentials,
    ) -> Result<Self, GitError> {
        let repo_path = repo_path.into();
        crate::network::clone(remote_url, &repo_path, branch, &credentials)?;
        Self::open(repo_path, credentials)
    }

    /// The repository's working directory.
    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// The repository root path (parent of `.git`).
    #[must_use]
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Join `path` (a slash-separated path relative to the repo root) onto
    /// the worktree root, for passthrough filesystem calls.
    #[must_use]
    pub fn full_path(&self, path: &str) -> PathBuf {
        let path = path.strip_prefix('/').unwrap_or(path);
        self.workdir.join(path)
    }

    /// Fetch from `remote` into the remote-tracking branch for `branch`.
    ///
    /// Sets the internal "behind" flag if the remote tip differs from the
    /// local tip afterward.
    ///
    /// # Errors
    /// Returns [`GitError::FetchFailed`] if the fetch subprocess fails.
    pub fn fetch(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        crate::network::fetch(&self.repo_path, remote, branch, &self.credentials)?;
        let local = self.rev_parse_opt("HEAD")?;
        let remote_ref = RefName::remote_branch(remote, branch);
        let tracking = self.read_ref(&remote_ref)?;
        let behind = matches!((local, tracking), (Some(l), Some(r)) if l != r);
        self.behind
            .store(behind, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    /// Push `branch` to `remote`.
    ///
    /// # Errors
    /// Returns [`GitError::PushFailed`] if the push subprocess fails or is rejected.
    pub fn push(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        crate::network::push(&self.repo_path, remote, branch, &self.credentials)
    }

    /// The branch currently checked out, for discovering the remote's
    /// default branch name after an unpinned clone.
    ///
    /// # Errors
    /// Returns [`GitError::CliFailed`] if HEAD isn't a branch (detached).
    pub fn current_branch(&self) -> Result<String, GitError> {
        crate::network::current_branch(&self.repo_path)
    }

    /// Number of commits the local `branch` is ahead of `remote`'s tracking branch.
    ///
    /// Computed locally via gix, without touching the network.
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] if history traversal fails.
    pub fn ahead(&self, remote: &str, branch: &str) -> Result<usize, GitError> {
        let local = match self.rev_parse_opt(&format!("refs/heads/{branch}"))? {
            Some(oid) => oid,
            None => return Ok(0),
        };
        let remote_ref = RefName::remote_branch(remote, branch);
        let Some(remote_tip) = self.read_ref(&remote_ref)? else {
            // No remote-tracking ref yet: everything local is "ahead".
            return self.count_commits(local);
        };
        if local == remote_tip {
            return Ok(0);
        }
        self.count_commits_since(local, remote_tip)
    }

    /// Whether the last [`Repository::fetch`] observed the remote tip diverge
    /// from the local tip.
    #[must_use]
    pub fn behind(&self) -> bool {
        self.behind.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn count_commits(&self, tip: GitOid) -> Result<usize, GitError> {
        let mut n = 0;
        let mut cursor = Some(tip);
        while let Some(oid) = cursor {
            n += 1;
            let info = self.read_commit(oid)?;
            cursor = info.parents.first().copied();
        }
        Ok(n)
    }

    fn count_commits_since(&self, tip: GitOid, stop_at: GitOid) -> Result<usize, GitError> {
        let mut n = 0;
        let mut cursor = Some(tip);
        while let Some(oid) = cursor {
            if oid == stop_at {
                break;
            }
            n += 1;
            let info = self.read_commit(oid)?;
            cursor = info.parents.first().copied();
        }
        Ok(n)
    }

    /// Commit the current index as a new commit on `update_ref`, returning its OID.
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] on I/O or encoding failure.
    pub fn commit(
        &self,
        message: &str,
        author: &Signature,
        committer: &Signature,
        update_ref: &RefName,
    ) -> Result<GitOid, GitError> {
        let entries = self.read_index()?;
        let edits: Vec<TreeEdit> = entries
            .into_iter()
            .map(|e| TreeEdit::Upsert {
                path: e.path,
                mode: e.mode,
                oid: e.oid,
            })
            .collect();
        let empty_tree = self.write_tree(&[])?;
        let tree_oid = self.edit_tree(empty_tree, &edits)?;
        let parent = self.read_ref(update_ref)?;
        let parents = parent.into_iter().collect::<Vec<_>>();
        crate::objects_impl::create_commit(
            self,
            tree_oid,
            &parents,
            message,
            author,
            committer,
            Some(update_ref),
        )
    }

    /// Check out `oid` (a commit or tree) into `workdir`, replacing its contents.
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] if checkout fails.
    pub fn checkout_head(&self, oid: GitOid) -> Result<(), GitError> {
        crate::checkout_impl::checkout_tree(self, oid, &self.workdir)
    }

    /// Check out `oid` into an arbitrary directory (used for `history` views).
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] if checkout fails.
    pub fn checkout_into(&self, oid: GitOid, dest: &Path) -> Result<(), GitError> {
        crate::checkout_impl::checkout_tree(self, oid, dest)
    }

    /// Create or force-update `name` to point at `target`.
    ///
    /// # Errors
    /// Returns [`GitError::RefConflict`] if `force` is false and the ref already exists.
    pub fn create_reference(
        &self,
        name: &RefName,
        target: GitOid,
        force: bool,
    ) -> Result<(), GitError> {
        crate::refs_impl::create_reference(self, name, target, force)
    }

    /// Resolve `spec` (a ref name, `HEAD`, or short/long hex OID) to its OID.
    ///
    /// # Errors
    /// Returns [`GitError::NotFound`] if the revision does not resolve.
    pub fn rev_parse(&self, spec: &str) -> Result<GitOid, GitError> {
        crate::refs_impl::rev_parse(self, spec)
    }

    /// Like [`Repository::rev_parse`] but returns `None` instead of erroring
    /// when the revision does not resolve.
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] on unexpected backend failure.
    pub fn rev_parse_opt(&self, spec: &str) -> Result<Option<GitOid>, GitError> {
        crate::refs_impl::rev_parse_opt(self, spec)
    }

    /// Read the OID a ref currently points to, or `None` if it doesn't exist.
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] on unexpected backend failure.
    pub fn read_ref(&self, name: &RefName) -> Result<Option<GitOid>, GitError> {
        crate::refs_impl::read_ref(self, name)
    }

    /// List all refs with the given prefix (e.g., `"refs/heads/"`).
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] on unexpected backend failure.
    pub fn list_refs(&self, prefix: &str) -> Result<Vec<(RefName, GitOid)>, GitError> {
        crate::refs_impl::list_refs(self, prefix)
    }

    /// Atomically apply a set of ref updates (compare-and-swap).
    ///
    /// # Errors
    /// Returns [`GitError::RefConflict`] if any edit's expected old OID doesn't match.
    pub fn atomic_ref_update(&self, edits: &[RefEdit]) -> Result<(), GitError> {
        crate::refs_impl::atomic_ref_update(self, edits)
    }

    /// Whether `ancestor` is an ancestor of (or equal to) `descendant`.
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] if history traversal fails.
    pub fn is_ancestor(&self, ancestor: GitOid, descendant: GitOid) -> Result<bool, GitError> {
        crate::refs_impl::is_ancestor(self, ancestor, descendant)
    }

    /// The best common ancestor of `a` and `b`, or `None` if they share no history.
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] if history traversal fails.
    pub fn merge_base(&self, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError> {
        crate::refs_impl::merge_base(self, a, b)
    }

    /// Read a blob's raw content.
    ///
    /// # Errors
    /// Returns [`GitError::NotFound`] if `oid` does not name a blob.
    pub fn read_blob(&self, oid: GitOid) -> Result<Vec<u8>, GitError> {
        crate::objects_impl::read_blob(self, oid)
    }

    /// Read a tree's entries.
    ///
    /// # Errors
    /// Returns [`GitError::NotFound`] if `oid` does not name a tree.
    pub fn read_tree(&self, oid: GitOid) -> Result<Vec<TreeEntry>, GitError> {
        crate::objects_impl::read_tree(self, oid)
    }

    /// Read a commit's metadata.
    ///
    /// # Errors
    /// Returns [`GitError::NotFound`] if `oid` does not name a commit.
    pub fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError> {
        crate::objects_impl::read_commit(self, oid)
    }

    /// Write a blob and return its OID.
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] on write failure.
    pub fn write_blob(&self, data: &[u8]) -> Result<GitOid, GitError> {
        crate::objects_impl::write_blob(self, data)
    }

    /// Write a tree from a flat entry list and return its OID.
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] on write failure.
    pub fn write_tree(&self, entries: &[TreeEntry]) -> Result<GitOid, GitError> {
        crate::objects_impl::write_tree(self, entries)
    }

    /// Apply `edits` to the tree at `base`, writing new tree objects as needed,
    /// and return the resulting tree's OID.
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] on write failure.
    pub fn edit_tree(&self, base: GitOid, edits: &[TreeEdit]) -> Result<GitOid, GitError> {
        crate::objects_impl::edit_tree(self, base, edits)
    }

    /// Create a commit object directly (without going through the index).
    ///
    /// Used by the accept-mine merge strategy to replay commits with an
    /// explicit parent list.
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] on write failure.
    pub fn create_commit(
        &self,
        tree: GitOid,
        parents: &[GitOid],
        message: &str,
        author: &Signature,
        committer: &Signature,
        update_ref: Option<&RefName>,
    ) -> Result<GitOid, GitError> {
        crate::objects_impl::create_commit(self, tree, parents, message, author, committer, update_ref)
    }

    /// Read all entries currently in the index (staging area).
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] if the index cannot be read.
    pub fn read_index(&self) -> Result<Vec<IndexEntry>, GitError> {
        crate::checkout_impl::read_index(self)
    }

    /// Overwrite the index with exactly `entries`.
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] if the index cannot be written.
    pub fn write_index(&self, entries: &[IndexEntry]) -> Result<(), GitError> {
        crate::checkout_impl::write_index(self, entries)
    }

    /// Stage `path` from the worktree into the index (adds or updates).
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] on I/O or write failure.
    pub fn index_add(&self, path: &str) -> Result<(), GitError> {
        crate::index_impl::add_to_index(self, path)
    }

    /// Remove `path` from the index.
    ///
    /// `stage` selects a specific conflict stage (1 = base, 2 = ours, 3 =
    /// theirs) when resolving a merge conflict; `None` removes the regular
    /// (stage 0) entry.
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] on write failure.
    pub fn index_remove(&self, path: &str, stage: Option<u8>) -> Result<(), GitError> {
        crate::index_impl::remove_from_index(self, path, stage)
    }

    /// Reset the index to exactly match HEAD's tree, discarding all staged changes.
    ///
    /// # Errors
    /// Returns [`GitError::BackendError`] if HEAD cannot be resolved or the index written.
    pub fn unstage_all(&self) -> Result<(), GitError> {
        crate::index_impl::unstage_all(self)
    }

    /// Walk commit history starting at `tip`, oldest-parent-first, calling
    /// `visit` with each commit's OID and metadata. Stops early if `visit`
    /// returns `false`.
    ///
    /// # Errors
    /// Returns [`GitError::NotFound`] if `tip` cannot be read.
    pub fn walk(
        &self,
        tip: GitOid,
        mut visit: impl FnMut(GitOid, &CommitInfo) -> bool,
    ) -> Result<(), GitError> {
        let mut cursor = Some(tip);
        while let Some(oid) = cursor {
            let info = self.read_commit(oid)?;
            let keep_going = visit(oid, &info);
            if !keep_going {
                break;
            }
            cursor = info.parents.first().copied();
        }
        Ok(())
    }
}
