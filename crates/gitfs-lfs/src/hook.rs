//! LFS hook interface used by the `current` view when staging files, plus
//! the concrete local implementation backed by [`LfsStore`] and the `git
//! lfs` CLI.

use std::path::{Path, PathBuf};
use std::process::Command;

use sha2::Digest;

use crate::error::LfsError;
use crate::pointer::LfsPointer;
use crate::store::LfsStore;

/// The interface the `current` view's staging code uses to decide whether a
/// file should be LFS-backed, and to materialize/read pointer objects.
///
/// Kept as a trait (rather than calling [`GitLfs`] directly) so tests can
/// substitute a hook that always or never uses LFS without touching the
/// filesystem.
pub trait LfsHook: Send + Sync {
    /// Whether `path` (with the given content size in bytes) should be
    /// stored as an LFS pointer rather than directly in git.
    fn should_use_lfs(&self, path: &str, content_size: u64) -> bool;

    /// Store `data` as the LFS object named by `oid` and return the pointer
    /// file bytes to write into git in its place.
    ///
    /// # Errors
    /// Returns [`LfsError`] on local storage failure.
    fn store_and_pointer(&self, data: &[u8]) -> Result<Vec<u8>, LfsError>;

    /// Read back the real content behind a pointer, if it's stored locally.
    ///
    /// # Errors
    /// Returns [`LfsError::ObjectNotFound`] if the object hasn't been
    /// fetched yet.
    fn resolve_pointer(&self, pointer: &LfsPointer) -> Result<Vec<u8>, LfsError>;
}

/// Local, file-backed LFS support: size-threshold and `.gitattributes`-based
/// detection, a content-addressed object store, and `git lfs fetch`/`push`
/// CLI subprocess calls for the network side (the original project never
/// talks to the LFS batch API directly either).
pub struct GitLfs {
    repo_path: PathBuf,
    store: LfsStore,
    /// LFS is disabled entirely when `false` — every file is stored as a
    /// regular blob regardless of size or `.gitattributes`.
    pub enabled: bool,
    /// Files at or above this size (bytes) are LFS candidates even without a
    /// matching `.gitattributes` rule.
    pub size_threshold: u64,
    /// Whether `FetchWorker` should run `git lfs fetch` after every git fetch.
    pub auto_fetch: bool,
    /// Whether `SyncWorker` should run `git lfs push` after every git push.
    pub auto_push: bool,
}

/// Default size threshold: 100 MB, matching the original mount tool's default.
pub const DEFAULT_SIZE_THRESHOLD: u64 = 100 * 1024 * 1024;

impl GitLfs {
    /// Build a new `GitLfs` for the repository at `repo_path`.
    #[must_use]
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        let repo_path = repo_path.into();
        Self {
            store: LfsStore::new(&repo_path),
            repo_path,
            enabled: true,
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            auto_fetch: true,
            auto_push: true,
        }
    }

    /// Scan `.gitattributes` at the repo root for paths tracked by LFS
    /// (lines containing `filter=lfs`), returning the raw glob patterns.
    #[must_use]
    pub fn tracked_patterns(&self) -> Vec<String> {
        let path = self.repo_path.join(".gitattributes");
        let Ok(content) = std::fs::read_to_string(path) else {
            return Vec::new();
        };
        content
            .lines()
            .filter(|line| line.contains(" filter=lfs "))
            .filter_map(|line| line.split_whitespace().next())
            .map(str::to_owned)
            .collect()
    }

    /// Whether `git check-attr filter` reports `lfs` for `path`.
    fn attribute_says_lfs(&self, path: &str) -> bool {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_path)
            .args(["check-attr", "filter", path])
            .output();
        match output {
            Ok(out) => String::from_utf8_lossy(&out.stdout).contains("lfs"),
            Err(_) => false,
        }
    }

    /// Run `git lfs fetch --all origin` in the repository.
    ///
    /// # Errors
    /// Returns [`LfsError::CliFailed`] if the subprocess fails.
    pub fn fetch_objects(&self) -> Result<(), LfsError> {
        run_lfs(&self.repo_path, &["fetch", "--all", "origin"])
    }

    /// Run `git lfs push --all origin` in the repository.
    ///
    /// # Errors
    /// Returns [`LfsError::CliFailed`] if the subprocess fails.
    pub fn push_objects(&self) -> Result<(), LfsError> {
        run_lfs(&self.repo_path, &["push", "--all", "origin"])
    }
}

fn run_lfs(repo_path: &Path, args: &[&str]) -> Result<(), LfsError> {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(repo_path).arg("lfs").args(args);
    let command_display = format!("{cmd:?}");
    let output = cmd.output()?;
    if !output.status.success() {
        return Err(LfsError::CliFailed {
            command: command_display,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

impl LfsHook for GitLfs {
    fn should_use_lfs(&self, path: &str, content_size: u64) -> bool {
        if !self.enabled {
            return false;
        }
        if content_size >= self.size_threshold {
            return true;
        }
        self.attribute_says_lfs(path)
    }

    fn store_and_pointer(&self, data: &[u8]) -> Result<Vec<u8>, LfsError> {
        let mut hasher = sha2::Sha256::new();
        hasher.update(data);
        let oid = hex::encode(hasher.finalize());
        self.store.store_object(&oid, data)?;
        let pointer = LfsPointer {
            version: "https://git-lfs.github.com/spec/v1".to_owned(),
            oid,
            size: data.len() as u64,
        };
        Ok(pointer.to_content())
    }

    fn resolve_pointer(&self, pointer: &LfsPointer) -> Result<Vec<u8>, LfsError> {
        self.store.read_object(&pointer.oid)
    }
}
