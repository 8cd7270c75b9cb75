//! `current`: the writable view over the tracked branch's tip.
//!
//! Every mutating call here ends the same way — stage the affected paths
//! and enqueue a [`CommitJob`] — so `SyncWorker` can coalesce many rapid
//! writes into one commit instead of committing per syscall. Grounded in
//! `views/current.py`: same ignore gate, write-size limit, restrictive chmod
//! policy, and staging algorithm.

use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use gitfs_git::Repository;
use gitfs_lfs::LfsHook;

use crate::error::CoreError;
use crate::ignore::CachedIgnore;
use crate::queue::{CommitJob, CommitQueue};
use crate::sync_state::SyncState;
use crate::views::passthrough::{FileAttr, PassthroughView};

const MODE_EXECUTABLE: u32 = 0o755;
const MODE_REGULAR: u32 = 0o644;

/// Per-open-file bookkeeping between `open`/`create` and `release`.
struct DirtyHandle {
    path: String,
    message: String,
    /// Whether `release` should stage this path (`false` for a handle that
    /// was only ever opened and read from, never written to).
    stage: bool,
    /// Whether this handle holds a writer-counter reservation to release.
    counted: bool,
}

/// The writable view rooted at the working tree's current checkout.
pub struct CurrentView {
    passthrough: PassthroughView,
    repo: Arc<Repository>,
    ignore: Arc<CachedIgnore>,
    lfs: Arc<dyn LfsHook>,
    queue: Arc<CommitQueue>,
    state: Arc<SyncState>,
    max_size: u64,
    uid: u32,
    gid: u32,
    dirty: Mutex<HashMap<u64, DirtyHandle>>,
    next_fh: AtomicU64,
    /// When `current_path == "/"` (root elision), the history view has no
    /// directory of its own to appear under — it has to be synthesized into
    /// this view's own root listing instead. `None` when `current` isn't
    /// mounted at the root.
    synthesized_root_entry: Option<String>,
}

impl CurrentView {
    /// Build a `CurrentView` rooted at `repo`'s worktree. `synthesized_root_entry`
    /// names the `history` directory to splice into the root listing when
    /// `current` is mounted at `/` (root elision); pass `None` otherwise.
    #[must_use]
    pub fn new(
        repo: Arc<Repository>,
        ignore: Arc<CachedIgnore>,
        lfs: Arc<dyn LfsHook>,
        queue: Arc<CommitQueue>,
        state: Arc<SyncState>,
        max_size: u64,
        uid: u32,
        gid: u32,
        synthesized_root_entry: Option<String>,
    ) -> Self {
        let workdir = repo.workdir().to_path_buf();
        Self {
            passthrough: PassthroughView::new(workdir),
            repo,
            ignore,
            lfs,
            queue,
            state,
            max_size,
            uid,
            gid,
            dirty: Mutex::new(HashMap::new()),
            next_fh: AtomicU64::new(1),
            synthesized_root_entry,
        }
    }

    fn sanitize(path: &str) -> String {
        path.trim_start_matches('/').to_owned()
    }

    fn check_ignore(&self, paths: &[&str]) -> Result<(), CoreError> {
        for path in paths {
            let sanitized = Self::sanitize(path);
            let full = self.repo.full_path(path);
            let is_dir = full.is_dir();
            if self.ignore.is_ignored(&sanitized, is_dir) {
                return Err(CoreError::Ignored {
                    path: (*path).to_owned(),
                });
            }
        }
        Ok(())
    }

    fn list_files_under(&self, rel: &str) -> Vec<String> {
        let full = self.repo.full_path(rel);
        if full.is_file() || full.is_symlink() {
            return vec![Self::sanitize(rel)];
        }
        let mut out = Vec::new();
        self.walk_files(&full, &mut out);
        out
    }

    fn walk_files(&self, dir: &Path, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() && !path.is_symlink() {
                self.walk_files(&path, out);
            } else if let Ok(rel) = path.strip_prefix(self.repo.workdir()) {
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    /// The `_stage` algorithm: normalize `add`/`remove`, enumerate files
    /// under each, stage index changes, and enqueue one commit job if any
    /// work was done.
    fn stage(&self, add: Option<&str>, remove: Option<&str>, message: impl Into<String>) -> Result<(), CoreError> {
        let message = message.into();
        let mut added = Vec::new();
        let mut removed = Vec::new();

        if let Some(remove) = remove {
            let remove = Self::sanitize(remove);
            if let Some(add) = add {
                let add_sanitized = Self::sanitize(add);
                let files = self.list_files_under(&add_sanitized);
                if files.is_empty() {
                    self.repo.index_remove(&remove, None)?;
                    removed.push(remove.clone());
                } else {
                    for file in &files {
                        let trailing = file.strip_prefix(&add_sanitized).unwrap_or(file);
                        let old_path = format!("{remove}{trailing}");
                        self.repo.index_remove(&old_path, None)?;
                        removed.push(old_path);
                    }
                }
            } else {
                self.repo.index_remove(&remove, None)?;
                removed.push(remove);
            }
        }

        if let Some(add) = add {
            let add = Self::sanitize(add);
            let files = self.list_files_under(&add);
            if files.is_empty() {
                self.index_add_lfs_aware(&add)?;
                added.push(add);
            } else {
                for file in &files {
                    self.index_add_lfs_aware(file)?;
                    added.push(file.clone());
                }
            }
        }

        if !added.is_empty() || !removed.is_empty() {
            let job = CommitJob {
                message,
                add: added,
                remove: removed,
            };
            if let Err(dropped) = self.queue.push(job) {
                tracing::warn!(msg = %dropped.message, "commit queue full, dropping staging job");
            }
        }
        Ok(())
    }

    /// Stage `path`, using the LFS hook's pointer-swap dance when the hook
    /// says to, falling through to a plain add on any failure.
    fn index_add_lfs_aware(&self, path: &str) -> Result<(), CoreError> {
        let full = self.repo.full_path(path);
        let Ok(original) = std::fs::read(&full) else {
            return Ok(self.repo.index_add(path)?);
        };
        if self.lfs.should_use_lfs(path, original.len() as u64) {
            let attempted: Result<(), CoreError> = (|| {
                let pointer_bytes = self.lfs.store_and_pointer(&original)?;
                std::fs::write(&full, &pointer_bytes)?;
                let add_result = self.repo.index_add(path);
                std::fs::write(&full, &original)?;
                add_result?;
                Ok(())
            })();
            if attempted.is_ok() {
                return Ok(());
            }
            tracing::warn!(path, "LFS staging failed, falling back to plain add");
        }
        Ok(self.repo.index_add(path)?)
    }

    /// `getattr` delegates straight to the underlying worktree.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if `path` doesn't exist.
    pub fn getattr(&self, path: &str) -> Result<FileAttr, CoreError> {
        self.passthrough.getattr(path)
    }

    /// `readdir` delegates to the underlying worktree, splicing in the
    /// synthesized `history` entry at the root when `current` is mounted
    /// at `/`.
    ///
    /// # Errors
    /// Returns [`CoreError::Io`] if the directory can't be read.
    pub fn readdir(&self, path: &str) -> Result<Vec<String>, CoreError> {
        let mut names = self.passthrough.readdir(path)?;
        if path == "/" {
            if let Some(history) = &self.synthesized_root_entry {
                if !names.iter().any(|n| n == history) {
                    names.push(history.clone());
                }
            }
        }
        Ok(names)
    }

    /// `read` delegates straight to the underlying worktree.
    ///
    /// # Errors
    /// Returns [`CoreError::Io`] on I/O failure.
    pub fn read(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>, CoreError> {
        self.passthrough.read(path, offset, len)
    }

    /// `open` for write-intent flags reserves a writer slot and a dirty
    /// handle; read-only opens pass straight through.
    pub fn open(&self, path: &str, write_intent: bool) -> u64 {
        let fh = self.next_fh.fetch_add(1, Ordering::SeqCst);
        if write_intent {
            self.state.writer_opened();
            self.dirty.lock().insert(
                fh,
                DirtyHandle {
                    path: path.to_owned(),
                    message: format!("Opened {path} for write"),
                    stage: false,
                    counted: true,
                },
            );
        }
        fh
    }

    /// `create`: make the file on disk with `mode`, then behave like an
    /// always-staged `open`.
    ///
    /// # Errors
    /// Returns [`CoreError::Ignored`] if `path` matches the ignore set.
    pub fn create(&self, path: &str, mode: u32) -> Result<u64, CoreError> {
        self.check_ignore(&[path])?;
        let full = self.repo.full_path(path);
        std::fs::File::create(&full)?;
        std::fs::set_permissions(&full, std::fs::Permissions::from_mode(mode))?;
        let fh = self.next_fh.fetch_add(1, Ordering::SeqCst);
        self.state.writer_opened();
        self.dirty.lock().insert(
            fh,
            DirtyHandle {
                path: path.to_owned(),
                message: format!("Created {path}"),
                stage: true,
                counted: true,
            },
        );
        Ok(fh)
    }

    /// `write`: size-limit check, then passthrough write, marking the
    /// handle dirty with message `"Update P"`.
    ///
    /// # Errors
    /// Returns [`CoreError::FileTooLarge`] if `offset + data.len() >
    /// max_size`; [`CoreError::Ignored`] if `path` matches the ignore set.
    pub fn write(&self, fh: u64, path: &str, offset: u64, data: &[u8]) -> Result<usize, CoreError> {
        if offset + data.len() as u64 > self.max_size {
            return Err(CoreError::FileTooLarge {
                path: path.to_owned(),
                max_size: self.max_size,
            });
        }
        self.check_ignore(&[path])?;
        let n = self.passthrough.write(path, offset, data)?;
        if let Some(handle) = self.dirty.lock().get_mut(&fh) {
            handle.message = format!("Update {path}");
            handle.stage = true;
        }
        Ok(n)
    }

    /// `fsync`: stages `path` immediately with its own commit intent,
    /// independent of the handle's dirty state.
    ///
    /// # Errors
    /// Returns [`CoreError::Ignored`] or a staging failure.
    pub fn fsync(&self, path: &str) -> Result<(), CoreError> {
        self.check_ignore(&[path])?;
        self.stage(Some(path), None, format!("Fsync {path}"))
    }

    /// `release`: if the handle was marked dirty, stage it; always releases
    /// its writer-counter reservation.
    ///
    /// # Errors
    /// Returns a staging failure, if any.
    pub fn release(&self, fh: u64) -> Result<(), CoreError> {
        let Some(handle) = self.dirty.lock().remove(&fh) else {
            return Ok(());
        };
        if handle.counted {
            self.state.writer_closed();
        }
        if handle.stage {
            self.stage(Some(&handle.path), None, handle.message)?;
        }
        Ok(())
    }

    /// `mkdir`: create the directory and a staged `.keep` file inside it.
    ///
    /// # Errors
    /// Returns [`CoreError::Ignored`] or a staging failure.
    pub fn mkdir(&self, path: &str) -> Result<(), CoreError> {
        self.check_ignore(&[path])?;
        let full = self.repo.full_path(path);
        std::fs::create_dir(&full)?;
        let keep_path = format!("{}/.keep", path.trim_end_matches('/'));
        std::fs::File::create(self.repo.full_path(&keep_path))?;
        self.stage(Some(&keep_path), None, format!("Create the {path} directory"))
    }

    /// `rmdir`: unlink every file under `path`, stage all removals under one
    /// message, then remove the now-empty directory tree.
    ///
    /// # Errors
    /// Returns a staging or I/O failure.
    pub fn rmdir(&self, path: &str) -> Result<(), CoreError> {
        self.check_ignore(&[path])?;
        let sanitized = Self::sanitize(path);
        let files = self.list_files_under(&sanitized);
        for file in &files {
            let _ = std::fs::remove_file(self.repo.full_path(file));
            self.repo.index_remove(file, None)?;
        }
        std::fs::remove_dir_all(self.repo.full_path(path))?;
        if !files.is_empty() {
            let job = CommitJob::remove(format!("Delete the {path} directory"), files);
            let _ = self.queue.push(job);
        }
        Ok(())
    }

    /// `unlink`: remove the file on disk and stage its removal.
    ///
    /// # Errors
    /// Returns [`CoreError::Ignored`] or a staging failure.
    pub fn unlink(&self, path: &str) -> Result<(), CoreError> {
        self.check_ignore(&[path])?;
        std::fs::remove_file(self.repo.full_path(path))?;
        self.stage(None, Some(path), format!("Deleted {path}"))
    }

    /// `rename`: move on disk, then stage a coalesced add/remove under one message.
    ///
    /// # Errors
    /// Returns [`CoreError::Ignored`] if either endpoint matches the ignore set.
    pub fn rename(&self, old: &str, new: &str) -> Result<(), CoreError> {
        self.check_ignore(&[old, new])?;
        std::fs::rename(self.repo.full_path(old), self.repo.full_path(new))?;
        self.stage(Some(new), Some(old), format!("Rename {old} to {new}"))
    }

    /// `symlink`: create the link on disk and stage its addition.
    ///
    /// # Errors
    /// Returns [`CoreError::Ignored`] or a staging failure.
    pub fn symlink(&self, name: &str, target: &str) -> Result<(), CoreError> {
        self.check_ignore(&[name])?;
        std::os::unix::fs::symlink(target, self.repo.full_path(name))?;
        self.stage(Some(name), None, format!("Create symlink to {target} for {name}"))
    }

    /// `link`: create a hard link to `target` (resolved within this view)
    /// at `name`, and stage its addition.
    ///
    /// # Errors
    /// Returns [`CoreError::Ignored`] or a staging failure.
    pub fn link(&self, name: &str, target: &str) -> Result<(), CoreError> {
        self.check_ignore(&[name, target])?;
        std::fs::hard_link(self.repo.full_path(target), self.repo.full_path(name))?;
        self.stage(Some(name), None, format!("Link {target} to {name}"))
    }

    /// `chmod`: only `0o755`/`0o644` are accepted. Directory chmod applies
    /// but does not stage; file chmod stages.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidArgument`] for any other mode.
    pub fn chmod(&self, path: &str, mode: u32) -> Result<(), CoreError> {
        if mode != MODE_EXECUTABLE && mode != MODE_REGULAR {
            return Err(CoreError::InvalidArgument {
                message: format!("chmod mode {mode:o} not in {{0755, 0644}}"),
            });
        }
        self.check_ignore(&[path])?;
        let full = self.repo.full_path(path);
        std::fs::set_permissions(&full, std::fs::Permissions::from_mode(mode))?;
        if full.is_dir() {
            return Ok(());
        }
        self.stage(Some(path), None, format!("Chmod to {mode:04o} on {path}"))
    }

    /// Directory metadata's ownership fields, used by `getattr`'s caller to
    /// fill in uid/gid when the underlying filesystem doesn't track them
    /// per-file (mirrors the original's mount-wide uid/gid override).
    #[must_use]
    pub fn owner(&self) -> (u32, u32) {
        (self.uid, self.gid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_leading_slash() {
        assert_eq!(CurrentView::sanitize("/a/b"), "a/b");
        assert_eq!(CurrentView::sanitize("a/b"), "a/b");
    }

    #[test]
    fn only_two_chmod_modes_accepted() {
        assert_ne!(MODE_EXECUTABLE, MODE_REGULAR);
    }
}
