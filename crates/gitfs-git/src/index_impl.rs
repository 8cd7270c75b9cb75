//! Index (staging area) operations for [`Repository`].

use std::os::unix::fs::PermissionsExt;

use crate::error::GitError;
use crate::repository::Repository;
use crate::types::EntryMode;

/// Reset the index to match HEAD, unstaging all staged changes.
///
/// This reads HEAD's tree into the index without touching the working tree,
/// equivalent to `git reset HEAD`.
pub fn unstage_all(repo: &Repository) -> Result<(), GitError> {
    let head_commit = repo.repo.head_commit().map_err(|e| GitError::BackendError {
        message: format!("failed to resolve HEAD commit: {e}"),
    })?;

    let head_tree_id = head_commit.tree_id().map_err(|e| GitError::BackendError {
        message: format!("failed to read HEAD tree id: {e}"),
    })?;

    let state = gix::index::State::from_tree(&head_tree_id, &repo.repo.objects, Default::default())
        .map_err(|e| GitError::BackendError {
            message: format!("failed to create index from tree: {e}"),
        })?;

    let mut new_index = gix::index::File::from_state(state, repo.repo.index_path());
    new_index.write(Default::default()).map_err(|e| GitError::BackendError {
        message: format!("failed to write index: {e}"),
    })?;

    Ok(())
}

/// Stage the file at `path` (relative to the worktree root) into the index:
/// read its current content from disk, write it as a blob, and insert or
/// replace the index entry for `path`.
///
/// # Errors
/// Returns [`GitError::IoError`] if the file can't be read, or
/// [`GitError::BackendError`] if the blob or index can't be written.
pub fn add_to_index(repo: &Repository, path: &str) -> Result<(), GitError> {
    let full_path = repo.full_path(path);
    let metadata = std::fs::symlink_metadata(&full_path)?;

    let (mode, data) = if metadata.file_type().is_symlink() {
        let target = std::fs::read_link(&full_path)?;
        (EntryMode::Link, target.to_string_lossy().into_owned().into_bytes())
    } else {
        let data = std::fs::read(&full_path)?;
        let executable = metadata.permissions().mode() & 0o111 != 0;
        let mode = if executable {
            EntryMode::BlobExecutable
        } else {
            EntryMode::Blob
        };
        (mode, data)
    };

    let oid = crate::objects_impl::write_blob(repo, &data)?;

    let mut entries = crate::checkout_impl::read_index(repo)?;
    entries.retain(|e| e.path != path);
    entries.push(crate::types::IndexEntry {
        path: path.to_owned(),
        mode,
        oid,
    });
    entries.sort_by(|a, b| a.path.cmp(&b.path));

    crate::checkout_impl::write_index(repo, &entries)
}

/// Remove the entry for `path` from the index.
///
/// `stage` distinguishes merge-conflict stages in a real git index (1 =
/// base, 2 = ours, 3 = theirs). GitFS's index never carries unresolved
/// merge entries — the accept-mine strategy resolves conflicts by replaying
/// trees directly rather than leaving multi-stage entries — so `stage` is
/// accepted for API parity with the underlying design but otherwise
/// ignored; any entry matching `path` is removed.
///
/// # Errors
/// Returns [`GitError::BackendError`] if the index can't be read or written.
pub fn remove_from_index(repo: &Repository, path: &str, stage: Option<u8>) -> Result<(), GitError> {
    let _ = stage;
    let mut entries = crate::checkout_impl::read_index(repo)?;
    entries.retain(|e| e.path != path);
    crate::checkout_impl::write_index(repo, &entries)
}
