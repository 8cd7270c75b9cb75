//! The "accept mine" merge strategy.
//!
//! When the local `current` branch and the remote tip have diverged,
//! `SyncWorker::sync` needs to reconcile them before pushing without ever
//! blocking on a manual conflict resolution (there's no user at a terminal
//! to resolve anything — GitFS is a filesystem). The strategy: replay each
//! local commit on top of the remote tip, and whenever a local commit and
//! the remote side touched the same path, the local version wins.
//!
//! Steps, mirroring the original `accept_mine` merge driver:
//! 1. Resolve the local branch tip and the remote-tracking tip.
//! 2. Create detached scratch refs `merging_local`/`merging_remote` pointing
//!    at them (useful for post-mortem inspection if a replay step fails).
//! 3. Find their merge base.
//! 4. Walk the local commits from the merge base to the local tip, oldest first.
//! 5. Replay each one on top of the running tip (starting at the remote
//!    tip): diff the commit against its own parent to find what it changed,
//!    then apply that same diff onto the running tree, so local edits
//!    always clobber whatever the remote side has at that path. Each
//!    replayed commit is recorded as a merge of the running tip and the
//!    original local commit (`parents = [running_tip, commit]`), with its
//!    message prefixed `"merging: "`, so history shows it folded the
//!    upstream side in rather than silently rewriting it.
//! 6. Fast-forward the local branch ref to the final replayed tip and clean
//!    up the scratch refs.

use std::collections::BTreeMap;

use gitfs_git::{GitOid, RefName, Repository, Signature, TreeEdit, TreeEntry};

use crate::error::CoreError;

/// Ref names used for the scratch branches created during a replay. Left
/// behind on failure for diagnosis; cleaned up on success.
const MERGING_LOCAL_REF: &str = "refs/gitfs/merging_local";
const MERGING_REMOTE_REF: &str = "refs/gitfs/merging_remote";

/// Merge `remote_tip` into `local_branch`, favoring local changes on any
/// path both sides touched, and return the resulting commit OID.
///
/// Returns `local_tip` unchanged if the branches have not diverged (remote
/// tip is already an ancestor of local, or they're equal).
///
/// # Errors
/// Returns [`CoreError`] if any git object can't be read or written.
pub fn accept_mine(
    repo: &Repository,
    local_branch: &RefName,
    remote_tip: GitOid,
    committer: &Signature,
) -> Result<GitOid, CoreError> {
    let local_tip = repo.read_ref(local_branch)?.ok_or_else(|| CoreError::NotFound {
        message: format!("local branch '{local_branch}' has no commits yet"),
    })?;

    if local_tip == remote_tip || repo.is_ancestor(remote_tip, local_tip)? {
        return Ok(local_tip);
    }

    let merging_local = RefName::new(MERGING_LOCAL_REF).expect("valid static ref name");
    let merging_remote = RefName::new(MERGING_REMOTE_REF).expect("valid static ref name");
    repo.create_reference(&merging_local, local_tip, true)?;
    repo.create_reference(&merging_remote, remote_tip, true)?;

    let merge_base = repo.merge_base(local_tip, remote_tip)?;

    let mut chain = Vec::new();
    repo.walk(local_tip, |oid, _info| {
        if Some(oid) == merge_base {
            return false;
        }
        chain.push(oid);
        true
    })?;
    chain.reverse(); // oldest first

    let mut running_tip = remote_tip;
    for commit_oid in chain {
        let commit = repo.read_commit(commit_oid)?;
        let parent_tree = match commit.parents.first() {
            Some(parent) => repo.read_commit(*parent)?.tree_oid,
            None => flatten_empty(repo)?,
        };
        let edits = diff_trees(repo, parent_tree, commit.tree_oid)?;

        let running_commit = repo.read_commit(running_tip)?;
        let new_tree = repo.edit_tree(running_commit.tree_oid, &edits)?;

        running_tip = repo.create_commit(
            new_tree,
            &[running_tip, commit_oid],
            &format!("merging: {}", commit.message),
            &commit.author,
            committer,
            None,
        )?;
    }

    repo.create_reference(local_branch, running_tip, true)?;

    Ok(running_tip)
}

/// The empty tree's OID, used as a stand-in "parent tree" for a commit's
/// initial (parentless) commit so its entire tree is treated as added.
fn flatten_empty(repo: &Repository) -> Result<GitOid, CoreError> {
    Ok(repo.write_tree(&[])?)
}

/// Recursively flatten a tree into `path -> (mode, oid)` entries.
fn flatten_tree(
    repo: &Repository,
    tree: GitOid,
    prefix: &str,
    out: &mut BTreeMap<String, TreeEntry>,
) -> Result<(), CoreError> {
    for entry in repo.read_tree(tree)? {
        let path = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{prefix}/{}", entry.name)
        };
        if entry.mode == gitfs_git::EntryMode::Tree {
            flatten_tree(repo, entry.oid, &path, out)?;
        } else {
            out.insert(path.clone(), TreeEntry { name: path, ..entry });
        }
    }
    Ok(())
}

/// Compute the edits that transform `old` into `new`, as a flat list of
/// file-level upserts/removes (directories are implicit in the paths).
fn diff_trees(repo: &Repository, old: GitOid, new: GitOid) -> Result<Vec<TreeEdit>, CoreError> {
    let mut old_entries = BTreeMap::new();
    flatten_tree(repo, old, "", &mut old_entries)?;
    let mut new_entries = BTreeMap::new();
    flatten_tree(repo, new, "", &mut new_entries)?;

    let mut edits = Vec::new();
    for (path, entry) in &new_entries {
        match old_entries.get(path) {
            Some(old_entry) if old_entry.oid == entry.oid && old_entry.mode == entry.mode => {}
            _ => edits.push(TreeEdit::Upsert {
                path: path.clone(),
                mode: entry.mode,
                oid: entry.oid,
            }),
        }
    }
    for path in old_entries.keys() {
        if !new_entries.contains_key(path) {
            edits.push(TreeEdit::Remove { path: path.clone() });
        }
    }
    Ok(edits)
}
