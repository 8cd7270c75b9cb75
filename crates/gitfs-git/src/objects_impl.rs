//! gix-backed object read/write and tree editing operations.

use crate::error::GitError;
use crate::oid::{from_gix_entry_mode, from_gix_oid, to_gix_entry_kind, to_gix_oid};
use crate::repository::Repository;
use crate::types::{CommitInfo, GitOid, RefName, Signature, TreeEdit, TreeEntry};

fn to_gix_signature(sig: &Signature) -> gix::actor::Signature {
    gix::actor::Signature {
        name: sig.name.as_str().into(),
        email: sig.email.as_str().into(),
        time: gix::date::Time::now_local_or_utc(),
    }
}

fn from_gix_signature(sig: gix::actor::SignatureRef<'_>) -> Signature {
    Signature::new(sig.name.to_string(), sig.email.to_string())
}

pub fn read_blob(repo: &Repository, oid: GitOid) -> Result<Vec<u8>, GitError> {
    let gix_oid = to_gix_oid(oid);
    let mut blob = repo.repo.find_blob(gix_oid).map_err(|e| GitError::NotFound {
        message: format!("blob {oid}: {e}"),
    })?;
    Ok(blob.take_data())
}

pub fn read_tree(repo: &Repository, oid: GitOid) -> Result<Vec<TreeEntry>, GitError> {
    let gix_oid = to_gix_oid(oid);
    let tree = repo.repo.find_tree(gix_oid).map_err(|e| GitError::NotFound {
        message: format!("tree {oid}: {e}"),
    })?;

    let mut entries = Vec::new();
    for result in tree.iter() {
        let entry = result.map_err(|e| GitError::BackendError {
            message: format!("failed to decode tree entry: {e}"),
        })?;
        let oid_bytes: [u8; 20] = entry
            .inner
            .oid
            .as_bytes()
            .try_into()
            .expect("SHA1 is 20 bytes");
        entries.push(TreeEntry {
            name: entry.inner.filename.to_string(),
            mode: from_gix_entry_mode(entry.inner.mode),
            oid: GitOid::from_bytes(oid_bytes),
        });
    }
    Ok(entries)
}

pub fn read_commit(repo: &Repository, oid: GitOid) -> Result<CommitInfo, GitError> {
    let gix_oid = to_gix_oid(oid);
    let commit = repo.repo.find_commit(gix_oid).map_err(|e| GitError::NotFound {
        message: format!("commit {oid}: {e}"),
    })?;

    let decoded = commit.decode().map_err(|e| GitError::BackendError {
        message: format!("failed to decode commit {oid}: {e}"),
    })?;

    let tree_oid = from_gix_oid(decoded.tree());
    let parents = decoded.parents().map(from_gix_oid).collect();
    let message = decoded.message.to_string();

    let committer_sig = decoded.committer();
    let commit_time = committer_sig.time.seconds;
    let author = from_gix_signature(decoded.author());
    let committer = from_gix_signature(committer_sig);

    Ok(CommitInfo {
        tree_oid,
        parents,
        message,
        author,
        committer,
        commit_time,
    })
}

pub fn write_blob(repo: &Repository, data: &[u8]) -> Result<GitOid, GitError> {
    let id = repo.repo.write_blob(data).map_err(|e| GitError::BackendError {
        message: format!("failed to write blob: {e}"),
    })?;
    Ok(from_gix_oid(id.detach()))
}

pub fn write_tree(repo: &Repository, entries: &[TreeEntry]) -> Result<GitOid, GitError> {
    let tree = gix::objs::Tree {
        entries: entries
            .iter()
            .map(|e| gix::objs::tree::Entry {
                mode: to_gix_entry_kind(e.mode).into(),
                filename: e.name.as_str().into(),
                oid: to_gix_oid(e.oid),
            })
            .collect(),
    };
    let id = repo.repo.write_object(&tree).map_err(|e| GitError::BackendError {
        message: format!("failed to write tree: {e}"),
    })?;
    Ok(from_gix_oid(id.detach()))
}

/// Create a commit object with an explicit author and committer identity.
///
/// GitFS never relies on ambient gix/git config for identity — author and
/// committer always come from the mount's `-o committer_name=...` options
/// (or the CLI defaults derived from `git config`/the OS account), passed in
/// explicitly here.
pub fn create_commit(
    repo: &Repository,
    tree: GitOid,
    parents: &[GitOid],
    message: &str,
    author: &Signature,
    committer: &Signature,
    update_ref: Option<&RefName>,
) -> Result<GitOid, GitError> {
    let tree_oid = to_gix_oid(tree);
    let parent_oids: Vec<gix::ObjectId> = parents.iter().map(|p| to_gix_oid(*p)).collect();
    let author_sig = to_gix_signature(author);
    let committer_sig = to_gix_signature(committer);

    match update_ref {
        Some(ref_name) => {
            let id = repo
                .repo
                .commit_as(
                    committer_sig,
                    author_sig,
                    ref_name.as_str(),
                    message,
                    tree_oid,
                    parent_oids,
                )
                .map_err(|e| GitError::BackendError {
                    message: format!("failed to create commit: {e}"),
                })?;
            Ok(from_gix_oid(id.detach()))
        }
        None => {
            let commit = gix::objs::Commit {
                message: message.into(),
                tree: tree_oid,
                author: author_sig,
                committer: committer_sig,
                encoding: None,
                parents: parent_oids.into_iter().collect(),
                extra_headers: Vec::new(),
            };
            let id = repo.repo.write_object(&commit).map_err(|e| GitError::BackendError {
                message: format!("failed to write commit object: {e}"),
            })?;
            Ok(from_gix_oid(id.detach()))
        }
    }
}

pub fn edit_tree(repo: &Repository, base: GitOid, edits: &[TreeEdit]) -> Result<GitOid, GitError> {
    let gix_oid = to_gix_oid(base);
    let tree = repo.repo.find_tree(gix_oid).map_err(|e| GitError::NotFound {
        message: format!("base tree {base}: {e}"),
    })?;

    let mut editor = tree.edit().map_err(|e| GitError::BackendError {
        message: format!("failed to create tree editor: {e}"),
    })?;

    for edit in edits {
        match edit {
            TreeEdit::Upsert { path, mode, oid } => {
                let kind = to_gix_entry_kind(*mode);
                let gix_oid = to_gix_oid(*oid);
                editor
                    .upsert(path.as_str(), kind, gix_oid)
                    .map_err(|e| GitError::BackendError {
                        message: format!("tree edit upsert '{path}': {e}"),
                    })?;
            }
            TreeEdit::Remove { path } => {
                editor.remove(path.as_str()).map_err(|e| GitError::BackendError {
                    message: format!("tree edit remove '{path}': {e}"),
                })?;
            }
        }
    }

    let new_id = editor.write().map_err(|e| GitError::BackendError {
        message: format!("failed to write edited tree: {e}"),
    })?;
    Ok(from_gix_oid(new_id.detach()))
}
