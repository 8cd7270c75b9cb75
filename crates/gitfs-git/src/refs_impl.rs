//! gix-backed ref, rev-parse, and ancestry operations.

use std::collections::{HashSet, VecDeque};

use crate::error::GitError;
use crate::oid::{from_gix_oid, to_gix_oid};
use crate::repository::Repository;
use crate::types::{GitOid, RefEdit, RefName};

pub fn read_ref(repo: &Repository, name: &RefName) -> Result<Option<GitOid>, GitError> {
    let mut reference = match repo.repo.try_find_reference(name.as_str()) {
        Ok(Some(r)) => r,
        Ok(None) => return Ok(None),
        Err(e) => {
            return Err(GitError::BackendError {
                message: format!("failed to look up ref '{name}': {e}"),
            });
        }
    };
    let id = reference
        .peel_to_id_in_place()
        .map_err(|e| GitError::BackendError {
            message: format!("failed to peel ref '{name}': {e}"),
        })?;
    Ok(Some(from_gix_oid(id.detach())))
}

pub fn write_ref(
    repo: &Repository,
    name: &RefName,
    oid: GitOid,
    log_message: &str,
) -> Result<(), GitError> {
    repo.repo
        .reference(
            name.as_str(),
            to_gix_oid(oid),
            gix::refs::transaction::PreviousValue::Any,
            log_message.to_owned(),
        )
        .map_err(|e| GitError::BackendError {
            message: format!("failed to write ref '{name}': {e}"),
        })?;
    Ok(())
}

pub fn create_reference(
    repo: &Repository,
    name: &RefName,
    target: GitOid,
    force: bool,
) -> Result<(), GitError> {
    if !force && read_ref(repo, name)?.is_some() {
        return Err(GitError::RefConflict {
            ref_name: name.as_str().to_owned(),
            message: "ref already exists and force was not requested".to_owned(),
        });
    }
    write_ref(repo, name, target, "gitfs: create_reference")
}

pub fn delete_ref(repo: &Repository, name: &RefName) -> Result<(), GitError> {
    let Some(reference) =
        repo.repo
            .try_find_reference(name.as_str())
            .map_err(|e| GitError::BackendError {
                message: format!("failed to look up ref '{name}' for deletion: {e}"),
            })?
    else {
        return Ok(());
    };
    reference.delete().map_err(|e| GitError::BackendError {
        message: format!("failed to delete ref '{name}': {e}"),
    })?;
    Ok(())
}

pub fn atomic_ref_update(repo: &Repository, edits: &[RefEdit]) -> Result<(), GitError> {
    let mut gix_edits = Vec::with_capacity(edits.len());
    for edit in edits {
        let expected = match edit.expected_old_oid {
            Some(old) if old.is_zero() => gix::refs::transaction::PreviousValue::MustNotExist,
            Some(old) => gix::refs::transaction::PreviousValue::MustExistAndMatch(
                gix::refs::Target::Object(to_gix_oid(old)),
            ),
            None => gix::refs::transaction::PreviousValue::Any,
        };
        let full_name =
            gix::refs::FullName::try_from(edit.name.as_str()).map_err(|e| GitError::InvalidOid {
                value: edit.name.as_str().to_owned(),
                reason: e.to_string(),
            })?;
        gix_edits.push(gix::refs::transaction::RefEdit {
            change: gix::refs::transaction::Change::Update {
                log: gix::refs::transaction::LogChange {
                    message: "gitfs: atomic_ref_update".into(),
                    ..Default::default()
                },
                expected,
                new: gix::refs::Target::Object(to_gix_oid(edit.new_oid)),
            },
            name: full_name,
            deref: false,
        });
    }

    repo.repo
        .edit_references(gix_edits)
        .map_err(|e| GitError::RefConflict {
            ref_name: edits
                .first()
                .map(|e| e.name.as_str().to_owned())
                .unwrap_or_default(),
            message: e.to_string(),
        })?;
    Ok(())
}

pub fn list_refs(repo: &Repository, prefix: &str) -> Result<Vec<(RefName, GitOid)>, GitError> {
    let platform = repo.repo.references().map_err(|e| GitError::BackendError {
        message: format!("failed to access refs: {e}"),
    })?;
    let iter = platform
        .prefixed(prefix)
        .map_err(|e| GitError::BackendError {
            message: format!("failed to iterate refs with prefix '{prefix}': {e}"),
        })?;

    let mut out = Vec::new();
    for r in iter {
        let mut r = r.map_err(|e| GitError::BackendError {
            message: format!("failed to read ref: {e}"),
        })?;
        let name = RefName::new(&r.name().as_bstr().to_string()).map_err(|e| {
            GitError::InvalidOid {
                value: e.value.clone(),
                reason: e.reason.clone(),
            }
        })?;
        let id = r
            .peel_to_id_in_place()
            .map_err(|e| GitError::BackendError {
                message: format!("failed to peel ref: {e}"),
            })?;
        out.push((name, from_gix_oid(id.detach())));
    }
    Ok(out)
}

pub fn rev_parse(repo: &Repository, spec: &str) -> Result<GitOid, GitError> {
    rev_parse_opt(repo, spec)?.ok_or_else(|| GitError::NotFound {
        message: format!("revision '{spec}' not found"),
    })
}

pub fn rev_parse_opt(repo: &Repository, spec: &str) -> Result<Option<GitOid>, GitError> {
    match repo.repo.rev_parse_single(spec) {
        Ok(id) => Ok(Some(from_gix_oid(id.detach()))),
        Err(_) => Ok(None),
    }
}

/// Breadth-first walk of every ancestor OID reachable from `tip` (inclusive),
/// following all parents, not just the first.
fn ancestors(repo: &Repository, tip: GitOid) -> Result<HashSet<GitOid>, GitError> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(tip);
    seen.insert(tip);
    while let Some(oid) = queue.pop_front() {
        let info = crate::objects_impl::read_commit(repo, oid)?;
        for parent in info.parents {
            if seen.insert(parent) {
                queue.push_back(parent);
            }
        }
    }
    Ok(seen)
}

pub fn is_ancestor(
    repo: &Repository,
    ancestor: GitOid,
    descendant: GitOid,
) -> Result<bool, GitError> {
    if ancestor == descendant {
        return Ok(true);
    }
    Ok(ancestors(repo, descendant)?.contains(&ancestor))
}

/// Finds a common ancestor of `a` and `b` by computing `a`'s full ancestor
/// set and then walking `b`'s history breadth-first until the first hit.
/// This isn't guaranteed to be the single lowest common ancestor under
/// criss-cross merge histories, but GitFS's accept-mine strategy only needs
/// *a* valid merge base, not the canonical one.
pub fn merge_base(repo: &Repository, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError> {
    if a == b {
        return Ok(Some(a));
    }
    let a_ancestors = ancestors(repo, a)?;
    if a_ancestors.contains(&b) {
        return Ok(Some(b));
    }

    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(b);
    seen.insert(b);
    while let Some(oid) = queue.pop_front() {
        if a_ancestors.contains(&oid) {
            return Ok(Some(oid));
        }
        let info = crate::objects_impl::read_commit(repo, oid)?;
        for parent in info.parents {
            if seen.insert(parent) {
                queue.push_back(parent);
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    // Ref and ancestry behavior is covered end-to-end in
    // `tests/integration_test.rs`, which exercises a real on-disk repository;
    // the pure-logic pieces here (BFS ancestor search) are simple enough
    // that unit tests would just re-implement the function.
}
