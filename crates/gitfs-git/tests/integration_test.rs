use tempfile::TempDir;

use gitfs_git::{
    Credentials, EntryMode, GitError, GitOid, IndexEntry, RefEdit, RefName, Repository, Signature,
    TreeEdit, TreeEntry,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sig() -> Signature {
    Signature::new("Test User", "test@test.com")
}

fn setup_repo() -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    std::process::Command::new("git")
        .args(["init", dir.path().to_str().unwrap()])
        .output()
        .unwrap();
    std::process::Command::new("git")
        .args(["config", "user.email", "test@test.com"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    std::process::Command::new("git")
        .args(["config", "user.name", "Test User"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    let repo = Repository::open(dir.path(), Credentials::None).unwrap();
    (dir, repo)
}

/// Create an initial commit with a single file so HEAD exists.
/// Returns the commit OID and the tree OID.
fn setup_repo_with_commit() -> (TempDir, Repository, GitOid, GitOid) {
    let (dir, repo) = setup_repo();
    let blob_oid = repo.write_blob(b"hello world\n").unwrap();
    let tree_oid = repo
        .write_tree(&[TreeEntry {
            name: "hello.txt".to_string(),
            mode: EntryMode::Blob,
            oid: blob_oid,
        }])
        .unwrap();
    let head_ref = RefName::new("refs/heads/main").unwrap();
    let commit_oid = repo
        .create_commit(tree_oid, &[], "initial commit", &sig(), &sig(), Some(&head_ref))
        .unwrap();
    std::process::Command::new("git")
        .args(["symbolic-ref", "HEAD", "refs/heads/main"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    (dir, repo, commit_oid, tree_oid)
}

// ===========================================================================
// 1. Basic repo operations
// ===========================================================================

#[test]
fn open_repo() {
    let (_dir, _repo) = setup_repo();
}

#[test]
fn rev_parse_head() {
    let (_dir, repo, commit_oid, _tree_oid) = setup_repo_with_commit();
    let parsed = repo.rev_parse("HEAD").unwrap();
    assert_eq!(parsed, commit_oid);
}

#[test]
fn rev_parse_opt_missing() {
    let (_dir, repo) = setup_repo();
    let result = repo.rev_parse_opt("HEAD").unwrap();
    assert!(result.is_none());
}

#[test]
fn blob_roundtrip() {
    let (_dir, repo) = setup_repo();
    let data = b"some blob content";
    let oid = repo.write_blob(data).unwrap();
    let read_back = repo.read_blob(oid).unwrap();
    assert_eq!(read_back, data);
}

#[test]
fn tree_roundtrip() {
    let (_dir, repo) = setup_repo();
    let blob_oid = repo.write_blob(b"content").unwrap();
    let entries = vec![TreeEntry {
        name: "file.txt".to_string(),
        mode: EntryMode::Blob,
        oid: blob_oid,
    }];
    let tree_oid = repo.write_tree(&entries).unwrap();
    let read_back = repo.read_tree(tree_oid).unwrap();
    assert_eq!(read_back.len(), 1);
    assert_eq!(read_back[0].name, "file.txt");
    assert_eq!(read_back[0].mode, EntryMode::Blob);
    assert_eq!(read_back[0].oid, blob_oid);
}

#[test]
fn commit_roundtrip() {
    let (_dir, repo, commit_oid, tree_oid) = setup_repo_with_commit();
    let info = repo.read_commit(commit_oid).unwrap();
    assert_eq!(info.tree_oid, tree_oid);
    assert!(info.parents.is_empty());
    assert_eq!(info.message, "initial commit");
    assert_eq!(info.author.name, "Test User");
}

#[test]
fn current_branch_reports_checked_out_name() {
    let (_dir, repo, _, _) = setup_repo_with_commit();
    assert_eq!(repo.current_branch().unwrap(), "main");
}

// ===========================================================================
// 2. Ref operations
// ===========================================================================

#[test]
fn create_reference_roundtrip() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    let refname = RefName::new("refs/heads/feature").unwrap();
    repo.create_reference(&refname, commit_oid, false).unwrap();
    let read_back = repo.read_ref(&refname).unwrap();
    assert_eq!(read_back, Some(commit_oid));
}

#[test]
fn create_reference_rejects_existing_without_force() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    let refname = RefName::new("refs/heads/feature").unwrap();
    repo.create_reference(&refname, commit_oid, false).unwrap();
    let result = repo.create_reference(&refname, commit_oid, false);
    assert!(matches!(result, Err(GitError::RefConflict { .. })));
}

#[test]
fn read_ref_nonexistent() {
    let (_dir, repo) = setup_repo();
    let refname = RefName::new("refs/heads/nope").unwrap();
    let result = repo.read_ref(&refname).unwrap();
    assert_eq!(result, None);
}

#[test]
fn list_refs_with_prefix() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    let r1 = RefName::new("refs/heads/alpha").unwrap();
    let r2 = RefName::new("refs/heads/beta").unwrap();
    let r3 = RefName::new("refs/tags/v1").unwrap();
    repo.create_reference(&r1, commit_oid, true).unwrap();
    repo.create_reference(&r2, commit_oid, true).unwrap();
    repo.create_reference(&r3, commit_oid, true).unwrap();
    let heads = repo.list_refs("refs/heads/").unwrap();
    let head_names: Vec<&str> = heads.iter().map(|(r, _)| r.as_str()).collect();
    assert!(head_names.contains(&"refs/heads/alpha"));
    assert!(head_names.contains(&"refs/heads/beta"));
    assert!(head_names.contains(&"refs/heads/main"));
    assert!(!head_names.contains(&"refs/tags/v1"));
}

#[test]
fn atomic_ref_update_success() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    let refname = RefName::new("refs/heads/atomic-test").unwrap();
    let edits = vec![RefEdit {
        name: refname.clone(),
        new_oid: commit_oid,
        expected_old_oid: Some(GitOid::ZERO),
    }];
    repo.atomic_ref_update(&edits).unwrap();
    assert_eq!(repo.read_ref(&refname).unwrap(), Some(commit_oid));
}

// ===========================================================================
// 3. Object operations
// ===========================================================================

#[test]
fn write_tree_multiple_entries() {
    let (_dir, repo) = setup_repo();
    let b1 = repo.write_blob(b"aaa").unwrap();
    let b2 = repo.write_blob(b"bbb").unwrap();
    let entries = vec![
        TreeEntry {
            name: "a.txt".to_string(),
            mode: EntryMode::Blob,
            oid: b1,
        },
        TreeEntry {
            name: "b.txt".to_string(),
            mode: EntryMode::Blob,
            oid: b2,
        },
    ];
    let tree_oid = repo.write_tree(&entries).unwrap();
    let read_back = repo.read_tree(tree_oid).unwrap();
    assert_eq!(read_back.len(), 2);
    let names: Vec<&str> = read_back.iter().map(|e| e.name.as_str()).collect();
    assert!(names.contains(&"a.txt"));
    assert!(names.contains(&"b.txt"));
}

#[test]
fn edit_tree_add_entry() {
    let (_dir, repo, _, tree_oid) = setup_repo_with_commit();
    let new_blob = repo.write_blob(b"new file").unwrap();
    let new_tree = repo
        .edit_tree(
            tree_oid,
            &[TreeEdit::Upsert {
                path: "new.txt".to_string(),
                mode: EntryMode::Blob,
                oid: new_blob,
            }],
        )
        .unwrap();
    let entries = repo.read_tree(new_tree).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert!(names.contains(&"hello.txt"));
    assert!(names.contains(&"new.txt"));
}

#[test]
fn edit_tree_remove_entry() {
    let (_dir, repo, _, tree_oid) = setup_repo_with_commit();
    let new_tree = repo
        .edit_tree(
            tree_oid,
            &[TreeEdit::Remove {
                path: "hello.txt".to_string(),
            }],
        )
        .unwrap();
    let entries = repo.read_tree(new_tree).unwrap();
    assert!(entries.is_empty());
}

#[test]
fn create_commit_with_parent() {
    let (_dir, repo, first_commit, _) = setup_repo_with_commit();
    let blob = repo.write_blob(b"second").unwrap();
    let tree = repo
        .write_tree(&[TreeEntry {
            name: "second.txt".to_string(),
            mode: EntryMode::Blob,
            oid: blob,
        }])
        .unwrap();
    let head_ref = RefName::new("refs/heads/main").unwrap();
    let second_commit = repo
        .create_commit(tree, &[first_commit], "second commit", &sig(), &sig(), Some(&head_ref))
        .unwrap();
    let info = repo.read_commit(second_commit).unwrap();
    assert_eq!(info.parents, vec![first_commit]);
    assert_eq!(info.message, "second commit");
}

// ===========================================================================
// 4. Index and checkout
// ===========================================================================

#[test]
fn write_read_index_roundtrip() {
    let (_dir, repo) = setup_repo();
    let blob_oid = repo.write_blob(b"indexed content").unwrap();
    let index_entries = vec![IndexEntry {
        path: "indexed.txt".to_string(),
        mode: EntryMode::Blob,
        oid: blob_oid,
    }];
    repo.write_index(&index_entries).unwrap();
    let read_back = repo.read_index().unwrap();
    assert_eq!(read_back.len(), 1);
    assert_eq!(read_back[0].path, "indexed.txt");
    assert_eq!(read_back[0].oid, blob_oid);
}

#[test]
fn checkout_into_creates_files() {
    let (dir, repo, _, tree_oid) = setup_repo_with_commit();
    let checkout_dir = dir.path().to_path_buf();
    repo.checkout_into(tree_oid, &checkout_dir).unwrap();
    let file_path = checkout_dir.join("hello.txt");
    assert!(file_path.exists(), "hello.txt should exist after checkout");
    let contents = std::fs::read_to_string(&file_path).unwrap();
    assert_eq!(contents, "hello world\n");
}

#[test]
fn index_add_and_remove() {
    let (dir, repo, _, tree_oid) = setup_repo_with_commit();
    repo.checkout_into(tree_oid, dir.path()).unwrap();
    std::fs::write(dir.path().join("hello.txt"), "new content").unwrap();
    repo.index_add("hello.txt").unwrap();
    let entries = repo.read_index().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(repo.read_blob(entries[0].oid).unwrap(), b"new content");

    repo.index_remove("hello.txt", None).unwrap();
    assert!(repo.read_index().unwrap().is_empty());
}

#[test]
fn unstage_all_resets_to_head() {
    let (dir, repo, _, tree_oid) = setup_repo_with_commit();
    repo.checkout_into(tree_oid, dir.path()).unwrap();
    std::fs::write(dir.path().join("extra.txt"), "extra").unwrap();
    repo.index_add("extra.txt").unwrap();
    assert_eq!(repo.read_index().unwrap().len(), 1);

    repo.unstage_all().unwrap();
    let entries = repo.read_index().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "hello.txt");
}

// ===========================================================================
// 5. Ancestry
// ===========================================================================

#[test]
fn is_ancestor_parent_of_child() {
    let (_dir, repo, first_commit, _) = setup_repo_with_commit();
    let blob = repo.write_blob(b"child").unwrap();
    let tree = repo
        .write_tree(&[TreeEntry {
            name: "child.txt".to_string(),
            mode: EntryMode::Blob,
            oid: blob,
        }])
        .unwrap();
    let child_commit = repo
        .create_commit(tree, &[first_commit], "child commit", &sig(), &sig(), None)
        .unwrap();

    assert!(repo.is_ancestor(first_commit, child_commit).unwrap());
}

#[test]
fn is_ancestor_child_not_ancestor_of_parent() {
    let (_dir, repo, first_commit, _) = setup_repo_with_commit();
    let blob = repo.write_blob(b"child").unwrap();
    let tree = repo
        .write_tree(&[TreeEntry {
            name: "child.txt".to_string(),
            mode: EntryMode::Blob,
            oid: blob,
        }])
        .unwrap();
    let child_commit = repo
        .create_commit(tree, &[first_commit], "child commit", &sig(), &sig(), None)
        .unwrap();

    assert!(!repo.is_ancestor(child_commit, first_commit).unwrap());
}

#[test]
fn merge_base_of_divergent_branches() {
    let (_dir, repo, root_commit, _) = setup_repo_with_commit();
    let blob_a = repo.write_blob(b"branch a").unwrap();
    let tree_a = repo
        .write_tree(&[TreeEntry {
            name: "a.txt".to_string(),
            mode: EntryMode::Blob,
            oid: blob_a,
        }])
        .unwrap();
    let commit_a = repo
        .create_commit(tree_a, &[root_commit], "branch a", &sig(), &sig(), None)
        .unwrap();

    let blob_b = repo.write_blob(b"branch b").unwrap();
    let tree_b = repo
        .write_tree(&[TreeEntry {
            name: "b.txt".to_string(),
            mode: EntryMode::Blob,
            oid: blob_b,
        }])
        .unwrap();
    let commit_b = repo
        .create_commit(tree_b, &[root_commit], "branch b", &sig(), &sig(), None)
        .unwrap();

    let base = repo.merge_base(commit_a, commit_b).unwrap();
    assert_eq!(base, Some(root_commit));
}

#[test]
fn merge_base_same_commit() {
    let (_dir, repo, commit_oid, _) = setup_repo_with_commit();
    let base = repo.merge_base(commit_oid, commit_oid).unwrap();
    assert_eq!(base, Some(commit_oid));
}
