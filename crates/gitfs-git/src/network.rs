//! Network operations (clone, fetch, push) via `git` CLI subprocess.
//!
//! Push was the one operation the upstream crate kept as a CLI subprocess
//! because gix does not yet provide a high-level push API. GitFS needs
//! clone and fetch too, and gix's network transport isn't enabled in this
//! crate's feature set either, so all three go through the same subprocess
//! path for consistency.

use std::path::Path;
use std::process::{Command, Output};

use crate::credentials::Credentials;
use crate::error::GitError;

fn run(mut cmd: Command) -> Result<Output, GitError> {
    let program = format!("{:?}", cmd);
    let output = cmd.output().map_err(GitError::IoError)?;
    if !output.status.success() {
        return Err(GitError::CliFailed {
            command: program,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(output)
}

/// Clone `remote_url` into `dest`, checking out `branch`. An empty `branch`
/// clones the remote's own default branch instead of pinning one.
///
/// # Errors
/// Returns [`GitError::CloneFailed`] if the subprocess fails.
pub fn clone(
    remote_url: &str,
    dest: &Path,
    branch: &str,
    credentials: &Credentials,
) -> Result<(), GitError> {
    let url = credentials.apply_to_url(remote_url);
    let mut cmd = Command::new("git");
    cmd.arg("clone");
    if !branch.is_empty() {
        cmd.args(["--branch", branch]);
    }
    cmd.args(["--origin", "origin"]).arg(&url).arg(dest);
    credentials.apply_to_command(&mut cmd);
    run(cmd).map_err(|e| GitError::CloneFailed {
        url: remote_url.to_owned(),
        message: e.to_string(),
    })?;
    Ok(())
}

/// The branch checked out at `repo_path` right now (`git symbolic-ref
/// --short HEAD`), used to learn the remote's default branch name after an
/// unpinned clone.
///
/// # Errors
/// Returns [`GitError::CliFailed`] if HEAD isn't a branch (detached).
pub fn current_branch(repo_path: &Path) -> Result<String, GitError> {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(repo_path).args(["symbolic-ref", "--short", "HEAD"]);
    let output = run(cmd)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

/// Fetch `branch` from `remote` into the repository at `repo_path`.
///
/// # Errors
/// Returns [`GitError::FetchFailed`] if the subprocess fails.
pub fn fetch(
    repo_path: &Path,
    remote: &str,
    branch: &str,
    credentials: &Credentials,
) -> Result<(), GitError> {
    let mut cmd = Command::new("git");
    cmd.arg("-C")
        .arg(repo_path)
        .args(["fetch", remote, branch]);
    credentials.apply_to_command(&mut cmd);
    run(cmd).map_err(|e| GitError::FetchFailed {
        remote: remote.to_owned(),
        message: e.to_string(),
    })?;
    Ok(())
}

/// Push `branch` to `remote` from the repository at `repo_path`.
///
/// # Errors
/// Returns [`GitError::PushFailed`] if the subprocess fails or is rejected
/// (e.g., non-fast-forward).
pub fn push(
    repo_path: &Path,
    remote: &str,
    branch: &str,
    credentials: &Credentials,
) -> Result<(), GitError> {
    let mut cmd = Command::new("git");
    cmd.arg("-C")
        .arg(repo_path)
        .args(["push", remote, branch]);
    credentials.apply_to_command(&mut cmd);
    run(cmd).map_err(|e| GitError::PushFailed {
        remote: remote.to_owned(),
        message: e.to_string(),
    })?;
    Ok(())
}
