//! Reading ambient git/user configuration for CLI identity defaults.
//!
//! Mirrors `get_current_user`/`get_current_email` from the original mount
//! tool: when the CLI isn't given explicit `--committer-name`/
//! `--committer-email` options, fall back to `git config user.name`/
//! `user.email`, then to the OS account name and `user@hostname`.

use std::process::Command;

use crate::types::Signature;

/// Best-effort resolution of the current user's git identity, for use as a
/// default committer when the caller hasn't configured one explicitly.
#[must_use]
pub fn default_identity() -> Signature {
    let name = git_config("user.name").unwrap_or_else(os_user_name);
    let email = git_config("user.email").unwrap_or_else(|| format!("{}@{}", os_user_name(), hostname()));
    Signature::new(name, email)
}

fn git_config(key: &str) -> Option<String> {
    let output = Command::new("git").args(["config", "--get", key]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8(output.stdout).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

fn os_user_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "root".to_owned())
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_owned())
}
