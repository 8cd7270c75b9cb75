//! Background worker that coalesces queued staging jobs into commits and
//! keeps the local branch in sync with the remote.
//!
//! Mirrors the original `SyncWorker`: on each wake, skip committing while a
//! writer is still active, otherwise drain the queue into one commit, then
//! decide whether a sync (fetch-driven merge + push) is owed.

use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use gitfs_git::{RefName, Repository, Signature};

use crate::error::CoreError;
use crate::merge::accept_mine;
use crate::queue::{CommitJob, CommitQueue};
use crate::sync_state::SyncState;

/// Configuration for a [`SyncWorker`], mirroring the identity and timing
/// options accepted on the mount command line.
#[derive(Clone, Debug)]
pub struct SyncWorkerConfig {
    /// Remote name to fetch/push against (always `"origin"` in practice).
    pub remote: String,
    /// Branch name mirrored between `current` and the remote.
    pub branch: String,
    /// Identity attached to commits GitFS creates on the user's behalf.
    pub author: Signature,
    /// Identity attached as committer (may differ from `author` when a
    /// service account commits on behalf of a human).
    pub committer: Signature,
    /// How often `work()` wakes up to check for pending jobs when otherwise idle.
    pub idle_timeout: Duration,
}

/// Coalesces [`CommitJob`]s into commits and syncs with the remote.
pub struct SyncWorker {
    repo: Arc<Repository>,
    queue: Arc<CommitQueue>,
    state: Arc<SyncState>,
    config: SyncWorkerConfig,
}

impl SyncWorker {
    /// Build a new worker. Does not spawn a thread — call [`SyncWorker::work`]
    /// on a dedicated thread.
    #[must_use]
    pub fn new(
        repo: Arc<Repository>,
        queue: Arc<CommitQueue>,
        state: Arc<SyncState>,
        config: SyncWorkerConfig,
    ) -> Self {
        Self {
            repo,
            queue,
            state,
            config,
        }
    }

    /// Main loop: run until shutdown is requested, doing one final pass on
    /// the way out so nothing queued is lost.
    pub fn work(&self) {
        loop {
            sleep(self.config.idle_timeout);
            self.on_idle();
            if self.state.is_shutting_down() {
                break;
            }
        }
    }

    /// One iteration: commit anything queued (unless a write is still in
    /// flight), then sync with the remote if a fetch or push is owed.
    fn on_idle(&self) {
        if self.state.writer_count() > 0 {
            return;
        }

        let jobs = self.queue.drain();
        if !jobs.is_empty() {
            if let Err(err) = self.commit(&jobs) {
                tracing::warn!(error = %err, "commit failed, will retry next cycle");
                return;
            }
        }

        if self.repo.behind() || !self.state.fetch_successful() || self.need_to_push().unwrap_or(false) {
            if let Err(err) = self.sync() {
                tracing::warn!(error = %err, "sync failed");
            }
        }
    }

    fn need_to_push(&self) -> Result<bool, CoreError> {
        Ok(self.repo.ahead(&self.config.remote, &self.config.branch)? > 0)
    }

    /// Coalesce `jobs` into a single commit, building a message of the form
    /// `"Update K items. Added A items. Removed R items."`, omitting any
    /// clause whose count is zero. Rewinds the branch ref if the commit
    /// can't be created (e.g., an empty tree with nothing to commit).
    fn commit(&self, jobs: &[CommitJob]) -> Result<(), CoreError> {
        let branch_ref = RefName::branch(&self.config.branch);
        let old_head = self.repo.read_ref(&branch_ref)?;

        let mut added = std::collections::BTreeSet::new();
        let mut removed = std::collections::BTreeSet::new();
        let mut total_added = 0usize;
        let mut total_removed = 0usize;

        for job in jobs {
            for path in &job.add {
                added.insert(path.clone());
                total_added += 1;
            }
            for path in &job.remove {
                removed.insert(path.clone());
                total_removed += 1;
            }
        }
        // K is the number of distinct paths touched either way, not the
        // sum of per-job counts — a path added then removed (or vice versa)
        // within the same batch is still one touched path.
        let touched = added.union(&removed).count();

        // A path both added and removed across the batch (e.g., rename) is
        // only staged as a removal.
        let mut staged_adds = added.clone();
        staged_adds.retain(|p| !removed.contains(p));

        for path in &staged_adds {
            self.repo.index_add(path)?;
        }
        for path in &removed {
            self.repo.index_remove(path, None)?;
        }

        // A single staged job lands verbatim; a batch of several gets the
        // generic coalesced summary instead of trying to merge N distinct
        // literal messages into one sentence.
        let message = match jobs {
            [only] => only.message.clone(),
            _ => coalesce_message(touched, total_added, total_removed),
        };

        let result = self.repo.commit(&message, &self.config.author, &self.config.committer, &branch_ref);
        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                if let Some(old) = old_head {
                    let _ = self.repo.create_reference(&branch_ref, old, true);
                }
                Err(err.into())
            }
        }
    }

    /// Fetch-driven merge and push. If the local branch has diverged from
    /// the last-known remote tip, reconcile with [`accept_mine`] before
    /// pushing.
    fn sync(&self) -> Result<(), CoreError> {
        let _guard = self.state.remote_operation();
        self.state.begin_sync();

        let result = (|| -> Result<(), CoreError> {
            if self.repo.behind() {
                let remote_ref = RefName::remote_branch(&self.config.remote, &self.config.branch);
                if let Some(remote_tip) = self.repo.read_ref(&remote_ref)? {
                    let branch_ref = RefName::branch(&self.config.branch);
                    accept_mine(&self.repo, &branch_ref, remote_tip, &self.config.committer)?;
                    self.repo.checkout_head(self.repo.read_ref(&branch_ref)?.expect("just wrote it"))?;
                    self.repo.unstage_all()?;
                }
            }

            if self.need_to_push()? {
                push_with_backoff(&self.repo, &self.config.remote, &self.config.branch)?;
            }
            Ok(())
        })();

        self.state.end_sync();
        match result {
            Ok(()) => {
                self.state.set_push_successful(true);
                Ok(())
            }
            Err(err) => {
                self.state.set_push_successful(false);
                self.state.request_fetch();
                Err(err)
            }
        }
    }
}

/// Maximum push attempts before giving up and surfacing the last error.
const MAX_PUSH_ATTEMPTS: u32 = 5;

/// Push with exponential backoff plus jitter between attempts: `2**attempt +
/// random(0, 1)` seconds, matching the original sync worker's retry policy.
fn push_with_backoff(repo: &Repository, remote: &str, branch: &str) -> Result<(), CoreError> {
    let mut last_err = None;
    for attempt in 0..MAX_PUSH_ATTEMPTS {
        match repo.push(remote, branch) {
            Ok(()) => return Ok(()),
            Err(err) => {
                tracing::warn!(attempt, error = %err, "push attempt failed");
                last_err = Some(err);
                if attempt + 1 < MAX_PUSH_ATTEMPTS {
                    let backoff = 2f64.powi(attempt as i32) + rand::random::<f64>();
                    sleep(Duration::from_secs_f64(backoff));
                }
            }
        }
    }
    Err(last_err.expect("loop runs at least once").into())
}

fn coalesce_message(updated: usize, added: usize, removed: usize) -> String {
    let mut parts = Vec::new();
    if updated > 0 {
        parts.push(format!("Update {updated} items."));
    }
    if added > 0 {
        parts.push(format!("Added {added} items."));
    }
    if removed > 0 {
        parts.push(format!("Removed {removed} items."));
    }
    if parts.is_empty() {
        "Update 0 items.".to_owned()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesce_message_omits_zero_clauses() {
        assert_eq!(coalesce_message(3, 0, 0), "Update 3 items.");
        assert_eq!(coalesce_message(0, 2, 1), "Added 2 items. Removed 1 items.");
    }

    #[test]
    fn coalesce_message_all_clauses() {
        assert_eq!(
            coalesce_message(1, 2, 3),
            "Update 1 items. Added 2 items. Removed 3 items."
        );
    }
}
