//! Background worker that periodically fetches from the remote.
//!
//! Mirrors the original `FetchWorker`: block on the `fetch` event (either
//! requested explicitly by `SyncWorker` after a failed push, or timing out
//! after `idle_timeout` so the mount notices upstream changes even with no
//! local activity), then run one fetch under the shared remote-operation lock.

use std::sync::Arc;
use std::time::Duration;

use gitfs_git::Repository;

use crate::sync_state::SyncState;

/// Configuration for a [`FetchWorker`].
#[derive(Clone, Debug)]
pub struct FetchWorkerConfig {
    /// Remote name to fetch from.
    pub remote: String,
    /// Branch to fetch.
    pub branch: String,
    /// How long to wait for an explicit fetch request before fetching anyway.
    pub idle_timeout: Duration,
}

/// Periodically fetches from the remote, tracking success in [`SyncState`].
pub struct FetchWorker {
    repo: Arc<Repository>,
    state: Arc<SyncState>,
    config: FetchWorkerConfig,
}

impl FetchWorker {
    /// Build a new worker. Does not spawn a thread — call [`FetchWorker::work`]
    /// on a dedicated thread.
    #[must_use]
    pub fn new(repo: Arc<Repository>, state: Arc<SyncState>, config: FetchWorkerConfig) -> Self {
        Self { repo, state, config }
    }

    /// Main loop: wait for a fetch to be owed (explicit request or timeout),
    /// fetch, repeat until shutdown.
    pub fn work(&self) {
        loop {
            if self.state.is_shutting_down() {
                break;
            }
            self.state.wait_for_fetch(self.config.idle_timeout);
            if self.state.is_shutting_down() {
                break;
            }
            self.fetch();
        }
    }

    fn fetch(&self) {
        let _guard = self.state.remote_operation();
        self.state.clear_fetch_request();

        match self.repo.fetch(&self.config.remote, &self.config.branch) {
            Ok(()) => self.state.set_fetch_successful(true),
            Err(err) => {
                tracing::warn!(error = %err, "fetch failed");
                self.state.set_fetch_successful(false);
            }
        }
    }
}
