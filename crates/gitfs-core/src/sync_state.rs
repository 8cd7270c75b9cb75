//! The process-global synchronization state shared between the router,
//! `SyncWorker`, and `FetchWorker`.
//!
//! Mirrors the original mount tool's event set: a handful of named,
//! manual-reset events plus a writers counter, all coordinated through one
//! mutex + condvar pair so workers can block efficiently instead of
//! polling.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A manual-reset event: `set()`/`clear()` flip a boolean, `wait()` blocks
/// until it becomes `true` (optionally with a timeout).
struct Event {
    state: Mutex<bool>,
    condvar: Condvar,
}

impl Event {
    fn new(initial: bool) -> Self {
        Self {
            state: Mutex::new(initial),
            condvar: Condvar::new(),
        }
    }

    fn set(&self) {
        *self.state.lock() = true;
        self.condvar.notify_all();
    }

    fn clear(&self) {
        *self.state.lock() = false;
    }

    fn is_set(&self) -> bool {
        *self.state.lock()
    }

    /// Block until the event is set, or until `timeout` elapses. Returns
    /// whether the event was set (as opposed to timing out).
    fn wait(&self, timeout: Duration) -> bool {
        let mut guard = self.state.lock();
        if *guard {
            return true;
        }
        let result = self.condvar.wait_for(&mut guard, timeout);
        *guard && !result.timed_out()
    }
}

/// The named events coordinating `Router`, `SyncWorker`, and `FetchWorker`,
/// plus the writers counter used to tell whether the filesystem is idle.
///
/// All fields are `pub(crate)`-reachable through methods rather than direct
/// field access, so the locking discipline lives in one place.
pub struct SyncState {
    /// Set when the mount is tearing down; workers observe this and exit
    /// their main loops.
    shutting_down: Event,
    /// Set to request a fetch from `FetchWorker`'s perspective, and cleared
    /// once a fetch attempt starts. Also observed by `SyncWorker` to decide
    /// whether a fetch is owed before pushing.
    fetch: Event,
    /// Set when no FUSE operation has completed recently; `SyncWorker` uses
    /// this to decide it's safe to coalesce and commit queued writes.
    idle: Event,
    /// Set for the duration of a sync pass (commit + maybe push), so
    /// `FetchWorker` can avoid racing a concurrent git operation.
    syncing: Event,
    /// Set when the most recent sync pass completed cleanly.
    sync_done: Event,
    /// Set when the most recent fetch completed cleanly.
    fetch_successful: Event,
    /// Set when the most recent push completed cleanly (or wasn't needed).
    push_successful: Event,
    /// Held for the duration of any network git operation (fetch/push) so
    /// only one runs at a time.
    remote_operation: Mutex<()>,
    /// Count of file handles currently open for write. Non-zero means the
    /// worktree must be considered dirty even if no commit job is queued
    /// yet.
    writers: AtomicI64,
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncState {
    /// Construct a fresh state: nothing shutting down, nothing pending, idle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shutting_down: Event::new(false),
            fetch: Event::new(false),
            idle: Event::new(true),
            syncing: Event::new(false),
            sync_done: Event::new(false),
            fetch_successful: Event::new(true),
            push_successful: Event::new(true),
            remote_operation: Mutex::new(()),
            writers: AtomicI64::new(0),
        }
    }

    /// Signal every worker to stop and wake anything blocked on `fetch` or
    /// `idle` so shutdown isn't delayed by a sleeping worker.
    pub fn begin_shutdown(&self) {
        self.shutting_down.set();
        self.fetch.set();
        self.idle.set();
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.is_set()
    }

    /// Request a fetch (idempotent).
    pub fn request_fetch(&self) {
        self.fetch.set();
    }

    /// Clear the fetch request, typically right before `FetchWorker` starts
    /// a fetch attempt.
    pub fn clear_fetch_request(&self) {
        self.fetch.clear();
    }

    /// Block until a fetch is requested or `timeout` elapses.
    pub fn wait_for_fetch(&self, timeout: Duration) -> bool {
        self.fetch.wait(timeout)
    }

    /// Mark the filesystem as idle (no recent FUSE activity).
    pub fn mark_idle(&self) {
        self.idle.set();
    }

    /// Mark the filesystem as busy (a FUSE operation just ran).
    pub fn mark_busy(&self) {
        self.idle.clear();
    }

    /// Whether the filesystem is currently considered idle.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.idle.is_set()
    }

    /// Mark a sync pass as starting.
    pub fn begin_sync(&self) {
        self.syncing.set();
        self.sync_done.clear();
    }

    /// Mark a sync pass as finished.
    pub fn end_sync(&self) {
        self.syncing.clear();
        self.sync_done.set();
    }

    /// Whether a sync pass is currently in progress.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.syncing.is_set()
    }

    /// Record the outcome of the most recent fetch attempt.
    pub fn set_fetch_successful(&self, ok: bool) {
        if ok {
            self.fetch_successful.set();
        } else {
            self.fetch_successful.clear();
        }
    }

    /// Whether the most recent fetch attempt succeeded.
    #[must_use]
    pub fn fetch_successful(&self) -> bool {
        self.fetch_successful.is_set()
    }

    /// Record the outcome of the most recent push attempt.
    pub fn set_push_successful(&self, ok: bool) {
        if ok {
            self.push_successful.set();
        } else {
            self.push_successful.clear();
        }
    }

    /// Whether the most recent push attempt succeeded (or no push was owed).
    #[must_use]
    pub fn push_successful(&self) -> bool {
        self.push_successful.is_set()
    }

    /// Acquire the remote-operation lock for the duration of a fetch or push.
    pub fn remote_operation(&self) -> parking_lot::MutexGuard<'_, ()> {
        self.remote_operation.lock()
    }

    /// Record that a file handle was opened for write.
    pub fn writer_opened(&self) {
        self.writers.fetch_add(1, Ordering::SeqCst);
        self.mark_busy();
    }

    /// Record that a write-opened file handle was released.
    pub fn writer_closed(&self) {
        self.writers.fetch_sub(1, Ordering::SeqCst);
    }

    /// Number of file handles currently open for write.
    #[must_use]
    pub fn writer_count(&self) -> i64 {
        self.writers.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_and_not_shutting_down() {
        let state = SyncState::new();
        assert!(state.is_idle());
        assert!(!state.is_shutting_down());
    }

    #[test]
    fn writer_count_tracks_open_close() {
        let state = SyncState::new();
        state.writer_opened();
        state.writer_opened();
        assert_eq!(state.writer_count(), 2);
        state.writer_closed();
        assert_eq!(state.writer_count(), 1);
    }

    #[test]
    fn fetch_wait_times_out_when_not_requested() {
        let state = SyncState::new();
        let got = state.wait_for_fetch(Duration::from_millis(20));
        assert!(!got);
    }

    #[test]
    fn fetch_wait_returns_once_requested() {
        let state = SyncState::new();
        state.request_fetch();
        assert!(state.wait_for_fetch(Duration::from_millis(20)));
    }

    #[test]
    fn begin_shutdown_wakes_fetch_and_idle() {
        let state = SyncState::new();
        state.mark_busy();
        state.begin_shutdown();
        assert!(state.is_shutting_down());
        assert!(state.is_idle());
        assert!(state.wait_for_fetch(Duration::from_millis(20)));
    }
}
