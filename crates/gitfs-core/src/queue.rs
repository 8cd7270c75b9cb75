//! Bounded FIFO queue of pending staging jobs, drained and coalesced by
//! `SyncWorker` into a single commit.

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// A single staging request queued by the `current` view after a write,
/// rename, mkdir, etc.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitJob {
    /// The exact commit message this job would get if it lands alone
    /// (e.g., `"Update /path"`, `"Create the /dir directory"`). Used
    /// verbatim by `SyncWorker::commit` when a single job is coalesced by
    /// itself; otherwise discarded in favor of the generic coalesced
    /// formula.
    pub message: String,
    /// Paths to stage via `index.add`.
    pub add: Vec<String>,
    /// Paths to stage via `index.remove`.
    pub remove: Vec<String>,
}

impl CommitJob {
    /// A job that only adds paths (write, create, mkdir's `.keep`, fsync).
    #[must_use]
    pub fn add(message: impl Into<String>, paths: Vec<String>) -> Self {
        Self {
            message: message.into(),
            add: paths,
            remove: Vec::new(),
        }
    }

    /// A job that only removes paths (unlink, rmdir's per-file unlinks).
    #[must_use]
    pub fn remove(message: impl Into<String>, paths: Vec<String>) -> Self {
        Self {
            message: message.into(),
            add: Vec::new(),
            remove: paths,
        }
    }

    /// A job that both adds and removes a single path (rename).
    #[must_use]
    pub fn rename(old: String, new: String) -> Self {
        Self {
            message: format!("Rename {old} to {new}"),
            add: vec![new],
            remove: vec![old],
        }
    }
}

/// Default capacity, bounding memory if `SyncWorker` falls behind.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// A bounded, multi-producer single-consumer queue of [`CommitJob`]s.
pub struct CommitQueue {
    tx: Sender<CommitJob>,
    rx: Receiver<CommitJob>,
}

impl CommitQueue {
    /// Build a queue with the given bound.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Self { tx, rx }
    }

    /// Enqueue `job`. Drops the job (logging at the call site is the
    /// caller's job) if the queue is full rather than blocking a FUSE call.
    pub fn push(&self, job: CommitJob) -> Result<(), CommitJob> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job) | TrySendError::Disconnected(job)) => Err(job),
        }
    }

    /// Drain every job currently queued without blocking.
    pub fn drain(&self) -> Vec<CommitJob> {
        self.rx.try_iter().collect()
    }

    /// Whether the queue currently holds no jobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for CommitQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_drain_preserves_order() {
        let queue = CommitQueue::new(4);
        queue.push(CommitJob::add("Created", vec!["a".into()])).unwrap();
        queue.push(CommitJob::add("Created", vec!["b".into()])).unwrap();
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].add, vec!["a".to_string()]);
        assert_eq!(drained[1].add, vec!["b".to_string()]);
    }

    #[test]
    fn drain_on_empty_queue_is_empty() {
        let queue = CommitQueue::new(4);
        assert!(queue.drain().is_empty());
    }
}
