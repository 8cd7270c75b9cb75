//! Core domain logic for GitFS: the router and its views, the commit and
//! ignore caches backing them, the bounded commit queue, the accept-mine
//! merge strategy, and the background sync/fetch workers.
//!
//! The root `gitfs` crate wires this together with a `fuser::Filesystem`
//! adapter and the CLI; everything in this crate is FUSE-binding-agnostic.

pub mod commit_cache;
pub mod error;
pub mod ignore;
pub mod merge;
pub mod queue;
pub mod router;
pub mod sync_state;
pub mod view_cache;
pub mod views;
pub mod workers;

pub use commit_cache::{CachedCommit, CommitCache};
pub use error::CoreError;
pub use ignore::CachedIgnore;
pub use merge::accept_mine;
pub use queue::{CommitJob, CommitQueue};
pub use router::{normalize_path, Resolved, Router};
pub use sync_state::SyncState;
pub use view_cache::ViewCache;
pub use views::{CommitView, CurrentView, FileAttr, HistoryView, IndexView, PassthroughView};
pub use workers::{FetchWorker, FetchWorkerConfig, SyncWorker, SyncWorkerConfig};
