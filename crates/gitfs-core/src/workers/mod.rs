//! Background workers: the commit/sync loop and the fetch loop.

pub mod fetch_worker;
pub mod sync_worker;

pub use fetch_worker::{FetchWorker, FetchWorkerConfig};
pub use sync_worker::{SyncWorker, SyncWorkerConfig};
