//! Git LFS pointer codec and local object store for GitFS.
//!
//! GitFS never speaks the LFS HTTP batch API directly: fetching and pushing
//! LFS objects is delegated to the `git lfs` CLI, exactly like the project
//! this was distilled from. This crate only owns the parts that need to run
//! inline with a filesystem write: pointer encode/decode, the local
//! content-addressed store, and the should-this-file-use-LFS decision.

pub mod error;
pub mod hook;
pub mod pointer;
pub mod store;

pub use error::LfsError;
pub use hook::{GitLfs, LfsHook, DEFAULT_SIZE_THRESHOLD};
pub use pointer::{LfsPointer, MAX_POINTER_SIZE};
pub use store::LfsStore;
