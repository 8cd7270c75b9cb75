//! Git abstraction layer for GitFS.
//!
//! This crate defines [`Repository`] — the single interface through which
//! every GitFS view and worker interacts with git. No other GitFS crate
//! should import gix directly; instead, they depend on `gitfs-git` and
//! program against this facade.
//!
//! Local, object-level work (reading/writing blobs, trees, commits, refs,
//! the index, and checkout) goes through [gix]. Operations that require
//! talking to a remote (clone, fetch, push) shell out to the `git` CLI
//! instead — see [`network`] for why.
//!
//! # Crate layout
//!
//! - [`repository`] — the [`Repository`] facade.
//! - [`types`] — value types used in its signatures ([`GitOid`], [`RefName`],
//!   [`TreeEntry`], [`Signature`], etc.).
//! - [`error`] — the [`GitError`] enum returned by all facade methods.
//! - [`credentials`] — the [`Credentials`] enum for remote authentication.
//! - [`config`] — ambient git/OS identity resolution for CLI defaults.

mod checkout_impl;
pub mod config;
pub mod credentials;
pub mod error;
mod index_impl;
mod network;
mod objects_impl;
mod oid;
mod refs_impl;
pub mod repository;
pub mod types;

pub use credentials::Credentials;
pub use error::GitError;
pub use repository::Repository;
pub use types::{
    CommitInfo, EntryMode, GitOid, IndexEntry, OidParseError, RefEdit, RefName, RefNameError,
    Signature, TreeEdit, TreeEntry,
};
