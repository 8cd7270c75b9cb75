//! `gitfs` library crate — mount configuration, error handling, logging, the
//! FUSE binding, and the mount driver. The `gitfs` binary is a thin CLI
//! wrapper over [`mount::run`].

pub mod config;
pub mod error;
pub mod fuse_adapter;
pub mod mount;
pub mod telemetry;
