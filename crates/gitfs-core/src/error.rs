//! Error type for `gitfs-core` — the router, views, and background workers.

use thiserror::Error;

use gitfs_git::GitError;
use gitfs_lfs::LfsError;

/// Errors produced by the router, views, and workers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Propagated from the git layer.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Propagated from the LFS layer.
    #[error(transparent)]
    Lfs(#[from] LfsError),

    /// Propagated from filesystem I/O.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No route matched the requested path. Maps to `ENOSYS` at the FUSE boundary.
    #[error("no route for path '{path}'")]
    NoRoute {
        /// The path that failed to match any route.
        path: String,
    },

    /// The matched view does not implement the requested operation. Maps to
    /// `ENOSYS` at the FUSE boundary — mirrors `AttributeError` in the
    /// original router dispatch.
    #[error("operation '{operation}' not supported by this path")]
    UnsupportedOperation {
        /// The FUSE operation name (`write`, `mkdir`, etc.).
        operation: String,
    },

    /// A write was attempted against a read-only view (`history`). Maps to `EROFS`.
    #[error("'{path}' is read-only")]
    ReadOnly {
        /// The path that was written to.
        path: String,
    },

    /// A mutating operation touched a path matched by the ignore set. Maps to `EACCES`.
    #[error("'{path}' is ignored")]
    Ignored {
        /// The path that matched the ignore set.
        path: String,
    },

    /// A write would exceed the configured maximum file size. Maps to `EFBIG`.
    #[error("write to '{path}' exceeds max_size ({max_size} bytes)")]
    FileTooLarge {
        /// The path being written.
        path: String,
        /// The configured maximum, in bytes.
        max_size: u64,
    },

    /// A path or object was not found. Maps to `ENOENT`.
    #[error("not found: {message}")]
    NotFound {
        /// Description of what was missing.
        message: String,
    },

    /// An argument was invalid (e.g., an unsupported chmod mode string). Maps to `EINVAL`.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of what was invalid.
        message: String,
    },
}
