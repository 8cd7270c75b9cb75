//! Error type for LFS operations.

use thiserror::Error;

/// Errors returned by [`crate::LfsStore`] and pointer operations.
#[derive(Debug, Error)]
pub enum LfsError {
    /// An I/O error while reading/writing an LFS object or pointer file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested LFS object does not exist in the local store.
    #[error("LFS object {oid} not found locally")]
    ObjectNotFound {
        /// The sha256 hex oid that was looked up.
        oid: String,
    },

    /// A `git lfs` CLI subprocess exited with a non-zero status.
    #[error("command `{command}` failed: {stderr}")]
    CliFailed {
        /// The command line that was run.
        command: String,
        /// Captured standard error output.
        stderr: String,
    },
}
