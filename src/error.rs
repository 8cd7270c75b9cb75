//! Top-level error type for the `gitfs` binary.
//!
//! Wraps every layer's error type and maps each variant to the kernel errno
//! the FUSE adapter should surface, per the error taxonomy: `EACCES` for
//! ignored paths, `EROFS` for read-only views, `EFBIG` for oversized
//! writes, `EINVAL` for a rejected chmod mode, `ENOENT` for missing paths,
//! `ENOSYS` for unrouted/unsupported operations, `EIO` for anything lower
//! in the stack (git, LFS, raw I/O) that doesn't have a more specific
//! mapping.

use thiserror::Error;

use gitfs_core::CoreError;
use gitfs_git::GitError;
use gitfs_lfs::LfsError;

/// Errors that can surface while mounting or serving a GitFS mount.
#[derive(Debug, Error)]
pub enum GitFsError {
    /// Propagated from the router/views/workers layer.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Propagated from the git facade, outside of a `CoreError` wrapper
    /// (e.g. during the initial clone, before a `Router` exists to wrap it).
    #[error(transparent)]
    Git(#[from] GitError),

    /// Propagated from the LFS layer, outside of a `CoreError` wrapper.
    #[error(transparent)]
    Lfs(#[from] LfsError),

    /// Raw filesystem I/O, outside of a `CoreError` wrapper (e.g. creating
    /// the clone staging directory, applying the open-file rlimit).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An `-o key=value` mount option failed to parse.
    #[error("invalid mount option `{key}`: {message}")]
    InvalidOption {
        /// The option key that failed to parse.
        key: String,
        /// Why it failed.
        message: String,
    },

    /// The FUSE mount syscall itself failed (permission, missing mount
    /// point, kernel module not loaded, etc.).
    #[error("failed to mount at {mount_point}: {message}")]
    MountFailed {
        /// The mount point path.
        mount_point: String,
        /// Details from the underlying `fuser::mount2` error.
        message: String,
    },
}

impl GitFsError {
    /// The errno this error should be surfaced to the kernel as, when it
    /// reaches the FUSE adapter from a view operation. Mount-time-only
    /// variants (`InvalidOption`, `MountFailed`) map to `EIO` — they can
    /// never actually occur mid-operation, but every variant needs an
    /// answer for [`Self::errno`] to stay total.
    #[must_use]
    pub const fn errno(&self) -> libc::c_int {
        match self {
            Self::Core(CoreError::NoRoute { .. } | CoreError::UnsupportedOperation { .. }) => libc::ENOSYS,
            Self::Core(CoreError::ReadOnly { .. }) => libc::EROFS,
            Self::Core(CoreError::Ignored { .. }) => libc::EACCES,
            Self::Core(CoreError::FileTooLarge { .. }) => libc::EFBIG,
            Self::Core(CoreError::NotFound { .. }) => libc::ENOENT,
            Self::Core(CoreError::InvalidArgument { .. }) => libc::EINVAL,
            Self::Core(CoreError::Git(_) | CoreError::Lfs(_) | CoreError::Io(_))
            | Self::Git(_)
            | Self::Lfs(_)
            | Self::Io(_)
            | Self::InvalidOption { .. }
            | Self::MountFailed { .. } => libc::EIO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignored_maps_to_eacces() {
        let err = GitFsError::Core(CoreError::Ignored { path: "x".into() });
        assert_eq!(err.errno(), libc::EACCES);
    }

    #[test]
    fn read_only_maps_to_erofs() {
        let err = GitFsError::Core(CoreError::ReadOnly { path: "x".into() });
        assert_eq!(err.errno(), libc::EROFS);
    }

    #[test]
    fn too_large_maps_to_efbig() {
        let err = GitFsError::Core(CoreError::FileTooLarge {
            path: "x".into(),
            max_size: 10,
        });
        assert_eq!(err.errno(), libc::EFBIG);
    }

    #[test]
    fn invalid_argument_maps_to_einval() {
        let err = GitFsError::Core(CoreError::InvalidArgument { message: "bad".into() });
        assert_eq!(err.errno(), libc::EINVAL);
    }

    #[test]
    fn not_found_maps_to_enoent() {
        let err = GitFsError::Core(CoreError::NotFound { message: "x".into() });
        assert_eq!(err.errno(), libc::ENOENT);
    }

    #[test]
    fn no_route_maps_to_enosys() {
        let err = GitFsError::Core(CoreError::NoRoute { path: "/x".into() });
        assert_eq!(err.errno(), libc::ENOSYS);
    }
}
