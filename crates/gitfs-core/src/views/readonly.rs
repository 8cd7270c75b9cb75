//! Shared read-only policy used by `IndexView`, `HistoryView`, and `CommitView`.
//!
//! Every mutating FUSE operation on a read-only view fails `EROFS`; `open`
//! succeeds only for read-only flags. This module holds the handful of
//! error constructors so each read-only view doesn't repeat the message.

use crate::error::CoreError;

/// `O_WRONLY | O_RDWR | O_APPEND | O_CREAT`, matching the flags `open`
/// rejects on a read-only view.
pub const WRITE_FLAGS: i32 = libc::O_WRONLY | libc::O_RDWR | libc::O_APPEND | libc::O_CREAT;

/// Build the `EROFS` error every mutating op on a read-only view returns.
#[must_use]
pub fn read_only(path: &str) -> CoreError {
    CoreError::ReadOnly {
        path: path.to_owned(),
    }
}

/// Whether `flags` (as passed to `open`) request write access.
#[must_use]
pub fn wants_write(flags: i32) -> bool {
    flags & WRITE_FLAGS != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_write_intent_flags() {
        assert!(wants_write(libc::O_WRONLY));
        assert!(wants_write(libc::O_RDWR));
        assert!(!wants_write(libc::O_RDONLY));
    }
}
