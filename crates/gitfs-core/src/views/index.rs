//! The mount root when `current_path != "/"`: a synthetic two-entry
//! directory pointing at `current` and `history`.
//!
//! Grounded in `views/index.py`: entirely static, no filesystem access.

use crate::error::CoreError;
use crate::views::passthrough::FileAttr;
use crate::views::readonly::read_only;

/// Root directory listing the `current` and `history` mount points.
pub struct IndexView {
    current_path: String,
    history_path: String,
    uid: u32,
    gid: u32,
    /// Mount start time (seconds since epoch), used for atime/ctime/mtime.
    mount_time: i64,
}

impl IndexView {
    /// Build an `IndexView` for the given mount-relative child names.
    #[must_use]
    pub fn new(current_path: String, history_path: String, uid: u32, gid: u32, mount_time: i64) -> Self {
        Self {
            current_path,
            history_path,
            uid,
            gid,
            mount_time,
        }
    }

    /// `getattr("/")` returns a directory entry; anything else is `ENOENT`.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] for any path other than `/`.
    pub fn getattr(&self, path: &str) -> Result<FileAttr, CoreError> {
        if path != "/" {
            return Err(CoreError::NotFound {
                message: path.to_owned(),
            });
        }
        Ok(FileAttr {
            size: 0,
            mode: libc::S_IFDIR | 0o555,
            nlink: 2,
            uid: self.uid,
            gid: self.gid,
            atime: self.mount_time,
            mtime: self.mount_time,
            ctime: self.mount_time,
        })
    }

    /// Always yields exactly `[".", "..", current_path, history_path]`.
    #[must_use]
    pub fn readdir(&self) -> Vec<String> {
        vec![
            ".".to_owned(),
            "..".to_owned(),
            self.current_path.clone(),
            self.history_path.clone(),
        ]
    }

    /// Every mutating operation on the index root fails `EROFS`.
    ///
    /// # Errors
    /// Always returns [`CoreError::ReadOnly`].
    pub fn write(&self, path: &str) -> Result<(), CoreError> {
        Err(read_only(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> IndexView {
        IndexView::new("current".into(), "history".into(), 1000, 1000, 0)
    }

    #[test]
    fn root_is_directory_mode_0555() {
        let attr = view().getattr("/").unwrap();
        assert_eq!(attr.mode, libc::S_IFDIR | 0o555);
        assert_eq!(attr.nlink, 2);
    }

    #[test]
    fn non_root_is_not_found() {
        assert!(view().getattr("/anything").is_err());
    }

    #[test]
    fn readdir_yields_exactly_four_entries() {
        let entries = view().readdir();
        assert_eq!(entries, vec![".", "..", "current", "history"]);
    }

    #[test]
    fn write_is_read_only() {
        assert!(matches!(
            view().write("/current"),
            Err(CoreError::ReadOnly { .. })
        ));
    }
}
