//! One-to-one passthrough of FUSE calls onto the underlying worktree.
//!
//! Every other view (`current`, `history/<date>/<commit>`, `readonly`)
//! delegates ordinary file I/O to this one; only staging and write-access
//! policy differ between them.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// File metadata in the shape FUSE's `getattr` wants, independent of any
/// particular FUSE binding's struct layout.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileAttr {
    pub size: u64,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

/// Stateless passthrough operations rooted at a worktree directory.
pub struct PassthroughView {
    root: PathBuf,
}

impl PassthroughView {
    /// Build a view rooted at `root` (a worktree or history checkout directory).
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = path.strip_prefix('/').unwrap_or(path);
        self.root.join(path)
    }

    /// `lstat` on `path`, translated to [`FileAttr`].
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if `path` doesn't exist.
    pub fn getattr(&self, path: &str) -> Result<FileAttr, CoreError> {
        let full = self.resolve(path);
        let meta = std::fs::symlink_metadata(&full).map_err(|_| CoreError::NotFound {
            message: path.to_owned(),
        })?;
        Ok(FileAttr {
            size: meta.len(),
            mode: meta.permissions().mode(),
            nlink: meta.nlink() as u32,
            uid: meta.uid(),
            gid: meta.gid(),
            atime: meta.atime(),
            mtime: meta.mtime(),
            ctime: meta.ctime(),
        })
    }

    /// Directory listing, hiding `.git` and `.keep` the same way the
    /// original view does.
    ///
    /// # Errors
    /// Returns [`CoreError::Io`] if the directory can't be read.
    pub fn readdir(&self, path: &str) -> Result<Vec<String>, CoreError> {
        let full = self.resolve(path);
        let mut names = vec![".".to_owned(), "..".to_owned()];
        for entry in std::fs::read_dir(&full)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == ".git" || name == ".keep" {
                continue;
            }
            names.push(name);
        }
        Ok(names)
    }

    /// Read `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`CoreError::Io`] on I/O failure.
    pub fn read(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>, CoreError> {
        let full = self.resolve(path);
        let mut file = File::open(full)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        let n = file.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Write `data` at `offset`, returning the number of bytes written.
    ///
    /// # Errors
    /// Returns [`CoreError::Io`] on I/O failure.
    pub fn write(&self, path: &str, offset: u64, data: &[u8]) -> Result<usize, CoreError> {
        let full = self.resolve(path);
        let mut file = OpenOptions::new().write(true).open(full)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        Ok(data.len())
    }

    /// Resolve a symlink's target.
    ///
    /// # Errors
    /// Returns [`CoreError::Io`] if `path` isn't a symlink or can't be read.
    pub fn readlink(&self, path: &str) -> Result<PathBuf, CoreError> {
        Ok(std::fs::read_link(self.resolve(path))?)
    }

    /// Underlying filesystem path for `path`, for operations (`open`,
    /// `truncate`, etc.) best expressed directly against `std::fs`.
    #[must_use]
    pub fn full_path(&self, path: &str) -> PathBuf {
        self.resolve(path)
    }

    /// Whether `path` names a regular file, directory, or symlink that exists.
    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }
}

/// Whether `path` refers to a FIFO/socket/device rather than a regular
/// file, directory, or symlink — such entries are never staged.
#[must_use]
pub fn is_special_file(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| {
            let ft = m.file_type();
            ft.is_fifo() || ft.is_socket() || ft.is_block_device() || ft.is_char_device()
        })
        .unwrap_or(false)
}
