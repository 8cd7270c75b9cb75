//! Content-addressed local storage for LFS objects.
//!
//! Objects live under `<repo_path>/.git/lfs/objects/<oid[0:2]>/<oid[2:4]>/<oid>`,
//! matching the layout `git lfs` itself uses so that a real `git lfs
//! fetch`/`push` subprocess interoperates with objects GitFS wrote directly.

use std::path::{Path, PathBuf};

use crate::error::LfsError;

/// A local, content-addressed LFS object store rooted at a repository's
/// `.git/lfs/objects` directory.
#[derive(Clone, Debug)]
pub struct LfsStore {
    objects_dir: PathBuf,
}

impl LfsStore {
    /// Open the LFS object store for the repository at `repo_path`.
    #[must_use]
    pub fn new(repo_path: impl AsRef<Path>) -> Self {
        Self {
            objects_dir: repo_path.as_ref().join(".git").join("lfs").join("objects"),
        }
    }

    /// The on-disk path for an object with the given sha256 hex `oid`,
    /// whether or not it currently exists.
    #[must_use]
    pub fn object_path(&self, oid: &str) -> PathBuf {
        self.objects_dir.join(&oid[0..2]).join(&oid[2..4]).join(oid)
    }

    /// Whether the object named by `oid` exists locally.
    #[must_use]
    pub fn has_object(&self, oid: &str) -> bool {
        self.object_path(oid).is_file()
    }

    /// Read an object's content.
    ///
    /// # Errors
    /// Returns [`LfsError::ObjectNotFound`] if it isn't present locally.
    pub fn read_object(&self, oid: &str) -> Result<Vec<u8>, LfsError> {
        let path = self.object_path(oid);
        std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LfsError::ObjectNotFound { oid: oid.to_owned() }
            } else {
                LfsError::Io(e)
            }
        })
    }

    /// Store `data` under `oid`, creating parent directories as needed.
    ///
    /// # Errors
    /// Returns [`LfsError::Io`] on write failure.
    pub fn store_object(&self, oid: &str, data: &[u8]) -> Result<(), LfsError> {
        let path = self.object_path(oid);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_path_shards_by_oid_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = LfsStore::new(dir.path());
        let oid = "ab".to_owned() + "cd" + &"0".repeat(60);
        let path = store.object_path(&oid);
        assert!(path.ends_with(format!("ab/cd/{oid}")));
    }

    #[test]
    fn store_and_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LfsStore::new(dir.path());
        let oid = "f".repeat(64);
        store.store_object(&oid, b"payload").unwrap();
        assert!(store.has_object(&oid));
        assert_eq!(store.read_object(&oid).unwrap(), b"payload");
    }

    #[test]
    fn read_missing_object_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = LfsStore::new(dir.path());
        let oid = "0".repeat(64);
        assert!(matches!(
            store.read_object(&oid),
            Err(LfsError::ObjectNotFound { .. })
        ));
    }
}
