//! Git LFS pointer file codec.
//!
//! A pointer file is the small text blob git stores in place of the real
//! file content when it's tracked by LFS:
//!
//! ```text
//! version https://git-lfs.github.com/spec/v1
//! oid sha256:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393
//! size 12345
//! ```
//!
//! Pointer files are capped at [`MAX_POINTER_SIZE`] bytes — anything larger
//! can't be a pointer, so callers can cheaply rule it out before parsing.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::LfsError;

/// Pointer files are never larger than this; content beyond this size is
/// real file content, not a pointer.
pub const MAX_POINTER_SIZE: usize = 1024;

const VERSION_V1: &str = "https://git-lfs.github.com/spec/v1";
const VERSION_LEGACY: &str = "https://hawser.github.com/spec/v1";

/// A parsed Git LFS pointer: the hash and size of the real object it refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LfsPointer {
    /// The spec version URL found in the pointer (kept for round-tripping;
    /// new pointers always use [`VERSION_V1`]).
    pub version: String,
    /// The sha256 hex digest of the real object content.
    pub oid: String,
    /// Size of the real object, in bytes.
    pub size: u64,
}

impl LfsPointer {
    /// Parse `content` as a pointer file, if it looks like one.
    ///
    /// Returns `None` (not an error) when `content` is too large or
    /// malformed — callers use this to distinguish pointer files from real
    /// file content, not to validate a known-good pointer.
    #[must_use]
    pub fn from_content(content: &[u8]) -> Option<Self> {
        if content.len() > MAX_POINTER_SIZE {
            return None;
        }
        let text = std::str::from_utf8(content).ok()?;

        let mut version = None;
        let mut oid = None;
        let mut size = None;

        for line in text.lines() {
            let mut parts = line.splitn(2, char::is_whitespace);
            let key = parts.next()?.trim();
            let value = parts.next().unwrap_or("").trim();
            match key {
                "version" => version = Some(value.to_owned()),
                "oid" => oid = value.strip_prefix("sha256:").map(str::to_owned),
                "size" => size = value.parse::<u64>().ok(),
                _ => {}
            }
        }

        let version = version?;
        if version != VERSION_V1 && version != VERSION_LEGACY {
            return None;
        }
        let oid = oid?;
        if oid.len() != 64 || !oid.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let size = size?;

        Some(Self { version, oid, size })
    }

    /// Whether `content` looks like an LFS pointer file.
    #[must_use]
    pub fn is_pointer(content: &[u8]) -> bool {
        Self::from_content(content).is_some()
    }

    /// Serialize to the canonical pointer file text.
    #[must_use]
    pub fn to_content(&self) -> Vec<u8> {
        format!("version {}\noid sha256:{}\nsize {}\n", self.version, self.oid, self.size).into_bytes()
    }

    /// Compute the pointer for the file at `path` by streaming its content
    /// through sha256 in 4096-byte chunks.
    ///
    /// # Errors
    /// Returns [`LfsError::Io`] if the file can't be read.
    pub fn create_for_file(path: &Path) -> Result<Self, LfsError> {
        let mut file = std::fs::File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 4096];
        let mut size: u64 = 0;
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            size += n as u64;
        }
        let oid = hex::encode(hasher.finalize());
        Ok(Self {
            version: VERSION_V1.to_owned(),
            oid,
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// `from_content` must never panic, regardless of what garbage a
        /// file on disk happens to contain — it only ever returns `None` on
        /// malformed input.
        #[test]
        fn from_content_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..2048)) {
            let _ = LfsPointer::from_content(&bytes);
        }
    }

    #[test]
    fn roundtrip() {
        let ptr = LfsPointer {
            version: VERSION_V1.to_owned(),
            oid: "a".repeat(64),
            size: 42,
        };
        let content = ptr.to_content();
        let parsed = LfsPointer::from_content(&content).unwrap();
        assert_eq!(parsed, ptr);
    }

    #[test]
    fn rejects_oversized_content() {
        let content = vec![b'x'; MAX_POINTER_SIZE + 1];
        assert!(LfsPointer::from_content(&content).is_none());
    }

    #[test]
    fn rejects_non_pointer_text() {
        assert!(LfsPointer::from_content(b"just some regular file content\n").is_none());
    }

    #[test]
    fn rejects_bad_oid_length() {
        let text = format!("version {VERSION_V1}\noid sha256:deadbeef\nsize 10\n");
        assert!(LfsPointer::from_content(text.as_bytes()).is_none());
    }

    #[test]
    fn create_for_file_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"hello world").unwrap();
        let ptr = LfsPointer::create_for_file(&path).unwrap();
        assert_eq!(ptr.size, 11);
        assert_eq!(
            ptr.oid,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }
}
