//! Binds [`gitfs_core::Router`] to the [`fuser::Filesystem`] trait.
//!
//! This module owns nothing about git, merge policy, or staging — every call
//! here does three things: turn `(parent_ino, name)` or `ino` into a
//! mount-relative path, ask the router which view owns that path, and
//! translate the view's [`gitfs_core::FileAttr`]/[`CoreError`] result into
//! the `fuser` reply type. The inode table exists only because FUSE talks in
//! inodes; every view underneath still talks in paths.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr as FuseAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use parking_lot::Mutex;

use gitfs_core::{CoreError, FileAttr, Resolved, Router};

/// Attribute cache lifetime handed back to the kernel. Short, since
/// `current` can be mutated by the sync worker out from under an open mount.
const ATTR_TTL: Duration = Duration::from_secs(1);

const ROOT_INODE: u64 = 1;

/// Bidirectional path/inode map. The root is always inode 1; every other
/// path gets an inode assigned on first `lookup`/`readdir` and keeps it for
/// the life of the mount (`forget` only drops the entry, it never recycles
/// the number).
struct InodeTable {
    path_to_ino: HashMap<String, u64>,
    ino_to_path: HashMap<u64, String>,
    next_ino: u64,
}

impl InodeTable {
    fn new() -> Self {
        let mut path_to_ino = HashMap::new();
        let mut ino_to_path = HashMap::new();
        path_to_ino.insert("/".to_owned(), ROOT_INODE);
        ino_to_path.insert(ROOT_INODE, "/".to_owned());
        Self {
            path_to_ino,
            ino_to_path,
            next_ino: ROOT_INODE + 1,
        }
    }

    fn path(&self, ino: u64) -> Option<String> {
        self.ino_to_path.get(&ino).cloned()
    }

    fn ino_for(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.path_to_ino.get(path) {
            return ino;
        }
        let ino = self.next_ino;
        self.next_ino += 1;
        self.path_to_ino.insert(path.to_owned(), ino);
        self.ino_to_path.insert(ino, path.to_owned());
        ino
    }

    fn forget(&mut self, ino: u64) {
        if ino == ROOT_INODE {
            return;
        }
        if let Some(path) = self.ino_to_path.remove(&ino) {
            self.path_to_ino.remove(&path);
        }
    }
}

fn join(parent: &str, name: &OsStr) -> String {
    let name = name.to_string_lossy();
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

fn system_time(secs: i64) -> SystemTime {
    if secs <= 0 {
        SystemTime::UNIX_EPOCH
    } else {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64)
    }
}

fn to_fuse_attr(ino: u64, attr: &FileAttr) -> FuseAttr {
    let kind = match attr.mode & libc::S_IFMT {
        libc::S_IFDIR => FileType::Directory,
        libc::S_IFLNK => FileType::Symlink,
        _ => FileType::RegularFile,
    };
    FuseAttr {
        ino,
        size: attr.size,
        blocks: attr.size.div_ceil(512),
        atime: system_time(attr.atime),
        mtime: system_time(attr.mtime),
        ctime: system_time(attr.ctime),
        crtime: system_time(attr.ctime),
        kind,
        perm: (attr.mode & 0o7777) as u16,
        nlink: attr.nlink.max(1),
        uid: attr.uid,
        gid: attr.gid,
        rdev: 0,
        blksize: 4096,
        flags: 0,
    }
}

/// Standard reply for an operation rejected before it reached a view (bad
/// inode, etc.).
///
/// `CoreError` doesn't derive `Clone` (its `Git`/`Lfs`/`Io` sources don't), so
/// this matches the discriminant directly instead of routing through
/// `GitFsError::from`, which would need an owned value.
fn errno_of(err: &CoreError) -> i32 {
    match err {
        CoreError::NoRoute { .. } | CoreError::UnsupportedOperation { .. } => libc::ENOSYS,
        CoreError::ReadOnly { .. } => libc::EROFS,
        CoreError::Ignored { .. } => libc::EACCES,
        CoreError::FileTooLarge { .. } => libc::EFBIG,
        CoreError::NotFound { .. } => libc::ENOENT,
        CoreError::InvalidArgument { .. } => libc::EINVAL,
        CoreError::Git(_) | CoreError::Lfs(_) | CoreError::Io(_) => libc::EIO,
    }
}

/// `fuser::Filesystem` adapter over a [`Router`].
pub struct GitFsFilesystem {
    router: Arc<Router>,
    inodes: Mutex<InodeTable>,
}

impl GitFsFilesystem {
    #[must_use]
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            inodes: Mutex::new(InodeTable::new()),
        }
    }

    fn path_of(&self, ino: u64) -> Option<String> {
        self.inodes.lock().path(ino)
    }

    fn ino_for(&self, path: &str) -> u64 {
        self.inodes.lock().ino_for(path)
    }

    fn getattr_at(&self, path: &str) -> Result<FileAttr, CoreError> {
        match self.router.resolve(path)? {
            Resolved::Index(view) => view.getattr(path),
            Resolved::History { view, relative } => view.getattr(&relative),
            Resolved::Commit { view, relative } => view.getattr(&relative),
            Resolved::Current { view, relative } => view.getattr(&relative),
        }
    }

    fn readdir_at(&self, path: &str) -> Result<Vec<String>, CoreError> {
        match self.router.resolve(path)? {
            Resolved::Index(view) => Ok(view.readdir()),
            Resolved::History { view, relative } => view.readdir(&relative),
            Resolved::Commit { view, relative } => view.readdir(&relative),
            Resolved::Current { view, relative } => view.readdir(&relative),
        }
    }

    fn read_at(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>, CoreError> {
        match self.router.resolve(path)? {
            Resolved::Index(_) => Err(CoreError::UnsupportedOperation {
                operation: "read".to_owned(),
            }),
            Resolved::History { .. } => Err(CoreError::UnsupportedOperation {
                operation: "read".to_owned(),
            }),
            Resolved::Commit { view, relative } => view.read(&relative, offset, len),
            Resolved::Current { view, relative } => view.read(&relative, offset, len),
        }
    }

    /// Resolve to a `CurrentView` for a mutating op, or surface the
    /// read-only view's own `EROFS` for anything else.
    fn require_current(&self, path: &str) -> Result<(Arc<gitfs_core::CurrentView>, String), CoreError> {
        match self.router.resolve(path)? {
            Resolved::Current { view, relative } => Ok((view, relative)),
            Resolved::Index(view) => Err(view.write(path).unwrap_err()),
            Resolved::History { view, .. } => Err(view.write(path).unwrap_err()),
            Resolved::Commit { view, .. } => Err(view.write(path).unwrap_err()),
        }
    }
}

impl Filesystem for GitFsFilesystem {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(parent_path) = self.path_of(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = join(&parent_path, name);
        match self.getattr_at(&path) {
            Ok(attr) => {
                let ino = self.ino_for(&path);
                reply.entry(&ATTR_TTL, &to_fuse_attr(ino, &attr), 0);
            }
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, _nlookup: u64) {
        self.inodes.lock().forget(ino);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let Some(path) = self.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.getattr_at(&path) {
            Ok(attr) => reply.attr(&ATTR_TTL, &to_fuse_attr(ino, &attr)),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        _size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let Some(path) = self.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        if let Some(mode) = mode {
            let result = self
                .require_current(&path)
                .and_then(|(view, relative)| view.chmod(&relative, mode));
            if let Err(err) = result {
                reply.error(errno_of(&err));
                return;
            }
        }
        match self.getattr_at(&path) {
            Ok(attr) => reply.attr(&ATTR_TTL, &to_fuse_attr(ino, &attr)),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let Some(path) = self.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.read_at(&path, 0, 4096) {
            Ok(data) => reply.data(&data),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn mkdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, _mode: u32, _umask: u32, reply: ReplyEntry) {
        let Some(parent_path) = self.path_of(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = join(&parent_path, name);
        let result = self
            .require_current(&path)
            .and_then(|(view, relative)| view.mkdir(&relative));
        match result {
            Ok(()) => match self.getattr_at(&path) {
                Ok(attr) => {
                    let ino = self.ino_for(&path);
                    reply.entry(&ATTR_TTL, &to_fuse_attr(ino, &attr), 0);
                }
                Err(err) => reply.error(errno_of(&err)),
            },
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(parent_path) = self.path_of(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = join(&parent_path, name);
        let result = self
            .require_current(&path)
            .and_then(|(view, relative)| view.unlink(&relative));
        match result {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(parent_path) = self.path_of(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = join(&parent_path, name);
        let result = self
            .require_current(&path)
            .and_then(|(view, relative)| view.rmdir(&relative));
        match result {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        link: &std::path::Path,
        reply: ReplyEntry,
    ) {
        let Some(parent_path) = self.path_of(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = join(&parent_path, name);
        let target = link.to_string_lossy().into_owned();
        let result = self
            .require_current(&path)
            .and_then(|(view, relative)| view.symlink(&relative, &target));
        match result {
            Ok(()) => match self.getattr_at(&path) {
                Ok(attr) => {
                    let ino = self.ino_for(&path);
                    reply.entry(&ATTR_TTL, &to_fuse_attr(ino, &attr), 0);
                }
                Err(err) => reply.error(errno_of(&err)),
            },
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn link(&mut self, _req: &Request<'_>, ino: u64, newparent: u64, newname: &OsStr, reply: ReplyEntry) {
        let (Some(target_path), Some(newparent_path)) = (self.path_of(ino), self.path_of(newparent)) else {
            reply.error(libc::ENOENT);
            return;
        };
        let new_path = join(&newparent_path, newname);
        let result = self
            .require_current(&new_path)
            .and_then(|(view, relative)| view.link(&relative, &target_path));
        match result {
            Ok(()) => match self.getattr_at(&new_path) {
                Ok(attr) => {
                    let new_ino = self.ino_for(&new_path);
                    reply.entry(&ATTR_TTL, &to_fuse_attr(new_ino, &attr), 0);
                }
                Err(err) => reply.error(errno_of(&err)),
            },
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let (Some(parent_path), Some(newparent_path)) = (self.path_of(parent), self.path_of(newparent)) else {
            reply.error(libc::ENOENT);
            return;
        };
        let old_path = join(&parent_path, name);
        let new_path = join(&newparent_path, newname);
        let result = self
            .require_current(&old_path)
            .and_then(|(view, relative)| view.rename(&relative, new_path.trim_start_matches('/')));
        match result {
            Ok(()) => {
                let mut inodes = self.inodes.lock();
                if let Some(&ino) = inodes.path_to_ino.get(&old_path) {
                    inodes.path_to_ino.remove(&old_path);
                    inodes.ino_to_path.insert(ino, new_path.clone());
                    inodes.path_to_ino.insert(new_path, ino);
                }
                drop(inodes);
                reply.ok();
            }
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let Some(path) = self.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let write_intent = gitfs_core::views::readonly::wants_write(flags);
        match self.router.resolve(&path) {
            Ok(Resolved::Current { view, relative }) => {
                let fh = view.open(&relative, write_intent);
                reply.opened(fh, 0);
            }
            Ok(_) if write_intent => reply.error(libc::EROFS),
            Ok(_) => reply.opened(0, 0),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let Some(parent_path) = self.path_of(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = join(&parent_path, name);
        let result = self
            .require_current(&path)
            .and_then(|(view, relative)| view.create(&relative, mode));
        match result {
            Ok(fh) => match self.getattr_at(&path) {
                Ok(attr) => {
                    let ino = self.ino_for(&path);
                    reply.created(&ATTR_TTL, &to_fuse_attr(ino, &attr), 0, fh, 0);
                }
                Err(err) => reply.error(errno_of(&err)),
            },
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(path) = self.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.read_at(&path, offset.max(0) as u64, size as usize) {
            Ok(data) => reply.data(&data),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let Some(path) = self.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let result = self
            .require_current(&path)
            .and_then(|(view, relative)| view.write(fh, &relative, offset.max(0) as u64, data));
        match result {
            Ok(n) => reply.written(n as u32),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn fsync(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, _datasync: bool, reply: ReplyEmpty) {
        let Some(path) = self.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let result = self
            .require_current(&path)
            .and_then(|(view, relative)| view.fsync(&relative));
        match result {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(errno_of(&err)),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        let Some(path) = self.path_of(ino) else {
            reply.ok();
            return;
        };
        if let Ok(Resolved::Current { view, .. }) = self.router.resolve(&path) {
            if let Err(err) = view.release(fh) {
                reply.error(errno_of(&err));
                return;
            }
        }
        reply.ok();
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, _mask: i32, reply: ReplyEmpty) {
        match self.path_of(ino) {
            Some(path) => match self.getattr_at(&path) {
                Ok(_) => reply.ok(),
                Err(err) => reply.error(errno_of(&err)),
            },
            None => reply.error(libc::ENOENT),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, _ino: u64, _flags: i32, reply: ReplyOpen) {
        reply.opened(0, 0);
    }

    fn releasedir(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _flags: i32, reply: ReplyEmpty) {
        reply.ok();
    }

    fn readdir(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
        let Some(path) = self.path_of(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let names = match self.readdir_at(&path) {
            Ok(names) => names,
            Err(err) => {
                reply.error(errno_of(&err));
                return;
            }
        };
        for (i, name) in names.into_iter().enumerate().skip(offset.max(0) as usize) {
            let (entry_ino, kind) = match name.as_str() {
                "." => (ino, FileType::Directory),
                ".." => (ROOT_INODE, FileType::Directory),
                _ => {
                    let child_path = join(&path, OsStr::from_bytes(name.as_bytes()));
                    let kind = self
                        .getattr_at(&child_path)
                        .map_or(FileType::RegularFile, |a| to_fuse_attr(0, &a).kind);
                    (self.ino_for(&child_path), kind)
                }
            };
            let full = (i + 1) as i64;
            if reply.add(entry_ino, full, kind, &name) {
                break;
            }
        }
        reply.ok();
    }
}
