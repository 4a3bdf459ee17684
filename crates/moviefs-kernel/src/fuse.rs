//! FUSE transport.
//!
//! Adapts a path-based [`VfsOps`] to the inode-based kernel protocol. Inode
//! numbers are handed out on first lookup and kept for the lifetime of the
//! mount; the namespace is read-only, so a path never changes meaning.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use fuser::{
    FUSE_ROOT_ID, Filesystem, MountOption, ReplyAttr, ReplyData, ReplyDirectory, ReplyEntry,
    ReplyOpen, Request,
};
use tokio::runtime::Handle;

use crate::vfs::{FileAttr, FileType, VfsError, VfsOps, VfsResult};

/// Attribute and entry TTL handed to the kernel.
const TTL: Duration = Duration::from_secs(1);

/// File system name shown in the mount table.
const FS_NAME: &str = "moviefs";

/// Map an engine error onto an errno.
///
/// Only "no such entry" and "not supported" carry meaning; anything else is a
/// generic I/O failure.
pub fn errno(err: &VfsError) -> i32 {
    match err {
        VfsError::NotFound(_) => libc::ENOENT,
        VfsError::Unsupported(_) => libc::ENOTSUP,
        VfsError::InvalidPath(_) | VfsError::Catalog(_) | VfsError::Io(_) => libc::EIO,
    }
}

/// Bidirectional inode ↔ path table. The root is always [`FUSE_ROOT_ID`].
#[derive(Debug)]
pub struct InodeTable {
    paths: HashMap<u64, PathBuf>,
    inodes: HashMap<PathBuf, u64>,
    next: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    pub fn new() -> Self {
        let root = PathBuf::from("/");
        let mut paths = HashMap::new();
        let mut inodes = HashMap::new();
        paths.insert(FUSE_ROOT_ID, root.clone());
        inodes.insert(root, FUSE_ROOT_ID);
        Self {
            paths,
            inodes,
            next: FUSE_ROOT_ID + 1,
        }
    }

    pub fn path(&self, ino: u64) -> Option<&Path> {
        self.paths.get(&ino).map(PathBuf::as_path)
    }

    /// Inode for `path`, allocating one if the path has not been seen.
    pub fn intern(&mut self, path: PathBuf) -> u64 {
        if let Some(&ino) = self.inodes.get(&path) {
            return ino;
        }
        let ino = self.next;
        self.next += 1;
        self.paths.insert(ino, path.clone());
        self.inodes.insert(path, ino);
        ino
    }

    /// Inode of the parent directory of `ino` (the root is its own parent).
    pub fn parent(&mut self, ino: u64) -> u64 {
        match self.path(ino).and_then(Path::parent).map(Path::to_path_buf) {
            Some(parent) => self.intern(parent),
            None => FUSE_ROOT_ID,
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn fuse_kind(kind: FileType) -> fuser::FileType {
    match kind {
        FileType::File => fuser::FileType::RegularFile,
        FileType::Directory => fuser::FileType::Directory,
        FileType::Symlink => fuser::FileType::Symlink,
    }
}

/// Read-only FUSE front end for a [`VfsOps`] engine.
pub struct MovieFuse {
    vfs: Arc<dyn VfsOps>,
    inodes: InodeTable,
    runtime: Handle,
    uid: u32,
    gid: u32,
}

impl MovieFuse {
    /// Must be called from within a tokio runtime; the callbacks block on it.
    pub fn new(vfs: Arc<dyn VfsOps>) -> VfsResult<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            VfsError::Io(std::io::Error::other(format!("no tokio runtime: {e}")))
        })?;
        Ok(Self {
            vfs,
            inodes: InodeTable::new(),
            runtime,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        })
    }

    fn to_file_attr(&self, ino: u64, attr: &FileAttr) -> fuser::FileAttr {
        fuser::FileAttr {
            ino,
            size: attr.size,
            blocks: attr.size.div_ceil(512),
            atime: attr.atime,
            mtime: attr.mtime,
            ctime: attr.ctime,
            crtime: UNIX_EPOCH,
            kind: fuse_kind(attr.kind),
            perm: attr.perm as u16,
            nlink: attr.nlink,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }

    fn path_of(&self, ino: u64) -> Result<PathBuf, i32> {
        self.inodes
            .path(ino)
            .map(Path::to_path_buf)
            .ok_or(libc::ENOENT)
    }

    fn getattr_path(&self, path: &Path) -> Result<FileAttr, i32> {
        let vfs = Arc::clone(&self.vfs);
        self.runtime
            .block_on(async move { vfs.getattr(path).await })
            .map_err(|e| {
                tracing::debug!(path = %path.display(), error = %e, "getattr failed");
                errno(&e)
            })
    }
}

impl Filesystem for MovieFuse {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let path = match self.path_of(parent) {
            Ok(p) => p.join(name),
            Err(code) => return reply.error(code),
        };
        match self.getattr_path(&path) {
            Ok(attr) => {
                let ino = self.inodes.intern(path);
                reply.entry(&TTL, &self.to_file_attr(ino, &attr), 0);
            }
            Err(code) => reply.error(code),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let result = self.path_of(ino).and_then(|path| self.getattr_path(&path));
        match result {
            Ok(attr) => reply.attr(&TTL, &self.to_file_attr(ino, &attr)),
            Err(code) => reply.error(code),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(code) => return reply.error(code),
        };
        let vfs = Arc::clone(&self.vfs);
        let listing = {
            let path = path.as_path();
            self.runtime.block_on(async move { vfs.readdir(path).await })
        };
        let listing = match listing {
            Ok(entries) => entries,
            Err(e) => return reply.error(errno(&e)),
        };

        let parent = self.inodes.parent(ino);
        let mut entries = vec![
            (ino, fuser::FileType::Directory, ".".to_string()),
            (parent, fuser::FileType::Directory, "..".to_string()),
        ];
        for entry in listing {
            if entry.name == "." || entry.name == ".." {
                continue;
            }
            let child = self.inodes.intern(path.join(&entry.name));
            entries.push((child, fuse_kind(entry.kind), entry.name));
        }

        for (i, (e_ino, kind, name)) in entries.iter().enumerate().skip(offset as usize) {
            if reply.add(*e_ino, (i + 1) as i64, *kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        if flags & libc::O_ACCMODE != libc::O_RDONLY {
            return reply.error(libc::EROFS);
        }
        let result = self.path_of(ino).and_then(|path| self.getattr_path(&path));
        match result {
            Ok(attr) if attr.is_file() => reply.opened(0, 0),
            Ok(attr) if attr.is_dir() => reply.error(libc::EISDIR),
            Ok(_) => reply.error(libc::EINVAL),
            Err(code) => reply.error(code),
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
        _lock: Option<u64>,
        reply: ReplyData,
    ) {
        let Ok(offset) = u64::try_from(offset) else {
            return reply.error(libc::EINVAL);
        };
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(code) => return reply.error(code),
        };
        let vfs = Arc::clone(&self.vfs);
        let result = {
            let path = path.as_path();
            self.runtime
                .block_on(async move { vfs.read(path, offset, size).await })
        };
        match result {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let path = match self.path_of(ino) {
            Ok(p) => p,
            Err(code) => return reply.error(code),
        };
        let vfs = Arc::clone(&self.vfs);
        let result = {
            let path = path.as_path();
            self.runtime.block_on(async move { vfs.readlink(path).await })
        };
        match result {
            Ok(target) => reply.data(target.as_os_str().as_bytes()),
            Err(e) => reply.error(errno(&e)),
        }
    }
}

fn mount_options() -> Vec<MountOption> {
    vec![
        MountOption::RO,
        MountOption::FSName(FS_NAME.into()),
        MountOption::AutoUnmount,
    ]
}

/// Mount read-only and serve until unmounted.
///
/// Blocks the calling thread, which must not be a tokio worker.
pub fn mount(fs: MovieFuse, mountpoint: &Path) -> VfsResult<()> {
    tracing::info!(mountpoint = %mountpoint.display(), "mounting");
    fuser::mount2(fs, mountpoint, &mount_options())?;
    Ok(())
}

/// Mount read-only on a background thread.
pub fn spawn_mount(fs: MovieFuse, mountpoint: &Path) -> VfsResult<fuser::BackgroundSession> {
    tracing::info!(mountpoint = %mountpoint.display(), "mounting in background");
    Ok(fuser::spawn_mount2(fs, mountpoint, &mount_options())?)
}
