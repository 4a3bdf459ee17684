//! Core VFS types.
//!
//! Attributes are synthesized, never read from disk: every entry in the
//! namespace is stamped with the time the filesystem was constructed so that
//! repeated stats of the same path agree.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Permissions for synthetic directories.
pub const DIR_PERM: u32 = 0o555;
/// Permissions for synthetic regular files.
pub const FILE_PERM: u32 = 0o444;
/// Permissions for symbolic links.
pub const SYMLINK_PERM: u32 = 0o777;

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        matches!(self, FileType::Symlink)
    }
}

/// File attributes (metadata).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttr {
    /// Size in bytes.
    pub size: u64,
    /// File type.
    pub kind: FileType,
    /// Unix permissions (e.g., 0o444).
    pub perm: u32,
    /// Last modification time.
    pub mtime: SystemTime,
    /// Last access time.
    pub atime: SystemTime,
    /// Change time.
    pub ctime: SystemTime,
    /// Number of hard links.
    pub nlink: u32,
}

impl FileAttr {
    /// Attributes for a read-only regular file of `size` bytes.
    pub fn file(size: u64, stamp: SystemTime) -> Self {
        Self {
            size,
            kind: FileType::File,
            perm: FILE_PERM,
            mtime: stamp,
            atime: stamp,
            ctime: stamp,
            nlink: 1,
        }
    }

    /// Attributes for a synthetic directory.
    pub fn directory(stamp: SystemTime) -> Self {
        Self {
            size: 0,
            kind: FileType::Directory,
            perm: DIR_PERM,
            mtime: stamp,
            atime: stamp,
            ctime: stamp,
            nlink: 2, // . and ..
        }
    }

    /// Attributes for a symlink whose target is `target_len` bytes long.
    pub fn symlink(target_len: u64, stamp: SystemTime) -> Self {
        Self {
            size: target_len,
            kind: FileType::Symlink,
            perm: SYMLINK_PERM,
            mtime: stamp,
            atime: stamp,
            ctime: stamp,
            nlink: 1,
        }
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.kind.is_symlink()
    }
}

/// Directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub kind: FileType,
}

impl DirEntry {
    /// Create a new directory entry.
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Create a file entry.
    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FileType::File)
    }

    /// Create a directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Directory)
    }

    /// Create a symlink entry.
    pub fn symlink(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Symlink)
    }
}

/// Cut the `[offset, offset + size)` window out of a fully materialized file.
///
/// Reads starting at or past EOF return an empty buffer.
pub fn read_window(content: &[u8], offset: u64, size: u32) -> Vec<u8> {
    let len = content.len() as u64;
    if offset >= len {
        return Vec::new();
    }
    let end = offset.saturating_add(u64::from(size)).min(len);
    content[offset as usize..end as usize].to_vec()
}
