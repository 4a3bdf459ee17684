//! Virtual Filesystem abstraction.
//!
//! A path-based, read-only VFS surface. Key components:
//!
//! - [`VfsOps`] - The operations a host transport may invoke
//! - [`FileAttr`] / [`DirEntry`] - Synthesized metadata
//! - [`VfsError`] - Error taxonomy shared by every resolver
//!
//! ## Design Decisions
//!
//! - **Path-based, no inodes**: Operations use paths, not inode numbers.
//!   FUSE clients handle inode ↔ path mapping locally.
//! - **Explicit offset/size**: Read takes offset and size without handle state.

mod error;
mod ops;
mod types;

pub use error::{VfsError, VfsResult};
pub use ops::VfsOps;
pub use types::{DIR_PERM, DirEntry, FILE_PERM, FileAttr, FileType, SYMLINK_PERM, read_window};
