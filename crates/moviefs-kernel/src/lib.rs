//! # moviefs-kernel
//!
//! Faceted read-only virtual filesystem over a movie catalog.
//!
//! The same library is exposed through several top-level views (facets):
//! - `title/<name>/` and `imdb/<id>/` name items directly
//! - `actor/`, `director/`, `genre/` group items by a related name
//! - `year/` and `runtime/` group items by a derived value
//!
//! Every item directory holds a symlink to the real media file and an `info`
//! text description. Nothing is ever written: the catalog is populated
//! out-of-band and the filesystem only reads it.

pub mod describe;
mod dispatch;
pub mod facet;
pub mod vfs;

#[cfg(feature = "fuse")]
pub mod fuse;

pub use describe::{INFO_NAME, describe};
pub use dispatch::{FacetTable, FsOptions, split_path};
pub use facet::{
    DEFAULT_RUNTIME_BUCKET, Facet, FacetOptions, ItemSelector, LeveledResolver, ListingCache,
    STANDARD_FACETS, TerminalResolver, decode_name, encode_name,
};
pub use vfs::{DirEntry, FileAttr, FileType, VfsError, VfsOps, VfsResult};
