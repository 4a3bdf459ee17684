//! Terminal (item) resolver.
//!
//! Once a facet path names an item, this synthesizes the item directory: a
//! symlink to the real media file and the `info` description. Item lookups go
//! straight to the catalog; they are not cached.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use moviefs_catalog::{Catalog, Item};

use super::ItemSelector;
use super::name::encode_name;
use crate::describe::{INFO_NAME, describe};
use crate::vfs::{DirEntry, FileAttr, VfsError, VfsResult};

/// A facet path split at its item component.
#[derive(Debug, Clone, Copy)]
pub struct ItemPath<'a> {
    pub facet: &'a str,
    /// Components before the item name (contributor, year, ...).
    pub selectors: &'a [String],
    pub item: &'a str,
}

impl fmt::Display for ItemPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.facet)?;
        for s in self.selectors {
            write!(f, "/{s}")?;
        }
        write!(f, "/{}", self.item)
    }
}

/// File name the item directory exposes for the real media file.
///
/// The base name of the stored relative path. A stored path with no usable
/// base name is flattened whole, so the entry never reads as a deeper path.
pub fn link_name(stored: &str) -> String {
    match Path::new(stored).file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => stored.replace('/', "_"),
    }
}

/// Join `relative` onto `base` lexically (`.` dropped, `..` pops).
///
/// `base` must be absolute; the result always is.
pub fn absolute_target(base: &Path, relative: &str) -> PathBuf {
    let mut out = base.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(s) => out.push(s),
            Component::ParentDir => {
                if out.parent().is_some() {
                    out.pop();
                }
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    out
}

/// Entry name of the media symlink inside an item directory.
///
/// A media file whose base name is `info` is shown as `_info`, leaving `info`
/// to the description.
pub fn media_entry_name(stored: &str) -> String {
    let name = encode_name(&link_name(stored));
    if name == INFO_NAME {
        format!("_{name}")
    } else {
        name
    }
}

fn is_dot(name: &str) -> bool {
    name == "." || name == ".."
}

/// Resolves item paths against the catalog and synthesizes their contents.
pub struct TerminalResolver {
    catalog: Arc<dyn Catalog>,
    path_base: PathBuf,
    stamp: SystemTime,
}

impl fmt::Debug for TerminalResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalResolver")
            .field("path_base", &self.path_base)
            .finish_non_exhaustive()
    }
}

impl TerminalResolver {
    /// `path_base` must already be absolute.
    pub fn new(catalog: Arc<dyn Catalog>, path_base: PathBuf, stamp: SystemTime) -> Self {
        Self {
            catalog,
            path_base,
            stamp,
        }
    }

    pub fn path_base(&self) -> &Path {
        &self.path_base
    }

    pub fn stamp(&self) -> SystemTime {
        self.stamp
    }

    /// Look the item up within the scope its selectors establish.
    ///
    /// Ambiguous names resolve to the catalog's first match (lowest id).
    pub fn resolve_item(&self, selector: &ItemSelector, path: ItemPath<'_>) -> VfsResult<Item> {
        let scope = (selector.scope)(path.selectors)?;
        self.catalog
            .find_item(selector.key, path.item, &scope)?
            .ok_or_else(|| VfsError::not_found(path.to_string()))
    }

    /// Absolute path of the real media file.
    pub fn target(&self, item: &Item) -> PathBuf {
        absolute_target(&self.path_base, &item.path)
    }

    /// Entries of an item directory: `.`, `..`, the media link and `info`.
    pub fn entries(&self, selector: &ItemSelector, path: ItemPath<'_>) -> VfsResult<Vec<DirEntry>> {
        let item = self.resolve_item(selector, path)?;
        Ok(vec![
            DirEntry::directory("."),
            DirEntry::directory(".."),
            DirEntry::symlink(media_entry_name(&item.path)),
            DirEntry::file(INFO_NAME),
        ])
    }

    /// Attributes of `child` inside the item directory.
    ///
    /// `info` is a regular file, `.`/`..` are directories, and every other
    /// name is treated as the media symlink. The name is not checked against
    /// the real file's base name.
    pub fn getattr(&self, selector: &ItemSelector, path: ItemPath<'_>, child: &str) -> VfsResult<FileAttr> {
        let item = self.resolve_item(selector, path)?;
        if is_dot(child) {
            Ok(FileAttr::directory(self.stamp))
        } else if child == INFO_NAME {
            Ok(FileAttr::file(describe(&item).len() as u64, self.stamp))
        } else {
            let target = self.target(&item);
            Ok(FileAttr::symlink(target.as_os_str().len() as u64, self.stamp))
        }
    }

    /// Symlink target inside the item directory: the absolute path of the
    /// real media file, whatever the child is called.
    pub fn readlink(&self, selector: &ItemSelector, path: ItemPath<'_>) -> VfsResult<PathBuf> {
        let item = self.resolve_item(selector, path)?;
        Ok(self.target(&item))
    }

    /// Full contents of `child`; only `info` has any.
    pub fn read(&self, selector: &ItemSelector, path: ItemPath<'_>, child: &str) -> VfsResult<Vec<u8>> {
        let item = self.resolve_item(selector, path)?;
        if child == INFO_NAME {
            Ok(describe(&item).into_bytes())
        } else {
            Err(VfsError::not_found(format!("{path}/{child}")))
        }
    }
}
