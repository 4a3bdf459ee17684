//! Multi-level resolver.
//!
//! With `L` levels and a facet-relative path `p`:
//!
//! - `|p| < L`: a listing directory, served from the [`ListingCache`]
//! - `|p| == L`: an item directory, served by the [`TerminalResolver`]
//! - `|p| == L + 1`: a child of an item directory (`info` or the media link)
//! - deeper: nothing
//!
//! Every operation first checks that each component up to the item appears
//! in the listing of its parent. A path is therefore accepted exactly when it
//! could have been reached by walking listings down from the facet root.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use moviefs_catalog::Catalog;

use super::Facet;
use super::cache::ListingCache;
use super::name::{decode_name, encode_name};
use super::terminal::{ItemPath, TerminalResolver};
use crate::vfs::{DirEntry, FileAttr, VfsError, VfsResult};

fn decode_all(components: &[String]) -> Vec<String> {
    components.iter().map(|c| decode_name(c)).collect()
}

/// Split decoded item components into selectors and the item name.
fn item_path<'a>(facet: &'a str, decoded: &'a [String]) -> ItemPath<'a> {
    let last = decoded.len() - 1;
    ItemPath {
        facet,
        selectors: &decoded[..last],
        item: &decoded[last],
    }
}

/// Depth-dispatching resolver for one facet.
pub struct LeveledResolver {
    facet: Facet,
    catalog: Arc<dyn Catalog>,
    cache: Arc<ListingCache>,
    terminal: Arc<TerminalResolver>,
}

impl fmt::Debug for LeveledResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeveledResolver")
            .field("facet", &self.facet)
            .finish_non_exhaustive()
    }
}

impl LeveledResolver {
    pub fn new(
        facet: Facet,
        catalog: Arc<dyn Catalog>,
        cache: Arc<ListingCache>,
        terminal: Arc<TerminalResolver>,
    ) -> Self {
        Self {
            facet,
            catalog,
            cache,
            terminal,
        }
    }

    fn display(&self, path: &[String]) -> String {
        let mut s = self.facet.name().to_string();
        for c in path {
            s.push('/');
            s.push_str(c);
        }
        s
    }

    fn ensure_levels(&self) -> VfsResult<usize> {
        match self.facet.depth() {
            0 => Err(VfsError::unsupported(format!(
                "facet {} has no levels",
                self.facet.name()
            ))),
            depth => Ok(depth),
        }
    }

    /// Entry names at `prefix`, which must have fewer components than levels.
    ///
    /// Level functions see decoded values; the cache holds entry names.
    fn listing(&self, prefix: &[String]) -> VfsResult<Arc<[String]>> {
        let level = &self.facet.levels()[prefix.len()];
        self.cache.get_or_compute(self.facet.name(), prefix, || {
            let values = level(self.catalog.as_ref(), &decode_all(prefix))?;
            Ok(values.iter().map(|v| encode_name(v)).collect())
        })
    }

    /// Verify every component up to the item appears in its parent listing.
    fn check_reachable(&self, path: &[String]) -> VfsResult<()> {
        let depth = path.len().min(self.facet.depth());
        for i in 0..depth {
            let listing = self.listing(&path[..i])?;
            if !listing.iter().any(|name| *name == path[i]) {
                return Err(VfsError::not_found(self.display(&path[..=i])));
            }
        }
        Ok(())
    }

    /// Validate a path naming a child of an item directory.
    ///
    /// Returns the decoded item components and the child's entry name.
    fn item_child<'a>(&self, path: &'a [String]) -> VfsResult<(Vec<String>, &'a str)> {
        let depth = self.ensure_levels()?;
        if path.len() != depth + 1 {
            return Err(VfsError::not_found(self.display(path)));
        }
        self.check_reachable(path)?;
        Ok((decode_all(&path[..depth]), path[depth].as_str()))
    }

    /// Names at `path`.
    pub fn list(&self, path: &[String]) -> VfsResult<Vec<String>> {
        Ok(self.readdir(path)?.into_iter().map(|e| e.name).collect())
    }

    /// Typed entries at `path`.
    pub fn readdir(&self, path: &[String]) -> VfsResult<Vec<DirEntry>> {
        let depth = self.ensure_levels()?;
        if path.len() < depth {
            self.check_reachable(path)?;
            let listing = self.listing(path)?;
            Ok(listing.iter().map(DirEntry::directory).collect())
        } else if path.len() == depth {
            self.check_reachable(path)?;
            let decoded = decode_all(path);
            self.terminal
                .entries(self.facet.selector(), item_path(self.facet.name(), &decoded))
        } else {
            // Item children are leaves.
            Err(VfsError::not_found(self.display(path)))
        }
    }

    /// Attributes of `path`.
    pub fn getattr(&self, path: &[String]) -> VfsResult<FileAttr> {
        let depth = self.ensure_levels()?;
        if path.len() <= depth {
            self.check_reachable(path)?;
            Ok(FileAttr::directory(self.terminal.stamp()))
        } else {
            let (decoded, child) = self.item_child(path)?;
            self.terminal.getattr(
                self.facet.selector(),
                item_path(self.facet.name(), &decoded),
                child,
            )
        }
    }

    /// Symlink target of `path`, which must name a child of an item directory.
    pub fn readlink(&self, path: &[String]) -> VfsResult<PathBuf> {
        let (decoded, _) = self.item_child(path)?;
        self.terminal
            .readlink(self.facet.selector(), item_path(self.facet.name(), &decoded))
    }

    /// Full contents of the file at `path`.
    pub fn read(&self, path: &[String]) -> VfsResult<Vec<u8>> {
        let (decoded, child) = self.item_child(path)?;
        self.terminal.read(
            self.facet.selector(),
            item_path(self.facet.name(), &decoded),
            child,
        )
    }
}
