//! Facets: named views of the catalog.
//!
//! A [`Facet`] is an ordered list of level functions plus an [`ItemSelector`]
//! describing how the terminal component names an item. The
//! [`LeveledResolver`] walks the levels by path depth and hands off to the
//! shared [`TerminalResolver`] once the path names an item.

mod adapters;
mod cache;
mod name;
mod resolver;
mod terminal;

use std::fmt;
use std::sync::Arc;

use moviefs_catalog::{Catalog, Column, Scope};

use crate::vfs::VfsResult;

pub use adapters::{
    DEFAULT_RUNTIME_BUCKET, FacetOptions, STANDARD_FACETS, bucket_of, imdb_facet, related_facet,
    runtime_facet, standard_facet, title_facet, year_facet,
};
pub use cache::{ListingCache, ListingKey};
pub use name::{decode_name, encode_name};
pub use resolver::LeveledResolver;
pub use terminal::{ItemPath, TerminalResolver, absolute_target, link_name, media_entry_name};

/// Computes the valid components at depth `prefix.len()` given the components
/// already matched.
pub type LevelFn = Arc<dyn Fn(&dyn Catalog, &[String]) -> VfsResult<Vec<String>> + Send + Sync>;

/// Turns the selector components (everything before the item name) into the
/// catalog scope the item is looked up in.
pub type ScopeFn = Arc<dyn Fn(&[String]) -> VfsResult<Scope> + Send + Sync>;

/// How the last component of a facet path identifies an item.
#[derive(Clone)]
pub struct ItemSelector {
    /// Column matched against the item component.
    pub key: Column,
    /// Scope derived from the selector chain.
    pub scope: ScopeFn,
}

impl ItemSelector {
    /// Match by `key` across the whole catalog.
    pub fn global(key: Column) -> Self {
        Self {
            key,
            scope: Arc::new(|_| Ok(Scope::All)),
        }
    }

    /// Match by `key` within a scope computed from the selectors.
    pub fn scoped<F>(key: Column, scope: F) -> Self
    where
        F: Fn(&[String]) -> VfsResult<Scope> + Send + Sync + 'static,
    {
        Self {
            key,
            scope: Arc::new(scope),
        }
    }
}

impl fmt::Debug for ItemSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemSelector")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// A named view of the catalog.
#[derive(Clone)]
pub struct Facet {
    name: String,
    levels: Vec<LevelFn>,
    selector: ItemSelector,
}

impl Facet {
    /// Create a facet with no levels. Add levels with [`Facet::level`].
    pub fn new(name: impl Into<String>, selector: ItemSelector) -> Self {
        Self {
            name: name.into(),
            levels: Vec::new(),
            selector,
        }
    }

    /// Append a level.
    pub fn level<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn Catalog, &[String]) -> VfsResult<Vec<String>> + Send + Sync + 'static,
    {
        self.levels.push(Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of path components before a component names an item.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[LevelFn] {
        &self.levels
    }

    pub fn selector(&self) -> &ItemSelector {
        &self.selector
    }
}

impl fmt::Debug for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Facet")
            .field("name", &self.name)
            .field("depth", &self.levels.len())
            .field("selector", &self.selector)
            .finish()
    }
}
