//! Facet table: the single entry point for every filesystem operation.
//!
//! The root lists the registered facets. Any other path is split into its
//! first component, which picks the facet, and the rest, which that facet's
//! [`LeveledResolver`] resolves. The table is a pure router: it never
//! recovers from a resolver error and never writes to the catalog.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use moviefs_catalog::Catalog;

use crate::facet::{
    Facet, FacetOptions, LeveledResolver, ListingCache, STANDARD_FACETS, TerminalResolver,
    standard_facet,
};
use crate::vfs::{DirEntry, FileAttr, VfsError, VfsOps, VfsResult, read_window};

/// Settings fixed when the filesystem is constructed.
#[derive(Debug, Clone)]
pub struct FsOptions {
    /// Root of the real media library; symlinks point below it.
    pub path_base: PathBuf,
    /// Options for the built-in facets.
    pub facets: FacetOptions,
}

impl FsOptions {
    pub fn new(path_base: impl Into<PathBuf>) -> Self {
        Self {
            path_base: path_base.into(),
            facets: FacetOptions::default(),
        }
    }

    pub fn with_runtime_bucket(mut self, width: u32) -> Self {
        self.facets.runtime_bucket = width;
        self
    }
}

/// Make `path` absolute against the current directory without touching disk.
fn absolutize(path: &Path) -> VfsResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Decode a filesystem path into facet-relative text components.
///
/// Root and `.` components are dropped and `..` pops. A component that is not
/// valid UTF-8 cannot match any catalog value, so it is reported as missing.
pub fn split_path(path: &Path) -> VfsResult<Vec<String>> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(s) => match s.to_str() {
                Some(s) => parts.push(s.to_string()),
                None => return Err(VfsError::not_found(path.display().to_string())),
            },
            Component::ParentDir => {
                parts.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    Ok(parts)
}

/// Routes filesystem operations to facets by first path component.
///
/// Owns the listing cache shared by every facet; facets are registered before
/// serving and never change afterwards.
pub struct FacetTable {
    facets: IndexMap<String, LeveledResolver>,
    catalog: Arc<dyn Catalog>,
    cache: Arc<ListingCache>,
    terminal: Arc<TerminalResolver>,
}

impl std::fmt::Debug for FacetTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacetTable")
            .field("facets", &self.facets.keys().collect::<Vec<_>>())
            .field("cached_listings", &self.cache.len())
            .finish()
    }
}

impl FacetTable {
    /// Create a table with no facets.
    pub fn new(catalog: Arc<dyn Catalog>, options: &FsOptions) -> VfsResult<Self> {
        let path_base = absolutize(&options.path_base)?;
        let terminal = TerminalResolver::new(Arc::clone(&catalog), path_base, SystemTime::now());
        Ok(Self {
            facets: IndexMap::new(),
            catalog,
            cache: Arc::new(ListingCache::new()),
            terminal: Arc::new(terminal),
        })
    }

    /// Create a table with every built-in facet.
    pub fn standard(catalog: Arc<dyn Catalog>, options: &FsOptions) -> VfsResult<Self> {
        Self::with_facets(catalog, options, STANDARD_FACETS)
    }

    /// Create a table with the named built-in facets, in the given order.
    pub fn with_facets<S: AsRef<str>>(
        catalog: Arc<dyn Catalog>,
        options: &FsOptions,
        names: &[S],
    ) -> VfsResult<Self> {
        let mut table = Self::new(catalog, options)?;
        for name in names {
            let name = name.as_ref();
            let facet = standard_facet(name, &options.facets)
                .ok_or_else(|| VfsError::invalid_path(format!("unknown facet: {name}")))?;
            table.register(facet);
        }
        Ok(table)
    }

    /// Register a facet. A facet with the same name is replaced.
    pub fn register(&mut self, facet: Facet) {
        let name = facet.name().to_string();
        tracing::debug!(facet = %name, depth = facet.depth(), "registered facet");
        let resolver = LeveledResolver::new(
            facet,
            Arc::clone(&self.catalog),
            Arc::clone(&self.cache),
            Arc::clone(&self.terminal),
        );
        self.facets.insert(name, resolver);
    }

    /// Registered facet names, in registration order.
    pub fn facet_names(&self) -> Vec<String> {
        self.facets.keys().cloned().collect()
    }

    /// The listing cache shared by all facets.
    pub fn cache(&self) -> &ListingCache {
        &self.cache
    }

    /// Absolute root of the real media library.
    pub fn path_base(&self) -> &Path {
        self.terminal.path_base()
    }

    fn route<'a>(&self, parts: &'a [String]) -> VfsResult<(&LeveledResolver, &'a [String])> {
        let (name, rest) = parts
            .split_first()
            .ok_or_else(|| VfsError::invalid_path("/"))?;
        let resolver = self
            .facets
            .get(name)
            .ok_or_else(|| VfsError::not_found(name.clone()))?;
        Ok((resolver, rest))
    }

    // ========================================================================
    // Component-level operations
    // ========================================================================

    /// Names at `parts` (facet names at the root).
    pub fn list(&self, parts: &[String]) -> VfsResult<Vec<String>> {
        if parts.is_empty() {
            return Ok(self.facet_names());
        }
        let (resolver, rest) = self.route(parts)?;
        resolver.list(rest)
    }

    /// Typed entries at `parts`.
    pub fn entries(&self, parts: &[String]) -> VfsResult<Vec<DirEntry>> {
        if parts.is_empty() {
            return Ok(self.facets.keys().map(DirEntry::directory).collect());
        }
        let (resolver, rest) = self.route(parts)?;
        resolver.readdir(rest)
    }

    /// Attributes of `parts`.
    pub fn attributes(&self, parts: &[String]) -> VfsResult<FileAttr> {
        if parts.is_empty() {
            return Ok(FileAttr::directory(self.terminal.stamp()));
        }
        let (resolver, rest) = self.route(parts)?;
        resolver.getattr(rest)
    }

    /// Symlink target of `parts`.
    pub fn link_target(&self, parts: &[String]) -> VfsResult<PathBuf> {
        if parts.is_empty() {
            return Err(VfsError::not_found("/"));
        }
        let (resolver, rest) = self.route(parts)?;
        resolver.readlink(rest)
    }

    /// Full contents of the file at `parts`.
    pub fn content(&self, parts: &[String]) -> VfsResult<Vec<u8>> {
        if parts.is_empty() {
            return Err(VfsError::not_found("/"));
        }
        let (resolver, rest) = self.route(parts)?;
        resolver.read(rest)
    }
}

#[async_trait]
impl VfsOps for FacetTable {
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        tracing::debug!(path = %path.display(), "getattr");
        self.attributes(&split_path(path)?)
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        tracing::debug!(path = %path.display(), "readdir");
        self.entries(&split_path(path)?)
    }

    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        tracing::debug!(path = %path.display(), offset, size, "read");
        let content = self.content(&split_path(path)?)?;
        Ok(read_window(&content, offset, size))
    }

    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf> {
        tracing::debug!(path = %path.display(), "readlink");
        self.link_target(&split_path(path)?)
    }

    fn read_only(&self) -> bool {
        true
    }
}
