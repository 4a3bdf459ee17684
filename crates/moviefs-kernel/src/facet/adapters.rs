//! The built-in facets.
//!
//! | facet | level 0 | level 1 | item key |
//! |---|---|---|---|
//! | `title` | item names | | name |
//! | `imdb` | external ids | | external id |
//! | `actor` / `director` / `genre` | related names | names of related items | name |
//! | `year` | release years | names of items from that year | name |
//! | `runtime` | bucket lower bounds | names of items in that bucket | name |

use moviefs_catalog::{Catalog, Column, Relation, Scope};

use super::{Facet, ItemSelector};
use crate::vfs::{VfsError, VfsResult};

/// Default runtime bucket width in minutes.
pub const DEFAULT_RUNTIME_BUCKET: u32 = 10;

/// Facet names in default registration order.
pub const STANDARD_FACETS: &[&str] = &["title", "imdb", "actor", "director", "genre", "year", "runtime"];

/// Knobs for the built-in facets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetOptions {
    /// Width of a runtime bucket in minutes. Zero is treated as one.
    pub runtime_bucket: u32,
}

impl Default for FacetOptions {
    fn default() -> Self {
        Self {
            runtime_bucket: DEFAULT_RUNTIME_BUCKET,
        }
    }
}

/// Lower bound of the bucket `runtime` falls in.
pub fn bucket_of(runtime: u32, width: u32) -> u32 {
    let width = width.max(1);
    runtime / width * width
}

fn selector(selectors: &[String], index: usize) -> VfsResult<&str> {
    selectors
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| VfsError::not_found(selectors.join("/")))
}

fn parse_selector<T: std::str::FromStr>(value: &str) -> VfsResult<T> {
    value
        .parse()
        .map_err(|_| VfsError::not_found(value.to_string()))
}

/// Names of the items in `scope`, one entry per distinct name.
fn names_in(catalog: &dyn Catalog, scope: &Scope) -> VfsResult<Vec<String>> {
    Ok(catalog.list_distinct(Column::Name, scope)?)
}

/// `title/<name>`
pub fn title_facet() -> Facet {
    Facet::new("title", ItemSelector::global(Column::Name))
        .level(|catalog, _| names_in(catalog, &Scope::All))
}

/// `imdb/<external id>`
pub fn imdb_facet() -> Facet {
    Facet::new("imdb", ItemSelector::global(Column::ExternalId))
        .level(|catalog, _| Ok(catalog.list_distinct(Column::ExternalId, &Scope::All)?))
}

/// `<facet>/<related name>/<item name>` for actors, directors or genres.
pub fn related_facet(name: &str, relation: Relation) -> Facet {
    let item_selector = ItemSelector::scoped(Column::Name, move |selectors| {
        Ok(Scope::Related(relation, selector(selectors, 0)?.to_string()))
    });
    Facet::new(name, item_selector)
        .level(move |catalog, _| Ok(catalog.related_names(relation)?))
        .level(move |catalog, prefix| {
            let related = selector(prefix, 0)?.to_string();
            names_in(catalog, &Scope::Related(relation, related))
        })
}

/// `year/<year>/<item name>`
pub fn year_facet() -> Facet {
    let item_selector = ItemSelector::scoped(Column::Name, |selectors| {
        Ok(Scope::Year(parse_selector(selector(selectors, 0)?)?))
    });
    Facet::new("year", item_selector)
        .level(|catalog, _| Ok(catalog.list_distinct(Column::Year, &Scope::All)?))
        .level(|catalog, prefix| {
            let year = parse_selector(selector(prefix, 0)?)?;
            names_in(catalog, &Scope::Year(year))
        })
}

/// `runtime/<bucket lower bound>/<item name>`
///
/// Items without a runtime appear in no bucket.
pub fn runtime_facet(width: u32) -> Facet {
    let width = width.max(1);
    let item_selector = ItemSelector::scoped(Column::Name, move |selectors| {
        let lower = parse_selector(selector(selectors, 0)?)?;
        Ok(Scope::RuntimeBucket { lower, width })
    });
    Facet::new("runtime", item_selector)
        .level(move |catalog, _| {
            let mut buckets = Vec::new();
            for runtime in catalog.list_distinct(Column::Runtime, &Scope::All)? {
                let minutes: u32 = parse_selector(&runtime)?;
                buckets.push(bucket_of(minutes, width));
            }
            buckets.sort_unstable();
            buckets.dedup();
            Ok(buckets.into_iter().map(|b| b.to_string()).collect())
        })
        .level(move |catalog, prefix| {
            let lower = parse_selector(selector(prefix, 0)?)?;
            names_in(catalog, &Scope::RuntimeBucket { lower, width })
        })
}

/// Build a built-in facet by name.
pub fn standard_facet(name: &str, options: &FacetOptions) -> Option<Facet> {
    match name {
        "title" => Some(title_facet()),
        "imdb" => Some(imdb_facet()),
        "actor" => Some(related_facet("actor", Relation::Actor)),
        "director" => Some(related_facet("director", Relation::Director)),
        "genre" => Some(related_facet("genre", Relation::Genre)),
        "year" => Some(year_facet()),
        "runtime" => Some(runtime_facet(options.runtime_bucket)),
        _ => None,
    }
}
