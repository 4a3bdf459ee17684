//! Catalog query trait.
//!
//! This is the only surface the filesystem engine sees. Every method is
//! read-only and returns data as it was when the catalog was populated.

use crate::error::CatalogResult;
use crate::model::{Column, Item, Relation, Scope};

/// Read-only queries over a movie catalog.
///
/// Implementations must be safe to call from several threads at once.
pub trait Catalog: Send + Sync {
    /// Find one item whose `column` equals `value` within `scope`.
    ///
    /// Display names are not unique; when several items match, the one with
    /// the lowest id is returned.
    fn find_item(&self, column: Column, value: &str, scope: &Scope) -> CatalogResult<Option<Item>>;

    /// Distinct non-null values of `column` within `scope`, sorted ascending.
    fn list_distinct(&self, column: Column, scope: &Scope) -> CatalogResult<Vec<String>>;

    /// Names of all actors/directors/genres attached to at least one item.
    fn related_names(&self, relation: Relation) -> CatalogResult<Vec<String>>;

    /// Items related to the named actor/director/genre, ordered by name.
    fn items_related_to(&self, relation: Relation, name: &str) -> CatalogResult<Vec<Item>>;
}

impl<C: Catalog + ?Sized> Catalog for std::sync::Arc<C> {
    fn find_item(&self, column: Column, value: &str, scope: &Scope) -> CatalogResult<Option<Item>> {
        (**self).find_item(column, value, scope)
    }

    fn list_distinct(&self, column: Column, scope: &Scope) -> CatalogResult<Vec<String>> {
        (**self).list_distinct(column, scope)
    }

    fn related_names(&self, relation: Relation) -> CatalogResult<Vec<String>> {
        (**self).related_names(relation)
    }

    fn items_related_to(&self, relation: Relation, name: &str) -> CatalogResult<Vec<Item>> {
        (**self).items_related_to(relation, name)
    }
}
