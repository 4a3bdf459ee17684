//! # moviefs-catalog
//!
//! The movie catalog behind moviefs: items (movies) related many-to-many to
//! actors, directors and genres.
//!
//! - [`Catalog`] - read-only query trait consumed by the filesystem engine
//! - [`CatalogDb`] - SQLite implementation, including population
//! - [`ItemMetadata`] - scraped metadata document fed to [`CatalogDb::add_item`]

mod db;
mod error;
mod model;
mod query;

pub use db::CatalogDb;
pub use error::{CatalogError, CatalogResult};
pub use model::{Column, GenreInfo, Item, ItemMetadata, Person, Relation, Scope};
pub use query::Catalog;
