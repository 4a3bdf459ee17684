//! Catalog data model.
//!
//! [`Item`] is what queries return. [`ItemMetadata`] is what population
//! consumes: the scraped description of one media file, stored on disk as
//! JSON next to (or instead of) a live metadata lookup.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// One media entry with its descriptive fields and related names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier (upstream metadata id).
    pub id: i64,
    /// Display name. Not unique.
    pub name: String,
    /// Path of the media file relative to the library root. Unique.
    pub path: String,
    pub released: Option<NaiveDate>,
    pub year: Option<i32>,
    pub homepage: Option<String>,
    pub imdb_id: Option<String>,
    pub tagline: Option<String>,
    pub res_x: Option<u32>,
    pub res_y: Option<u32>,
    /// Runtime in minutes.
    pub runtime: Option<u32>,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
    /// Actor names, sorted.
    pub actors: Vec<String>,
    /// Director names, sorted.
    pub directors: Vec<String>,
    /// Genre names, sorted.
    pub genres: Vec<String>,
}

/// A many-to-many relation between items and named entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Actor,
    Director,
    Genre,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Actor => "actor",
            Relation::Director => "director",
            Relation::Genre => "genre",
        }
    }

    /// (entity table, join table, join column) for this relation.
    pub(crate) fn tables(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            Relation::Actor => ("actors", "movie_actors", "actor_id"),
            Relation::Director => ("directors", "movie_directors", "director_id"),
            Relation::Genre => ("genres", "movie_genres", "genre_id"),
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar item column that can be listed or matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    ExternalId,
    Year,
    Runtime,
}

impl Column {
    pub(crate) fn sql(&self) -> &'static str {
        match self {
            Column::Name => "m.name",
            Column::ExternalId => "m.imdb_id",
            Column::Year => "m.year",
            Column::Runtime => "m.runtime",
        }
    }

    pub(crate) fn is_numeric(&self) -> bool {
        matches!(self, Column::Year | Column::Runtime)
    }
}

/// Restricts a query to a subset of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The whole catalog.
    All,
    /// Items related to the named actor, director or genre.
    Related(Relation, String),
    /// Items released in the given year.
    Year(i32),
    /// Items whose runtime falls in `[lower, lower + width)`.
    RuntimeBucket { lower: u32, width: u32 },
}

/// A person credited on an item, as delivered by the scraper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
}

/// A genre as delivered by the scraper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreInfo {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Scraped metadata for a single media file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub id: i64,
    pub name: String,
    /// Release date as `YYYY-MM-DD`.
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub budget: Option<i64>,
    #[serde(default)]
    pub revenue: Option<i64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub actors: Vec<Person>,
    #[serde(default)]
    pub directors: Vec<Person>,
    #[serde(default)]
    pub genres: Vec<GenreInfo>,
}

impl ItemMetadata {
    /// Parse a metadata document from JSON.
    pub fn from_json(s: &str) -> CatalogResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a metadata document from a file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> CatalogResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Parsed release date, if any.
    pub fn released_date(&self) -> CatalogResult<Option<NaiveDate>> {
        match self.released.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Some)
                .map_err(|e| CatalogError::invalid_metadata(format!("released {s:?}: {e}"))),
        }
    }

    /// Release year derived from the release date.
    pub fn year(&self) -> CatalogResult<Option<i32>> {
        Ok(self.released_date()?.map(|d| d.year()))
    }

    pub(crate) fn validate(&self) -> CatalogResult<()> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::invalid_metadata("empty name"));
        }
        self.released_date()?;
        Ok(())
    }
}
