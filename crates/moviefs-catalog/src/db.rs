//! SQLite-backed movie catalog.
//!
//! Items, actors, directors and genres live in their own tables with
//! many-to-many join tables between them. Population is get-or-create all the
//! way down, so re-adding a file that is already catalogued is a no-op.

use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params, params_from_iter};
use std::path::Path;

use crate::error::CatalogResult;
use crate::model::{Column, Item, ItemMetadata, Person, Relation, Scope};
use crate::query::Catalog;

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS movies (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    path TEXT NOT NULL UNIQUE,
    released TEXT,
    year INTEGER,
    homepage TEXT,
    imdb_id TEXT,
    tagline TEXT,
    res_x INTEGER,
    res_y INTEGER,
    runtime INTEGER,
    budget INTEGER,
    revenue INTEGER
);
CREATE INDEX IF NOT EXISTS idx_movies_name ON movies(name);
CREATE INDEX IF NOT EXISTS idx_movies_imdb ON movies(imdb_id);

CREATE TABLE IF NOT EXISTS actors (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS directors (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS genres (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    url TEXT
);

CREATE TABLE IF NOT EXISTS movie_actors (
    actor_id INTEGER NOT NULL REFERENCES actors(id) ON DELETE CASCADE,
    movie_id INTEGER NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
    PRIMARY KEY (actor_id, movie_id)
);

CREATE TABLE IF NOT EXISTS movie_directors (
    director_id INTEGER NOT NULL REFERENCES directors(id) ON DELETE CASCADE,
    movie_id INTEGER NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
    PRIMARY KEY (director_id, movie_id)
);

CREATE TABLE IF NOT EXISTS movie_genres (
    genre_id INTEGER NOT NULL REFERENCES genres(id) ON DELETE CASCADE,
    movie_id INTEGER NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
    PRIMARY KEY (genre_id, movie_id)
);
"#;

const ITEM_COLUMNS: &str = "m.id, m.name, m.path, m.released, m.year, m.homepage, m.imdb_id, \
     m.tagline, m.res_x, m.res_y, m.runtime, m.budget, m.revenue";

/// Database handle for the movie catalog.
///
/// The connection sits behind a mutex so one handle can serve concurrent
/// filesystem callers.
pub struct CatalogDb {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for CatalogDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogDb").finish_non_exhaustive()
    }
}

/// SQL fragments restricting a query to a [`Scope`].
struct ScopeSql {
    joins: String,
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl ScopeSql {
    fn new(scope: &Scope) -> Self {
        let mut sql = ScopeSql {
            joins: String::new(),
            conditions: Vec::new(),
            params: Vec::new(),
        };
        match scope {
            Scope::All => {}
            Scope::Related(relation, name) => {
                let (table, join, col) = relation.tables();
                sql.joins = format!(
                    " JOIN {join} j ON j.movie_id = m.id JOIN {table} r ON r.id = j.{col}"
                );
                sql.conditions.push("r.name = ?".to_string());
                sql.params.push(Value::Text(name.clone()));
            }
            Scope::Year(year) => {
                sql.conditions.push("m.year = ?".to_string());
                sql.params.push(Value::Integer(i64::from(*year)));
            }
            Scope::RuntimeBucket { lower, width } => {
                sql.conditions.push("m.runtime >= ? AND m.runtime < ?".to_string());
                sql.params.push(Value::Integer(i64::from(*lower)));
                sql.params.push(Value::Integer(i64::from(*lower) + i64::from(*width)));
            }
        }
        sql
    }

    fn condition(mut self, cond: String) -> Self {
        self.conditions.push(cond);
        self
    }

    fn bind(mut self, value: Value) -> Self {
        self.params.push(value);
        self
    }

    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }
}

impl CatalogDb {
    /// Open or create a catalog at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory catalog (for testing).
    pub fn in_memory() -> CatalogResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // =========================================================================
    // Population
    // =========================================================================

    /// Add a media file to the catalog.
    ///
    /// Idempotent: if an item with the same id or the same path is already
    /// present it is returned untouched. Otherwise people and genres are
    /// created as needed and the item is inserted with its relations in a
    /// single transaction.
    pub fn add_item(&self, path: &str, meta: &ItemMetadata) -> CatalogResult<Item> {
        meta.validate()?;
        let mut conn = self.conn.lock();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM movies WHERE id = ?1 OR path = ?2 ORDER BY id = ?1 DESC LIMIT 1",
                params![meta.id, path],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            tracing::info!(id, path, "item already catalogued");
            return load_item(&conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows.into());
        }

        let tx = conn.transaction()?;
        let released = meta.released_date()?;
        tx.execute(
            "INSERT INTO movies (id, name, path, released, year, homepage, imdb_id, tagline,
                                 res_x, res_y, runtime, budget, revenue)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                meta.id,
                meta.name,
                path,
                released,
                meta.year()?,
                meta.homepage,
                meta.imdb_id,
                meta.tagline,
                meta.width,
                meta.height,
                meta.runtime,
                meta.budget,
                meta.revenue,
            ],
        )?;

        link_people(&tx, Relation::Actor, meta.id, &meta.actors)?;
        link_people(&tx, Relation::Director, meta.id, &meta.directors)?;
        for genre in &meta.genres {
            tx.execute(
                "INSERT OR IGNORE INTO genres (name, url) VALUES (?1, ?2)",
                params![genre.name, genre.url],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO movie_genres (genre_id, movie_id)
                 SELECT id, ?2 FROM genres WHERE name = ?1",
                params![genre.name, meta.id],
            )?;
        }
        tx.commit()?;

        tracing::info!(id = meta.id, name = %meta.name, path, "catalogued item");
        load_item(&conn, meta.id)?.ok_or(rusqlite::Error::QueryReturnedNoRows.into())
    }

    /// Look up an item by its stable id.
    pub fn get_item(&self, id: i64) -> CatalogResult<Option<Item>> {
        let conn = self.conn.lock();
        load_item(&conn, id)
    }

    /// Number of catalogued items.
    pub fn item_count(&self) -> CatalogResult<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl Catalog for CatalogDb {
    fn find_item(&self, column: Column, value: &str, scope: &Scope) -> CatalogResult<Option<Item>> {
        let conn = self.conn.lock();
        let sql = ScopeSql::new(scope)
            .condition(format!("{} = ?", column.sql()))
            .bind(column_value(column, value));
        let query = format!(
            "SELECT m.id FROM movies m{}{} ORDER BY m.id LIMIT 1",
            sql.joins,
            sql.where_clause()
        );
        let id: Option<i64> = conn
            .query_row(&query, params_from_iter(sql.params.iter()), |row| row.get(0))
            .optional()?;
        match id {
            Some(id) => load_item(&conn, id),
            None => Ok(None),
        }
    }

    fn list_distinct(&self, column: Column, scope: &Scope) -> CatalogResult<Vec<String>> {
        let conn = self.conn.lock();
        let col = column.sql();
        let sql = ScopeSql::new(scope).condition(format!("{col} IS NOT NULL"));
        let query = format!(
            "SELECT DISTINCT {col} FROM movies m{}{} ORDER BY {col}",
            sql.joins,
            sql.where_clause()
        );
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(params_from_iter(sql.params.iter()), |row| {
            if column.is_numeric() {
                Ok(row.get::<_, i64>(0)?.to_string())
            } else {
                row.get::<_, String>(0)
            }
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn related_names(&self, relation: Relation) -> CatalogResult<Vec<String>> {
        let conn = self.conn.lock();
        let (table, join, col) = relation.tables();
        let query = format!(
            "SELECT DISTINCT r.name FROM {table} r JOIN {join} j ON j.{col} = r.id ORDER BY r.name"
        );
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn items_related_to(&self, relation: Relation, name: &str) -> CatalogResult<Vec<Item>> {
        let conn = self.conn.lock();
        let sql = ScopeSql::new(&Scope::Related(relation, name.to_string()));
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM movies m{}{} ORDER BY m.name, m.id",
            sql.joins,
            sql.where_clause()
        );
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(params_from_iter(sql.params.iter()), item_from_row)?;
        let mut items = rows.collect::<Result<Vec<_>, _>>()?;
        for item in &mut items {
            attach_relations(&conn, item)?;
        }
        Ok(items)
    }
}

/// Bind a lookup value with the column's storage type.
fn column_value(column: Column, value: &str) -> Value {
    if column.is_numeric() {
        // A non-numeric value can never match a numeric column.
        value
            .parse::<i64>()
            .map(Value::Integer)
            .unwrap_or(Value::Null)
    } else {
        Value::Text(value.to_string())
    }
}

fn link_people(
    tx: &Transaction<'_>,
    relation: Relation,
    movie_id: i64,
    people: &[Person],
) -> CatalogResult<()> {
    let (table, join, col) = relation.tables();
    for person in people {
        tx.execute(
            &format!("INSERT OR IGNORE INTO {table} (id, name) VALUES (?1, ?2)"),
            params![person.id, person.name],
        )?;
        // A person already stored under a different id is matched by name.
        tx.execute(
            &format!(
                "INSERT OR IGNORE INTO {join} ({col}, movie_id)
                 SELECT id, ?3 FROM {table} WHERE id = ?1 OR name = ?2
                 ORDER BY id = ?1 DESC LIMIT 1"
            ),
            params![person.id, person.name, movie_id],
        )?;
    }
    Ok(())
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        released: row.get(3)?,
        year: row.get(4)?,
        homepage: row.get(5)?,
        imdb_id: row.get(6)?,
        tagline: row.get(7)?,
        res_x: row.get(8)?,
        res_y: row.get(9)?,
        runtime: row.get(10)?,
        budget: row.get(11)?,
        revenue: row.get(12)?,
        actors: Vec::new(),
        directors: Vec::new(),
        genres: Vec::new(),
    })
}

fn related_for(conn: &Connection, relation: Relation, movie_id: i64) -> CatalogResult<Vec<String>> {
    let (table, join, col) = relation.tables();
    let mut stmt = conn.prepare(&format!(
        "SELECT r.name FROM {table} r JOIN {join} j ON j.{col} = r.id
         WHERE j.movie_id = ?1 ORDER BY r.name"
    ))?;
    let rows = stmt.query_map(params![movie_id], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn attach_relations(conn: &Connection, item: &mut Item) -> CatalogResult<()> {
    item.actors = related_for(conn, Relation::Actor, item.id)?;
    item.directors = related_for(conn, Relation::Director, item.id)?;
    item.genres = related_for(conn, Relation::Genre, item.id)?;
    Ok(())
}

fn load_item(conn: &Connection, id: i64) -> CatalogResult<Option<Item>> {
    let item = conn
        .query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM movies m WHERE m.id = ?1"),
            params![id],
            item_from_row,
        )
        .optional()?;
    match item {
        Some(mut item) => {
            attach_relations(conn, &mut item)?;
            Ok(Some(item))
        }
        None => Ok(None),
    }
}
