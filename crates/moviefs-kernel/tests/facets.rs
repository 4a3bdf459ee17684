//! Integration tests for the facet filesystem over a real (in-memory) catalog.
//!
//! The catalog is wrapped in a `CountingCatalog` so tests can observe how
//! often listings actually reach the database.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use moviefs_catalog::{
    Catalog, CatalogDb, CatalogResult, Column, GenreInfo, Item, ItemMetadata, Person, Relation,
    Scope,
};
use moviefs_kernel::{Facet, FacetTable, FileType, FsOptions, ItemSelector, VfsOps, describe};

// ============================================================================
// Shared test setup
// ============================================================================

/// Catalog double that counts every query before delegating.
#[derive(Default)]
struct Counters {
    find_item: AtomicUsize,
    list_distinct: AtomicUsize,
    related_names: AtomicUsize,
    items_related_to: AtomicUsize,
}

struct CountingCatalog {
    inner: CatalogDb,
    counts: Counters,
}

impl CountingCatalog {
    fn listing_queries(&self) -> usize {
        self.counts.list_distinct.load(Ordering::SeqCst)
            + self.counts.related_names.load(Ordering::SeqCst)
            + self.counts.items_related_to.load(Ordering::SeqCst)
    }
}

impl Catalog for CountingCatalog {
    fn find_item(&self, column: Column, value: &str, scope: &Scope) -> CatalogResult<Option<Item>> {
        self.counts.find_item.fetch_add(1, Ordering::SeqCst);
        self.inner.find_item(column, value, scope)
    }

    fn list_distinct(&self, column: Column, scope: &Scope) -> CatalogResult<Vec<String>> {
        self.counts.list_distinct.fetch_add(1, Ordering::SeqCst);
        self.inner.list_distinct(column, scope)
    }

    fn related_names(&self, relation: Relation) -> CatalogResult<Vec<String>> {
        self.counts.related_names.fetch_add(1, Ordering::SeqCst);
        self.inner.related_names(relation)
    }

    fn items_related_to(&self, relation: Relation, name: &str) -> CatalogResult<Vec<Item>> {
        self.counts.items_related_to.fetch_add(1, Ordering::SeqCst);
        self.inner.items_related_to(relation, name)
    }
}

fn person(id: i64, name: &str) -> Person {
    Person {
        id,
        name: name.to_string(),
    }
}

fn genre(name: &str) -> GenreInfo {
    GenreInfo {
        name: name.to_string(),
        url: None,
    }
}

fn populate(db: &CatalogDb) {
    let items = [
        (
            "drama/inception.mkv",
            ItemMetadata {
                id: 27205,
                name: "Inception".into(),
                released: Some("2010-07-16".into()),
                homepage: Some("http://inceptionmovie.warnerbros.com/".into()),
                imdb_id: Some("tt1375666".into()),
                tagline: Some("Your mind is the scene of the crime.".into()),
                runtime: Some(148),
                width: Some(1920),
                height: Some(800),
                actors: vec![
                    person(6193, "Leonardo DiCaprio"),
                    person(24045, "Joseph Gordon-Levitt"),
                ],
                directors: vec![person(525, "Christopher Nolan")],
                genres: vec![genre("Drama"), genre("Science Fiction")],
                ..Default::default()
            },
        ),
        (
            "thriller/memento.avi",
            ItemMetadata {
                id: 77,
                name: "Memento".into(),
                released: Some("2000-10-11".into()),
                imdb_id: Some("tt0209144".into()),
                runtime: Some(113),
                actors: vec![person(529, "Guy Pearce")],
                directors: vec![person(525, "Christopher Nolan")],
                genres: vec![genre("Drama"), genre("Mystery")],
                ..Default::default()
            },
        ),
        (
            "shorts/a.mkv",
            ItemMetadata {
                id: 1001,
                name: "Short A".into(),
                runtime: Some(95),
                ..Default::default()
            },
        ),
        (
            "shorts/b.mkv",
            ItemMetadata {
                id: 1002,
                name: "Short B".into(),
                runtime: Some(101),
                ..Default::default()
            },
        ),
        (
            "classics/solaris-1972.mkv",
            ItemMetadata {
                id: 593,
                name: "Solaris".into(),
                released: Some("1972-03-20".into()),
                runtime: Some(167),
                directors: vec![person(8452, "Andrei Tarkovsky")],
                ..Default::default()
            },
        ),
        (
            "remakes/solaris-2002.mkv",
            ItemMetadata {
                id: 2103,
                name: "Solaris".into(),
                released: Some("2002-11-27".into()),
                runtime: Some(99),
                directors: vec![person(1884, "Steven Soderbergh")],
                ..Default::default()
            },
        ),
    ];
    for (path, meta) in &items {
        db.add_item(path, meta).unwrap();
    }
}

fn setup() -> (FacetTable, Arc<CountingCatalog>) {
    let inner = CatalogDb::in_memory().unwrap();
    populate(&inner);
    let catalog = Arc::new(CountingCatalog {
        inner,
        counts: Counters::default(),
    });
    let shared: Arc<dyn Catalog> = catalog.clone();
    let table = FacetTable::standard(shared, &FsOptions::new("/library")).unwrap();
    (table, catalog)
}

/// Items whose catalog values are not usable as entry names as they are.
fn populate_awkward(db: &CatalogDb) {
    let items = [
        (
            "action/face-off.mkv",
            ItemMetadata {
                id: 754,
                name: "Face/Off".into(),
                released: Some("1997-06-27".into()),
                imdb_id: Some("tt0119094".into()),
                runtime: Some(138),
                actors: vec![person(1399, "John Travolta")],
                directors: vec![person(11401, "John Woo")],
                genres: vec![genre("Action/Thriller")],
                ..Default::default()
            },
        ),
        (
            "odd/dot.mkv",
            ItemMetadata {
                id: 9001,
                name: ".".into(),
                imdb_id: Some(String::new()),
                runtime: Some(80),
                actors: vec![person(9002, "..")],
                ..Default::default()
            },
        ),
        (
            "extras/info",
            ItemMetadata {
                id: 9003,
                name: "Making Of".into(),
                ..Default::default()
            },
        ),
    ];
    for (path, meta) in &items {
        db.add_item(path, meta).unwrap();
    }
}

fn setup_awkward() -> FacetTable {
    let inner = CatalogDb::in_memory().unwrap();
    populate(&inner);
    populate_awkward(&inner);
    let catalog: Arc<dyn Catalog> = Arc::new(inner);
    FacetTable::standard(catalog, &FsOptions::new("/library")).unwrap()
}

fn p(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Root and routing
// ============================================================================

#[test]
fn test_root_lists_facets_in_order() {
    let (fs, _) = setup();
    assert_eq!(
        fs.list(&[]).unwrap(),
        vec!["title", "imdb", "actor", "director", "genre", "year", "runtime"]
    );
    assert!(fs.attributes(&[]).unwrap().is_dir());
    for entry in fs.entries(&[]).unwrap() {
        assert_eq!(entry.kind, FileType::Directory);
    }
}

#[test]
fn test_unknown_facet_is_not_found() {
    let (fs, _) = setup();
    assert!(fs.list(&p(&["nope"])).unwrap_err().is_not_found());
    assert!(fs.attributes(&p(&["nope", "x"])).unwrap_err().is_not_found());
}

#[test]
fn test_facet_without_levels_is_unsupported() {
    let (mut fs, _) = setup();
    fs.register(Facet::new("empty", ItemSelector::global(Column::Name)));
    assert!(fs.list(&p(&["empty"])).unwrap_err().is_unsupported());
    assert!(fs.attributes(&p(&["empty"])).unwrap_err().is_unsupported());
    assert!(fs.content(&p(&["empty", "x", "info"])).unwrap_err().is_unsupported());
}

#[test]
fn test_with_facets_rejects_unknown_name() {
    let catalog: Arc<dyn Catalog> = Arc::new(CatalogDb::in_memory().unwrap());
    let options = FsOptions::new("/library");
    let fs = FacetTable::with_facets(catalog.clone(), &options, &["genre", "title"]).unwrap();
    assert_eq!(fs.facet_names(), vec!["genre", "title"]);
    assert!(FacetTable::with_facets(catalog, &options, &["title", "rating"]).is_err());
}

// ============================================================================
// Listings
// ============================================================================

#[test]
fn test_listed_names_are_directories() {
    let (fs, _) = setup();
    for facet in fs.list(&[]).unwrap() {
        for name in fs.list(&p(&[facet.as_str()])).unwrap() {
            let attr = fs.attributes(&p(&[facet.as_str(), name.as_str()])).unwrap();
            assert!(attr.is_dir(), "{facet}/{name}");
        }
    }
}

#[test]
fn test_title_listing_is_distinct() {
    let (fs, _) = setup();
    assert_eq!(
        fs.list(&p(&["title"])).unwrap(),
        vec!["Inception", "Memento", "Short A", "Short B", "Solaris"]
    );
}

#[test]
fn test_two_level_listing() {
    let (fs, _) = setup();
    assert_eq!(
        fs.list(&p(&["director"])).unwrap(),
        vec![
            "Andrei Tarkovsky",
            "Christopher Nolan",
            "Steven Soderbergh"
        ]
    );
    assert_eq!(
        fs.list(&p(&["director", "Christopher Nolan"])).unwrap(),
        vec!["Inception", "Memento"]
    );
    assert_eq!(
        fs.list(&p(&["genre", "Drama"])).unwrap(),
        vec!["Inception", "Memento"]
    );
    assert_eq!(fs.list(&p(&["actor", "Guy Pearce"])).unwrap(), vec!["Memento"]);
}

#[test]
fn test_unknown_selector_is_not_found() {
    let (fs, _) = setup();
    assert!(fs.list(&p(&["actor", "Nobody"])).unwrap_err().is_not_found());
    assert!(
        fs.attributes(&p(&["actor", "Nobody", "Memento"]))
            .unwrap_err()
            .is_not_found()
    );
}

#[test]
fn test_unreachable_item_is_not_found() {
    let (fs, _) = setup();
    // Inception exists, but Guy Pearce is not in it.
    assert!(
        fs.list(&p(&["actor", "Guy Pearce", "Inception"]))
            .unwrap_err()
            .is_not_found()
    );
    assert!(fs.attributes(&p(&["title", "Oldboy"])).unwrap_err().is_not_found());
}

#[test]
fn test_year_facet() {
    let (fs, _) = setup();
    assert_eq!(fs.list(&p(&["year"])).unwrap(), vec!["1972", "2000", "2002", "2010"]);
    assert_eq!(fs.list(&p(&["year", "2000"])).unwrap(), vec!["Memento"]);
    assert!(fs.list(&p(&["year", "1999"])).unwrap_err().is_not_found());
}

#[test]
fn test_runtime_buckets() {
    let (fs, _) = setup();
    assert_eq!(
        fs.list(&p(&["runtime"])).unwrap(),
        vec!["90", "100", "110", "140", "160"]
    );
    assert_eq!(
        fs.list(&p(&["runtime", "90"])).unwrap(),
        vec!["Short A", "Solaris"]
    );
    assert_eq!(fs.list(&p(&["runtime", "100"])).unwrap(), vec!["Short B"]);
    // Only bucket lower bounds are valid selectors.
    assert!(fs.list(&p(&["runtime", "95"])).unwrap_err().is_not_found());
}

#[test]
fn test_runtime_bucket_width_is_configurable() {
    let inner = CatalogDb::in_memory().unwrap();
    populate(&inner);
    let catalog: Arc<dyn Catalog> = Arc::new(inner);
    let options = FsOptions::new("/library").with_runtime_bucket(60);
    let fs = FacetTable::standard(catalog, &options).unwrap();
    assert_eq!(fs.list(&p(&["runtime"])).unwrap(), vec!["60", "120"]);
    assert_eq!(
        fs.list(&p(&["runtime", "60"])).unwrap(),
        vec!["Memento", "Short A", "Short B", "Solaris"]
    );
}

// ============================================================================
// Item directories
// ============================================================================

#[test]
fn test_item_directory_entries() {
    let (fs, _) = setup();
    assert_eq!(
        fs.list(&p(&["title", "Inception"])).unwrap(),
        vec![".", "..", "inception.mkv", "info"]
    );
    let kinds: Vec<FileType> = fs
        .entries(&p(&["director", "Christopher Nolan", "Memento"]))
        .unwrap()
        .into_iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            FileType::Directory,
            FileType::Directory,
            FileType::Symlink,
            FileType::File
        ]
    );
}

#[test]
fn test_item_symlink_target() {
    let (fs, _) = setup();
    let link = p(&["title", "Inception", "inception.mkv"]);
    let target = fs.link_target(&link).unwrap();
    assert_eq!(target, PathBuf::from("/library/drama/inception.mkv"));

    let attr = fs.attributes(&link).unwrap();
    assert!(attr.is_symlink());
    assert_eq!(attr.size, target.as_os_str().len() as u64);
    assert_eq!(attr.perm, 0o777);
}

#[test]
fn test_info_file() {
    let (fs, catalog) = setup();
    let info = p(&["imdb", "tt1375666", "info"]);
    let attr = fs.attributes(&info).unwrap();
    assert!(attr.is_file());
    assert_eq!(attr.perm, 0o444);

    let content = fs.content(&info).unwrap();
    assert_eq!(attr.size, content.len() as u64);

    let item = catalog.inner.get_item(27205).unwrap().unwrap();
    assert_eq!(String::from_utf8(content).unwrap(), describe(&item));
}

#[test]
fn test_ambiguous_names_resolve_consistently() {
    let (fs, _) = setup();
    let text = String::from_utf8(fs.content(&p(&["title", "Solaris", "info"])).unwrap()).unwrap();
    assert!(text.starts_with("\nSolaris (1972)\n"), "{text}");

    // A scoped facet narrows the choice before the tie-break.
    let text =
        String::from_utf8(fs.content(&p(&["year", "2002", "Solaris", "info"])).unwrap()).unwrap();
    assert!(text.starts_with("\nSolaris (2002)\n"), "{text}");
    assert_eq!(
        fs.link_target(&p(&["year", "2002", "Solaris", "solaris-2002.mkv"]))
            .unwrap(),
        PathBuf::from("/library/remakes/solaris-2002.mkv")
    );
}

#[test]
fn test_operations_at_wrong_depth_are_not_found() {
    let (fs, _) = setup();
    let item = p(&["title", "Memento"]);
    let info = p(&["title", "Memento", "info"]);
    let link = p(&["title", "Memento", "memento.avi"]);

    assert!(fs.link_target(&[]).unwrap_err().is_not_found());
    assert!(fs.link_target(&p(&["title"])).unwrap_err().is_not_found());
    assert!(fs.link_target(&item).unwrap_err().is_not_found());
    assert!(fs.content(&[]).unwrap_err().is_not_found());
    assert!(fs.content(&p(&["title"])).unwrap_err().is_not_found());
    assert!(fs.content(&item).unwrap_err().is_not_found());
    assert!(fs.content(&link).unwrap_err().is_not_found());
    assert!(fs.content(&p(&["title", "Memento", "."])).unwrap_err().is_not_found());
    assert!(fs.entries(&info).unwrap_err().is_not_found());
    assert!(
        fs.attributes(&p(&["title", "Memento", "info", "deeper"]))
            .unwrap_err()
            .is_not_found()
    );
}

#[test]
fn test_symlink_target_ignores_child_name() {
    let (fs, _) = setup();
    let expected = PathBuf::from("/library/thriller/memento.avi");
    for child in ["memento.avi", "info", "..", "renamed.mkv"] {
        assert_eq!(
            fs.link_target(&p(&["title", "Memento", child])).unwrap(),
            expected,
            "{child}"
        );
    }
    // The item itself must still be reachable.
    assert!(
        fs.link_target(&p(&["actor", "Guy Pearce", "Inception", "info"]))
            .unwrap_err()
            .is_not_found()
    );
}

// ============================================================================
// Cache behavior
// ============================================================================

#[test]
fn test_listing_is_cached() {
    let (fs, catalog) = setup();
    let first = fs.list(&p(&["actor"])).unwrap();
    let queries = catalog.listing_queries();
    assert_eq!(queries, 1);

    let second = fs.list(&p(&["actor"])).unwrap();
    assert_eq!(first, second);
    assert_eq!(catalog.listing_queries(), queries);

    // Walking into a listed name reuses the parent listing.
    fs.list(&p(&["actor", "Guy Pearce"])).unwrap();
    fs.list(&p(&["actor", "Guy Pearce"])).unwrap();
    assert_eq!(catalog.listing_queries(), 2);
    assert_eq!(fs.cache().len(), 2);
}

#[test]
fn test_item_lookups_are_not_cached() {
    let (fs, catalog) = setup();
    let info = p(&["title", "Memento", "info"]);
    fs.attributes(&info).unwrap();
    fs.attributes(&info).unwrap();
    assert_eq!(catalog.counts.find_item.load(Ordering::SeqCst), 2);
    assert_eq!(catalog.listing_queries(), 1);
}

#[test]
fn test_concurrent_listings_agree() {
    let (fs, _) = setup();
    let fs = Arc::new(fs);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let fs = Arc::clone(&fs);
            std::thread::spawn(move || fs.list(&p(&["director", "Christopher Nolan"])).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec!["Inception", "Memento"]);
    }
}

// ============================================================================
// Path-based VfsOps surface
// ============================================================================

#[tokio::test]
async fn test_vfs_ops_paths() {
    let (fs, _) = setup();
    assert!(fs.read_only());
    assert!(fs.getattr(Path::new("/")).await.unwrap().is_dir());
    assert!(fs.exists(Path::new("/genre/Mystery/Memento/info")).await);
    assert!(!fs.exists(Path::new("/genre/Mystery/Inception")).await);

    let names: Vec<String> = fs
        .readdir(Path::new("/title/Short A"))
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec![".", "..", "a.mkv", "info"]);

    assert_eq!(
        fs.readlink(Path::new("/title/Short A/a.mkv")).await.unwrap(),
        PathBuf::from("/library/shorts/a.mkv")
    );
}

#[tokio::test]
async fn test_vfs_read_window() {
    let (fs, _) = setup();
    let path = Path::new("/title/Inception/info");
    let all = fs.read_all(path).await.unwrap();
    assert!(String::from_utf8_lossy(&all).contains("Released: 16. July 2010"));

    let head = fs.read(path, 0, 11).await.unwrap();
    assert_eq!(head, b"\nInception ");
    let tail = fs.read(path, all.len() as u64 - 2, 100).await.unwrap();
    assert_eq!(tail, b"\n\n");
    assert!(fs.read(path, all.len() as u64 + 10, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_relative_path_base_is_absolutized() {
    let inner = CatalogDb::in_memory().unwrap();
    populate(&inner);
    let catalog: Arc<dyn Catalog> = Arc::new(inner);
    let fs = FacetTable::standard(catalog, &FsOptions::new("media")).unwrap();
    assert!(fs.path_base().is_absolute());

    let target = fs
        .readlink(Path::new("/title/Memento/memento.avi"))
        .await
        .unwrap();
    assert!(target.is_absolute());
    assert!(target.ends_with("media/thriller/memento.avi"));
}

// ============================================================================
// Entry names for awkward catalog values
// ============================================================================

async fn names(fs: &FacetTable, path: &str) -> Vec<String> {
    fs.readdir(Path::new(path))
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect()
}

/// Walk every directory from the root, checking each listed name against
/// `getattr` and the operation its kind allows. Returns the number of entries
/// visited.
async fn walk(fs: &FacetTable) -> usize {
    let mut visited = 0;
    let mut pending = vec![PathBuf::from("/")];
    while let Some(dir) = pending.pop() {
        for entry in fs.readdir(&dir).await.unwrap() {
            if entry.name == "." || entry.name == ".." {
                continue;
            }
            assert!(
                !entry.name.is_empty() && !entry.name.contains('/'),
                "{}: {:?}",
                dir.display(),
                entry.name
            );
            let path = dir.join(&entry.name);
            let attr = fs
                .getattr(&path)
                .await
                .unwrap_or_else(|e| panic!("{}: {e}", path.display()));
            assert_eq!(attr.kind, entry.kind, "{}", path.display());
            match entry.kind {
                FileType::Directory => pending.push(path),
                FileType::Symlink => {
                    let target = fs.readlink(&path).await.unwrap();
                    assert!(target.starts_with("/library"), "{}", target.display());
                    assert_eq!(attr.size, target.as_os_str().len() as u64);
                }
                FileType::File => {
                    let content = fs.read_all(&path).await.unwrap();
                    assert_eq!(attr.size, content.len() as u64);
                }
            }
            visited += 1;
        }
    }
    visited
}

#[tokio::test]
async fn test_every_listed_name_resolves() {
    let (fs, _) = setup();
    assert!(walk(&fs).await > 0);

    let fs = setup_awkward();
    assert!(walk(&fs).await > 0);
}

#[tokio::test]
async fn test_slash_in_value_is_escaped() {
    let fs = setup_awkward();
    let titles = names(&fs, "/title").await;
    assert!(titles.contains(&"Face%2FOff".to_string()), "{titles:?}");

    let info = fs.read_all(Path::new("/title/Face%2FOff/info")).await.unwrap();
    assert!(String::from_utf8_lossy(&info).starts_with("\nFace/Off (1997)\n"));
    assert_eq!(
        fs.readlink(Path::new("/genre/Action%2FThriller/Face%2FOff/face-off.mkv"))
            .await
            .unwrap(),
        PathBuf::from("/library/action/face-off.mkv")
    );

    // Neither the raw value nor a differently spelled escape is a listed name.
    assert!(fs.getattr(Path::new("/title/Face/Off")).await.unwrap_err().is_not_found());
    assert!(fs.getattr(Path::new("/title/Face%2fOff")).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_dot_and_empty_values_are_escaped() {
    let fs = setup_awkward();
    assert!(names(&fs, "/title").await.contains(&"%2E".to_string()));
    assert_eq!(
        names(&fs, "/title/%2E").await,
        vec![".", "..", "dot.mkv", "info"]
    );

    assert!(names(&fs, "/actor").await.contains(&"%2E%2E".to_string()));
    assert_eq!(names(&fs, "/actor/%2E%2E").await, vec!["%2E"]);

    assert!(names(&fs, "/imdb").await.contains(&"%".to_string()));
    assert!(fs.getattr(Path::new("/imdb/%/info")).await.unwrap().is_file());
}

#[test]
fn test_media_named_info_does_not_shadow_description() {
    let fs = setup_awkward();
    let item = p(&["title", "Making Of"]);
    assert_eq!(fs.list(&item).unwrap(), vec![".", "..", "_info", "info"]);

    let link = p(&["title", "Making Of", "_info"]);
    assert!(fs.attributes(&link).unwrap().is_symlink());
    assert_eq!(
        fs.link_target(&link).unwrap(),
        PathBuf::from("/library/extras/info")
    );
    assert!(fs.attributes(&p(&["title", "Making Of", "info"])).unwrap().is_file());
}
