//! Listing cache.
//!
//! Memoizes level-function results per facet and path prefix for the lifetime
//! of the mount. Entries are never evicted or invalidated: the namespace is a
//! snapshot of the catalog as of first access.

use dashmap::DashMap;
use std::sync::Arc;

use crate::vfs::VfsResult;

/// Cache key: facet name plus the path components already matched.
///
/// Components are kept separate rather than joined so that catalog values
/// containing `/` cannot alias a deeper prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingKey {
    pub facet: String,
    pub prefix: Vec<String>,
}

impl ListingKey {
    pub fn new(facet: &str, prefix: &[String]) -> Self {
        Self {
            facet: facet.to_string(),
            prefix: prefix.to_vec(),
        }
    }
}

/// Concurrent map from [`ListingKey`] to a finished listing.
///
/// A listing is published as a whole `Arc<[String]>`, so readers observe
/// either nothing or a complete listing. Two callers missing on the same key
/// both compute; the later insert wins, which is harmless because the same
/// catalog state yields the same listing. Failed computations are not cached.
#[derive(Debug, Default)]
pub struct ListingCache {
    entries: DashMap<ListingKey, Arc<[String]>>,
}

impl ListingCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached listing for `(facet, prefix)`, computing it on a miss.
    pub fn get_or_compute<F>(&self, facet: &str, prefix: &[String], compute: F) -> VfsResult<Arc<[String]>>
    where
        F: FnOnce() -> VfsResult<Vec<String>>,
    {
        let key = ListingKey::new(facet, prefix);
        if let Some(hit) = self.entries.get(&key) {
            tracing::trace!(facet, depth = prefix.len(), "listing cache hit");
            return Ok(Arc::clone(hit.value()));
        }

        // Compute without holding a shard lock: catalog queries may be slow.
        tracing::debug!(facet, depth = prefix.len(), "listing cache miss");
        let listing: Arc<[String]> = compute()?.into();
        self.entries.insert(key, Arc::clone(&listing));
        Ok(listing)
    }

    /// Cached listing for `(facet, prefix)`, if present.
    pub fn peek(&self, facet: &str, prefix: &[String]) -> Option<Arc<[String]>> {
        self.entries
            .get(&ListingKey::new(facet, prefix))
            .map(|e| Arc::clone(e.value()))
    }

    /// Number of cached listings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::VfsError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_computes_once() {
        let cache = ListingCache::new();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(names(&["a", "b"]))
        };

        let first = cache.get_or_compute("title", &[], compute).unwrap();
        let second = cache
            .get_or_compute("title", &[], || -> VfsResult<Vec<String>> {
                panic!("must not recompute")
            })
            .unwrap();

        assert_eq!(&*first, &*second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_are_per_facet_and_prefix() {
        let cache = ListingCache::new();
        cache.get_or_compute("actor", &[], || Ok(names(&["Guy Pearce"]))).unwrap();
        cache
            .get_or_compute("actor", &names(&["Guy Pearce"]), || Ok(names(&["Memento"])))
            .unwrap();
        cache.get_or_compute("genre", &[], || Ok(names(&["Drama"]))).unwrap();

        assert_eq!(cache.len(), 3);
        assert_eq!(
            cache.peek("actor", &names(&["Guy Pearce"])).as_deref(),
            Some(&names(&["Memento"])[..])
        );
        assert!(cache.peek("director", &[]).is_none());
    }

    #[test]
    fn test_slash_in_component_does_not_alias() {
        let cache = ListingCache::new();
        cache.get_or_compute("actor", &names(&["a/b"]), || Ok(names(&["x"]))).unwrap();
        assert!(cache.peek("actor", &names(&["a", "b"])).is_none());
    }

    #[test]
    fn test_errors_not_cached() {
        let cache = ListingCache::new();
        let result = cache.get_or_compute("year", &[], || Err(VfsError::not_found("boom")));
        assert!(result.is_err());
        assert!(cache.is_empty());

        let listing = cache.get_or_compute("year", &[], || Ok(names(&["2010"]))).unwrap();
        assert_eq!(&*listing, &names(&["2010"])[..]);
    }

    #[test]
    fn test_concurrent_population_is_whole() {
        let cache = Arc::new(ListingCache::new());
        let expected = names(&["1999", "2000", "2010"]);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let expected = expected.clone();
                std::thread::spawn(move || {
                    let got = cache
                        .get_or_compute("year", &[], || Ok(expected.clone()))
                        .unwrap();
                    assert_eq!(&*got, &expected[..]);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(cache.len(), 1);
    }
}
