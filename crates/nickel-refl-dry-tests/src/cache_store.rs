// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory cache store fake for testing without filesystem I/O.

use nickel_refl_core::cache::{CacheError, CacheStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory implementation of [`CacheStore`] for testing.
///
/// Clones share state, so a test can hand one clone to a generator and keep
/// another to inspect call counts and stored blobs.
///
/// # Example
///
/// ```
/// use nickel_refl_dry_tests::InMemoryCacheStore;
/// use nickel_refl_core::cache::{CacheService, CacheStore};
///
/// let store = InMemoryCacheStore::new();
/// let service = CacheService::new(store.clone());
///
/// service.save("refl_cache", &vec![1u32, 2, 3]).unwrap();
/// assert_eq!(store.load_count(), 0);
/// assert_eq!(store.save_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryCacheStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    data: HashMap<String, Vec<u8>>,
    load_count: usize,
    save_count: usize,
    fail_on_load: bool,
    fail_on_save: bool,
}

impl InMemoryCacheStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `data` under `key`.
    pub fn with_blob(key: &str, data: impl Into<Vec<u8>>) -> Self {
        let store = Self::new();
        store.lock().data.insert(key.to_owned(), data.into());
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Configure the store to fail on load operations.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.lock().fail_on_load = fail;
    }

    /// Configure the store to fail on save operations.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.lock().fail_on_save = fail;
    }

    /// Number of `load_raw` attempts, failed ones included.
    pub fn load_count(&self) -> usize {
        self.lock().load_count
    }

    /// Number of `save_raw` attempts, failed ones included.
    pub fn save_count(&self) -> usize {
        self.lock().save_count
    }

    /// Blob currently stored under `key`.
    pub fn blob(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().data.get(key).cloned()
    }

    /// Check if a key exists in the store.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().data.contains_key(key)
    }
}

impl CacheStore for InMemoryCacheStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let mut inner = self.lock();
        inner.load_count += 1;

        if inner.fail_on_load {
            return Err(CacheError::Other("simulated load failure".into()));
        }

        inner.data.get(key).cloned().ok_or(CacheError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), CacheError> {
        let mut inner = self.lock();
        inner.save_count += 1;

        if inner.fail_on_save {
            return Err(CacheError::Other("simulated save failure".into()));
        }

        inner.data.insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use nickel_refl_core::cache::CacheService;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        stamps: Vec<u64>,
    }

    #[test]
    fn round_trip_save_load() {
        let store = InMemoryCacheStore::new();
        store.save_raw("test", b"hello").unwrap();
        assert_eq!(store.load_raw("test").unwrap(), b"hello");
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load_count(), 1);
    }

    #[test]
    fn load_missing_key_returns_not_found() {
        let store = InMemoryCacheStore::new();
        assert!(matches!(store.load_raw("missing"), Err(CacheError::NotFound)));
    }

    #[test]
    fn failures_still_count_and_store_nothing() {
        let store = InMemoryCacheStore::new();
        store.set_fail_on_save(true);
        assert!(matches!(store.save_raw("k", b"v"), Err(CacheError::Other(_))));
        assert!(!store.contains_key("k"));
        assert_eq!(store.save_count(), 1);

        store.set_fail_on_load(true);
        assert!(store.load_raw("k").is_err());
        assert_eq!(store.load_count(), 1);
    }

    #[test]
    fn clones_share_state() {
        let a = InMemoryCacheStore::new();
        let b = a.clone();
        a.save_raw("shared", b"x").unwrap();
        assert_eq!(b.blob("shared").unwrap(), b"x");
        b.set_fail_on_load(true);
        assert!(a.load_raw("shared").is_err());
    }

    #[test]
    fn service_round_trips_through_cbor() {
        let store = InMemoryCacheStore::new();
        let service = CacheService::new(store.clone());
        let value = Sample {
            name: "engine/nickel/refl.hpp".into(),
            stamps: vec![1, 2],
        };
        service.save("k", &value).unwrap();
        assert_eq!(service.load::<Sample>("k").unwrap(), Some(value));
        assert_eq!(service.load::<Sample>("absent").unwrap(), None);
    }

    #[test]
    fn garbage_blob_is_a_decode_error() {
        let service = CacheService::new(InMemoryCacheStore::with_blob("k", vec![0xff, 0x00]));
        assert!(matches!(service.load::<Sample>("k"), Err(CacheError::Decode(_))));
    }

    #[test]
    fn empty_blob_loads_as_absent_and_snapshot_starts_fresh() {
        use nickel_refl_core::cache::IncrementalCache;

        let store = InMemoryCacheStore::with_blob(nickel_refl_core::CACHE_KEY, Vec::new());
        let service = CacheService::new(store);
        assert_eq!(service.load::<Sample>(nickel_refl_core::CACHE_KEY).unwrap(), None);
        let cache = IncrementalCache::load(&service, "fp").unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.fingerprint(), "fp");
    }
}
