// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem-backed `CacheStore` rooted at the configured cache directory.

use nickel_refl_core::cache::{CacheError, CacheStore};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Store cache blobs as `<key>.cbor` files under one directory.
///
/// Saves go through a temporary file in the same directory and are renamed
/// into place, so a crash mid-save leaves the previous blob intact.
pub struct FsCacheStore {
    base: PathBuf,
}

impl FsCacheStore {
    /// Create a store rooted at `base`. The directory is created on first save.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Directory holding the blobs.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base.join(format!("{key}.cbor"))
    }
}

impl CacheStore for FsCacheStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(CacheError::NotFound),
            Err(err) => Err(CacheError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), CacheError> {
        fs::create_dir_all(&self.base)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.base)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(key)).map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCacheStore::new(dir.path());
        assert!(matches!(store.load_raw("refl_cache"), Err(CacheError::NotFound)));
    }

    #[test]
    fn save_creates_directory_and_replaces_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCacheStore::new(dir.path().join("nested/cache"));
        store.save_raw("refl_cache", b"first").unwrap();
        store.save_raw("refl_cache", b"second").unwrap();

        assert_eq!(store.load_raw("refl_cache").unwrap(), b"second");
        let names: Vec<_> = fs::read_dir(store.base())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, ["refl_cache.cbor"]);
    }

    #[test]
    fn unreadable_blob_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("refl_cache.cbor")).unwrap();
        let store = FsCacheStore::new(dir.path());
        assert!(matches!(store.load_raw("refl_cache"), Err(CacheError::Io(_))));
    }
}
