// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Incremental cache: per-file modification stamp and last-derived tree.
//!
//! Lifecycle for one run: load the prior snapshot through a [`CacheService`],
//! [`IncrementalCache::refresh`] it against the current candidate files, then
//! save the whole map back. Entries iterate in sorted path order, which is the
//! order aggregate artifacts list files in.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ident::path_key;
use crate::tree::Node;
use crate::visitor::VisitError;

/// Store key under which the generator keeps its snapshot.
pub const CACHE_KEY: &str = "refl_cache";

/// Storage port for the persisted snapshot blob.
///
/// The generator uses a single key, [`CACHE_KEY`], and rewrites the whole
/// blob at the end of every successful run. A save must replace the previous
/// blob as a unit: a reader never sees a partially written snapshot.
pub trait CacheStore {
    /// Load a raw blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, CacheError>;
    /// Persist a raw blob, replacing any previous one.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), CacheError>;
}

/// Error type for cache storage and codec operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Key not present in store; a first run, treated as an empty cache.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// CBOR encoding failure.
    #[error("encode error: {0}")]
    Encode(#[from] ciborium::ser::Error<std::io::Error>),
    /// CBOR decoding failure (corrupt or foreign blob). The cache recovers by
    /// starting empty.
    #[error("decode error: {0}")]
    Decode(#[from] ciborium::de::Error<std::io::Error>),
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

/// CBOR codec over a [`CacheStore`].
///
/// An empty blob decodes as absent, so a truncated save behaves like a
/// missing cache rather than a decode failure.
pub struct CacheService<S> {
    store: S,
}

impl<S> CacheService<S> {
    /// Create a new service using the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> CacheService<S>
where
    S: CacheStore,
{
    /// Load and decode a value for `key`. Returns `Ok(None)` if missing or empty.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, CacheError>
    where
        T: DeserializeOwned,
    {
        match self.store.load_raw(key) {
            Ok(bytes) => {
                if bytes.is_empty() {
                    return Ok(None);
                }
                let value = ciborium::from_reader(bytes.as_slice())?;
                Ok(Some(value))
            }
            Err(CacheError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Encode and persist a value for `key`.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let mut data = Vec::new();
        ciborium::into_writer(value, &mut data)?;
        self.store.save_raw(key, &data)
    }
}

/// File modification time with nanosecond resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileStamp {
    /// Whole seconds since the Unix epoch.
    pub secs: u64,
    /// Sub-second nanoseconds.
    pub nanos: u32,
}

impl FileStamp {
    /// Stamp for a wall-clock time; times before the epoch clamp to zero.
    pub fn from_system_time(time: SystemTime) -> Self {
        let since = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self {
            secs: since.as_secs(),
            nanos: since.subsec_nanos(),
        }
    }

    /// Current modification stamp of `path`.
    pub fn of(path: &Path) -> std::io::Result<Self> {
        Ok(Self::from_system_time(std::fs::metadata(path)?.modified()?))
    }
}

/// A file the run should account for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Path as discovered.
    pub path: PathBuf,
    /// Its current modification stamp.
    pub stamp: FileStamp,
}

/// Cached state for one file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Stamp the tree was derived at.
    pub stamp: FileStamp,
    /// Derived tree; the empty root when the file contributed nothing.
    pub root: Node,
}

/// Persisted form of the cache.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Generator fingerprint the entries were produced under.
    pub fingerprint: String,
    /// Entries keyed by normalized path.
    pub entries: BTreeMap<String, CacheEntry>,
}

#[derive(Serialize)]
struct SnapshotView<'a> {
    fingerprint: &'a str,
    entries: &'a BTreeMap<String, CacheEntry>,
}

/// Outcome of [`IncrementalCache::refresh`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// At least one file was (re)visited or dropped.
    pub changed: bool,
    /// Files handed to the visitor.
    pub visited: usize,
    /// Files carried forward unchanged.
    pub reused: usize,
    /// Visits that failed recoverably and were stored as empty.
    pub failed: usize,
    /// Prior entries with no matching candidate.
    pub dropped: usize,
}

/// In-memory cache for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IncrementalCache {
    fingerprint: String,
    entries: BTreeMap<String, CacheEntry>,
}

impl IncrementalCache {
    /// Empty cache for `fingerprint`.
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Adopt a loaded snapshot, discarding it when produced under another fingerprint.
    pub fn from_snapshot(snapshot: CacheSnapshot, fingerprint: &str) -> Self {
        if snapshot.fingerprint != fingerprint {
            info!(
                entries = snapshot.entries.len(),
                "generator fingerprint changed; discarding cache"
            );
            return Self::new(fingerprint);
        }
        Self {
            fingerprint: snapshot.fingerprint,
            entries: snapshot.entries,
        }
    }

    /// Load through `service`, falling back to an empty cache when the blob is
    /// missing or undecodable.
    pub fn load<S: CacheStore>(
        service: &CacheService<S>,
        fingerprint: &str,
    ) -> Result<Self, CacheError> {
        match service.load::<CacheSnapshot>(CACHE_KEY) {
            Ok(Some(snapshot)) => Ok(Self::from_snapshot(snapshot, fingerprint)),
            Ok(None) => Ok(Self::new(fingerprint)),
            Err(CacheError::Decode(err)) => {
                warn!(error = %err, "cache blob is unreadable; starting from an empty cache");
                Ok(Self::new(fingerprint))
            }
            Err(err) => Err(err),
        }
    }

    /// Persist the full map through `service`.
    pub fn save<S: CacheStore>(&self, service: &CacheService<S>) -> Result<(), CacheError> {
        service.save(
            CACHE_KEY,
            &SnapshotView {
                fingerprint: &self.fingerprint,
                entries: &self.entries,
            },
        )
    }

    /// Reconcile the cache with `candidates`.
    ///
    /// Entries whose stamp matches are carried forward untouched. Every other
    /// candidate goes through `visit`; a recoverable failure stores the empty
    /// tree (erasing whatever was recorded before), a fatal one aborts.
    /// Entries for paths no longer among the candidates are dropped.
    pub fn refresh<F>(
        &mut self,
        candidates: &[Candidate],
        mut visit: F,
    ) -> Result<RefreshReport, VisitError>
    where
        F: FnMut(&Path) -> Result<Node, VisitError>,
    {
        let mut prior = std::mem::take(&mut self.entries);
        let mut report = RefreshReport::default();

        for candidate in candidates {
            let key = path_key(&candidate.path);
            if self.entries.contains_key(&key) {
                continue;
            }
            if let Some(entry) = prior.remove(&key) {
                if entry.stamp == candidate.stamp {
                    debug!(path = %key, "unchanged; reusing cached tree");
                    report.reused += 1;
                    self.entries.insert(key, entry);
                    continue;
                }
            }

            report.visited += 1;
            let root = match visit(&candidate.path) {
                Ok(root) if !root.is_empty() => root,
                Ok(_) => Node::empty_root(),
                Err(err) if err.is_recoverable() => {
                    warn!(path = %key, error = %err, "visit failed; recording no metadata for this file");
                    report.failed += 1;
                    Node::empty_root()
                }
                Err(err) => return Err(err),
            };
            self.entries.insert(
                key,
                CacheEntry {
                    stamp: candidate.stamp,
                    root,
                },
            );
        }

        report.dropped = prior.len();
        for key in prior.keys() {
            debug!(path = %key, "no longer a candidate; dropping");
        }
        report.changed = report.visited > 0 || report.dropped > 0;
        Ok(report)
    }

    /// Fingerprint the entries belong to.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// All entries in path order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entry for `path`, if cached.
    pub fn get(&self, path: &Path) -> Option<&CacheEntry> {
        self.entries.get(&path_key(path))
    }

    /// Number of cached files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no file is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::tree::{ClassNode, NamespaceNode};
    use crate::ReflAttributes;

    fn stamp(secs: u64) -> FileStamp {
        FileStamp { secs, nanos: 0 }
    }

    fn candidate(path: &str, secs: u64) -> Candidate {
        Candidate {
            path: PathBuf::from(path),
            stamp: stamp(secs),
        }
    }

    fn tree(class: &str) -> Node {
        let mut c = ClassNode::new(class);
        c.attrs = ReflAttributes::parse("nickel(refl)");
        Node::Namespace(NamespaceNode {
            name: String::new(),
            attrs: ReflAttributes::NONE,
            children: vec![Node::Class(c)],
        })
    }

    #[test]
    fn unchanged_stamp_is_reused_without_visiting() {
        let mut cache = IncrementalCache::new("fp");
        cache
            .refresh(&[candidate("a.hpp", 1)], |_| Ok(tree("A")))
            .unwrap();

        let report = cache
            .refresh(&[candidate("a.hpp", 1)], |_| panic!("must not visit"))
            .unwrap();
        assert!(!report.changed);
        assert_eq!(report.reused, 1);
        assert_eq!(cache.get(Path::new("a.hpp")).unwrap().root, tree("A"));
    }

    #[test]
    fn changed_stamp_revisits_and_replaces() {
        let mut cache = IncrementalCache::new("fp");
        cache
            .refresh(&[candidate("a.hpp", 1)], |_| Ok(tree("A")))
            .unwrap();
        let report = cache
            .refresh(&[candidate("a.hpp", 2)], |_| Ok(tree("B")))
            .unwrap();
        assert!(report.changed);
        assert_eq!(report.visited, 1);
        let entry = cache.get(Path::new("a.hpp")).unwrap();
        assert_eq!(entry.stamp, stamp(2));
        assert_eq!(entry.root, tree("B"));
    }

    #[test]
    fn removed_files_are_dropped_and_count_as_change() {
        let mut cache = IncrementalCache::new("fp");
        cache
            .refresh(&[candidate("a.hpp", 1), candidate("b.hpp", 1)], |_| {
                Ok(tree("A"))
            })
            .unwrap();
        let report = cache
            .refresh(&[candidate("a.hpp", 1)], |_| panic!("must not visit"))
            .unwrap();
        assert!(report.changed);
        assert_eq!(report.dropped, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn recoverable_failure_erases_prior_metadata() {
        let mut cache = IncrementalCache::new("fp");
        cache
            .refresh(&[candidate("a.hpp", 1)], |_| Ok(tree("A")))
            .unwrap();
        let report = cache
            .refresh(&[candidate("a.hpp", 2)], |p| {
                Err(VisitError::Parse(crate::ParseFailure {
                    path: p.to_path_buf(),
                    reason: "missing include".into(),
                }))
            })
            .unwrap();
        assert_eq!(report.failed, 1);
        assert!(cache.get(Path::new("a.hpp")).unwrap().root.is_empty());
    }

    #[test]
    fn mismatched_fingerprint_discards_snapshot() {
        let mut cache = IncrementalCache::new("old");
        cache
            .refresh(&[candidate("a.hpp", 1)], |_| Ok(tree("A")))
            .unwrap();
        let snapshot = CacheSnapshot {
            fingerprint: "old".into(),
            entries: cache.entries.clone(),
        };
        assert!(IncrementalCache::from_snapshot(snapshot.clone(), "new").is_empty());
        assert_eq!(IncrementalCache::from_snapshot(snapshot, "old").len(), 1);
    }

    #[test]
    fn stamps_before_epoch_clamp_to_zero() {
        let before = UNIX_EPOCH - std::time::Duration::from_secs(5);
        assert_eq!(FileStamp::from_system_time(before), FileStamp::default());
    }
}
