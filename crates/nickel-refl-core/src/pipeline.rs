// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Run orchestration.
//!
//! One run: load cache, refresh it against the candidate headers, emit
//! per-file artifacts when anything changed, always emit the aggregates,
//! then commit the cache. Single-threaded; the cache is committed only after
//! every artifact was written.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::cache::{CacheService, CacheStore, Candidate, FileStamp, IncrementalCache};
use crate::config::ResolvedConfig;
use crate::cursor::AstProvider;
use crate::emit::{
    AggregateIndex, EmissionPlanner, BINDING_HEADER_FILE, BINDING_IMPL_FILE, REFL_HEADER_FILE,
    REFL_IMPL_FILE,
};
use crate::error::GenError;
use crate::ident::{normalize_path, path_key};
use crate::render::Renderer;
use crate::visitor::FileVisitor;

/// Version folded into the cache fingerprint.
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Counters for one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Files (re)visited.
    pub visited: usize,
    /// Files whose cached tree was reused.
    pub reused: usize,
    /// Files that failed recoverably.
    pub failed: usize,
    /// Cache entries dropped because their file is gone.
    pub dropped: usize,
    /// Artifacts whose content changed on disk.
    pub written: usize,
    /// Artifacts rendered identical to what was on disk.
    pub unchanged: usize,
}

/// The generator: AST provider, cache store and renderer wired to a config.
pub struct Generator<P, S, R> {
    config: ResolvedConfig,
    visitor: FileVisitor<P>,
    cache: CacheService<S>,
    renderer: R,
    planner: EmissionPlanner,
    force: bool,
}

impl<P, S, R> Generator<P, S, R>
where
    P: AstProvider,
    S: CacheStore,
    R: Renderer,
{
    /// Wire a generator.
    pub fn new(config: ResolvedConfig, provider: P, store: S, renderer: R) -> Self {
        Self {
            visitor: FileVisitor::new(provider, config.include_dir.clone(), config.marker.clone()),
            cache: CacheService::new(store),
            planner: EmissionPlanner::new(config.member_prefix.clone()),
            renderer,
            config,
            force: false,
        }
    }

    /// Ignore any persisted cache and re-visit every file.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Consume the generator, returning its cache store.
    pub fn into_store(self) -> S {
        self.cache.into_inner()
    }

    /// Hex digest of everything besides the headers that shapes the output.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(GENERATOR_VERSION.as_bytes());
        hasher.update(&[0]);
        self.renderer.fingerprint(&mut hasher);
        for part in [self.config.marker.as_str(), self.config.member_prefix.as_str()] {
            hasher.update(part.as_bytes());
            hasher.update(&[0]);
        }
        for arg in self.config.parser_args() {
            hasher.update(arg.as_bytes());
            hasher.update(&[0]);
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Run over `files`, the discovered headers.
    pub fn run(&self, files: &[PathBuf]) -> Result<RunSummary, GenError> {
        let fingerprint = self.fingerprint();
        let mut cache = if self.force {
            info!("forced run; ignoring persisted cache");
            IncrementalCache::new(fingerprint)
        } else {
            IncrementalCache::load(&self.cache, &fingerprint)?
        };

        let candidates: Vec<Candidate> = files
            .iter()
            .filter_map(|path| match FileStamp::of(path) {
                Ok(stamp) => Some(Candidate {
                    path: path.clone(),
                    stamp,
                }),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "header disappeared before it could be stamped; skipping");
                    None
                }
            })
            .collect();

        let report = cache.refresh(&candidates, |path| self.visitor.visit_path(path))?;
        let mut summary = RunSummary {
            visited: report.visited,
            reused: report.reused,
            failed: report.failed,
            dropped: report.dropped,
            ..RunSummary::default()
        };

        let refl_dir = &self.config.refl_output_dir;
        let binding_dir = &self.config.binding_output_dir;
        for dir in [refl_dir, binding_dir] {
            fs::create_dir_all(dir).map_err(GenError::io(dir))?;
        }

        let mut index = AggregateIndex::default();
        let mut owners: HashMap<String, String> = HashMap::new();
        for (key, entry) in cache.entries() {
            if entry.root.is_empty() {
                continue;
            }
            let plan = self.planner.plan_file(&self.include_path(key), &entry.root);
            if let Some(first) = owners.insert(plan.identifier.clone(), key.to_owned()) {
                warn!(identifier = %plan.identifier, first = %first, second = %key, "two headers derive the same identifier");
            }
            index.push(plan.identifier.clone());

            if report.changed {
                let rendered = plan.render(&self.renderer)?;
                debug!(path = %key, artifact = %rendered.artifact_name, "emitting");
                self.emit(&mut summary, &refl_dir.join(&rendered.artifact_name), &rendered.reflection)?;
                self.emit(&mut summary, &binding_dir.join(&rendered.artifact_name), &rendered.binding)?;
            }
        }

        let aggregates = index.render(&self.renderer)?;
        self.emit(&mut summary, &refl_dir.join(REFL_HEADER_FILE), &aggregates.refl_header)?;
        self.emit(&mut summary, &refl_dir.join(REFL_IMPL_FILE), &aggregates.refl_impl)?;
        self.emit(&mut summary, &binding_dir.join(BINDING_HEADER_FILE), &aggregates.binding_header)?;
        self.emit(&mut summary, &binding_dir.join(BINDING_IMPL_FILE), &aggregates.binding_impl)?;

        cache.save(&self.cache)?;
        info!(
            visited = summary.visited,
            reused = summary.reused,
            failed = summary.failed,
            dropped = summary.dropped,
            written = summary.written,
            unchanged = summary.unchanged,
            "generation finished"
        );
        Ok(summary)
    }

    /// `key` relative to the include root, as generated code includes it.
    fn include_path(&self, key: &str) -> String {
        let key = normalize_path(key);
        let root = normalize_path(&path_key(&self.config.include_dir));
        if root.is_empty() {
            return key;
        }
        match key.strip_prefix(root.as_str()).and_then(|rest| rest.strip_prefix('/')) {
            Some(rest) => rest.to_owned(),
            None => key,
        }
    }

    fn emit(&self, summary: &mut RunSummary, path: &Path, contents: &str) -> Result<(), GenError> {
        if write_if_changed(path, contents)? {
            info!(path = %path.display(), "wrote");
            summary.written += 1;
        } else {
            summary.unchanged += 1;
        }
        Ok(())
    }
}

/// Write `contents` unless the file already holds exactly that. Returns
/// whether the file was written.
pub fn write_if_changed(path: &Path, contents: &str) -> Result<bool, GenError> {
    match fs::read(path) {
        Ok(existing) if existing == contents.as_bytes() => Ok(false),
        _ => {
            fs::write(path, contents).map_err(GenError::io(path))?;
            Ok(true)
        }
    }
}
