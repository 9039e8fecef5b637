// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! nickel-refl-core: reflection and script-binding metadata for annotated C++.
//!
//! Headers annotated with `nickel(refl, script, ...)` attributes are walked
//! through an [`AstProvider`] into metadata trees ([`Node`]), reconciled by
//! structural merge, cached per file across runs, and planned into template
//! documents that render the registration code for the runtime type system
//! and the QuickJS binding layer.
//!
//! # Modules
//!
//! - [`attrs`] - attribute parsing and inheritance
//! - [`tree`] - metadata tree and structural merge
//! - [`cursor`] - AST provider port
//! - [`visitor`] - cursor tree to metadata tree
//! - [`cache`] - incremental per-file cache and its storage port
//! - [`ident`] - path normalization and derived identifiers
//! - [`emit`] - emission planning and template documents
//! - [`render`] - template rendering port and minijinja adapter
//! - [`config`] - generator configuration
//! - [`pipeline`] - run orchestration
#![forbid(unsafe_code)]

pub mod attrs;
pub mod cache;
pub mod config;
pub mod cursor;
pub mod emit;
mod error;
pub mod ident;
pub mod pipeline;
pub mod render;
pub mod tree;
pub mod visitor;

pub use attrs::{effective, ReflAttributes, ANNOTATION_PREFIX};
pub use cache::{
    CacheEntry, CacheError, CacheService, CacheSnapshot, CacheStore, Candidate, FileStamp,
    IncrementalCache, RefreshReport, CACHE_KEY,
};
pub use config::{GeneratorConfig, ResolvedConfig};
pub use cursor::{AstProvider, Cursor, CursorKind, ParseFailure, StorageClass};
pub use emit::{AggregateIndex, EmissionPlanner, FilePlan};
pub use error::GenError;
pub use ident::derive_identifier;
pub use pipeline::{Generator, RunSummary};
pub use render::{RenderError, Renderer, Template, TemplateRenderer};
pub use tree::{merge, record_into, Access, AccessLists, MergeError, Node, NodeKind};
pub use visitor::{FileVisitor, VisitError, DEFAULT_MARKER};
