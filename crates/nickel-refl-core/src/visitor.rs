// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! File visitor: one header's cursor tree in, one metadata tree out.
//!
//! Traversal rules:
//! - cursors declared outside the visited file (other includes, system
//!   headers) are skipped together with their subtrees;
//! - the first namespace/class/enum built at a cursor consumes that cursor's
//!   subtree; other cursor kinds are walked through transparently;
//! - nodes are fully built before being recorded into their parent, and
//!   recorded only when [`Node::needs_recording`] holds;
//! - enums nested in a class go to the class's enum partitions only.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

use crate::attrs::{effective, ReflAttributes};
use crate::cursor::{AstProvider, Cursor, CursorKind, ParseFailure, StorageClass};
use crate::tree::{
    record_into, ClassNode, ConstructorNode, EnumNode, FunctionNode, MergeError, NamespaceNode,
    Node, VariableNode,
};

/// Default reflection marker looked for before invoking the AST provider.
pub const DEFAULT_MARKER: &str = "NICKEL_REFL_ATTR";

/// Failure while visiting one file.
#[derive(Debug, Error)]
pub enum VisitError {
    /// The AST provider rejected the file.
    #[error(transparent)]
    Parse(#[from] ParseFailure),
    /// The file could not be read for the marker pre-check.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// Declarations in the file could not be merged.
    #[error("{}: {source}", path.display())]
    Merge {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: MergeError,
    },
}

impl VisitError {
    /// Whether the run may continue with an empty tree for this file.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Read { .. })
    }
}

/// Builds metadata trees from an [`AstProvider`].
#[derive(Debug)]
pub struct FileVisitor<P> {
    provider: P,
    include_dir: PathBuf,
    marker: String,
}

impl<P: AstProvider> FileVisitor<P> {
    /// Visitor passing `include_dir` to the provider and pre-checking for `marker`.
    pub fn new(provider: P, include_dir: impl Into<PathBuf>, marker: impl Into<String>) -> Self {
        Self {
            provider,
            include_dir: include_dir.into(),
            marker: marker.into(),
        }
    }

    /// Read `path` from disk and visit it.
    pub fn visit_path(&self, path: &Path) -> Result<Node, VisitError> {
        let source = std::fs::read_to_string(path).map_err(|source| VisitError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.visit_source(path, &source)
    }

    /// Visit `path` whose text is `source`.
    ///
    /// Files without the marker return the empty root without touching the
    /// provider.
    pub fn visit_source(&self, path: &Path, source: &str) -> Result<Node, VisitError> {
        if !source.contains(self.marker.as_str()) {
            trace!(path = %path.display(), "no reflection marker; skipping");
            return Ok(Node::empty_root());
        }

        debug!(path = %path.display(), "parsing");
        let unit = self.provider.parse(path, &self.include_dir)?;

        let walker = Walker { file: path };
        let mut root = NamespaceNode::new("");
        walker
            .visit_children(&unit, ReflAttributes::NONE, &mut root.children)
            .map_err(|source| VisitError::Merge {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Node::Namespace(root))
    }
}

struct Walker<'p> {
    file: &'p Path,
}

impl Walker<'_> {
    fn visit_children(
        &self,
        cursor: &Cursor,
        scope: ReflAttributes,
        out: &mut Vec<Node>,
    ) -> Result<(), MergeError> {
        for child in &cursor.children {
            self.visit(child, scope, out)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        cursor: &Cursor,
        scope: ReflAttributes,
        out: &mut Vec<Node>,
    ) -> Result<(), MergeError> {
        if !cursor.is_from(self.file) {
            return Ok(());
        }
        match cursor.kind {
            CursorKind::Namespace => {
                let ns = self.namespace(cursor, scope)?;
                record_into(out, Node::Namespace(ns))
            }
            CursorKind::ClassDecl | CursorKind::StructDecl => {
                if !cursor.is_definition {
                    return Ok(());
                }
                let class = Node::Class(self.class(cursor, scope)?);
                record_if_needed(out, class)
            }
            CursorKind::EnumDecl => {
                if !cursor.is_definition {
                    return Ok(());
                }
                record_if_needed(out, Node::Enum(enumeration(cursor, scope)))
            }
            _ => self.visit_children(cursor, scope, out),
        }
    }

    fn namespace(&self, cursor: &Cursor, scope: ReflAttributes) -> Result<NamespaceNode, MergeError> {
        let mut ns = NamespaceNode::new(cursor.spelling.as_str());
        ns.attrs = effective(local_attrs(cursor), scope);
        self.visit_children(cursor, ns.attrs, &mut ns.children)?;
        Ok(ns)
    }

    fn class(&self, cursor: &Cursor, scope: ReflAttributes) -> Result<ClassNode, MergeError> {
        let mut class = ClassNode::new(cursor.spelling.as_str());
        class.attrs = effective(local_attrs(cursor), scope);
        let attrs = class.attrs;

        for child in &cursor.children {
            match (child.kind, child.access) {
                (CursorKind::Constructor, Some(access)) => {
                    class.ctors.push(access, constructor(child, attrs));
                }
                (CursorKind::FieldDecl, Some(access)) => {
                    class.fields.push(access, field(child, attrs));
                }
                (CursorKind::Method, Some(access)) => {
                    class.methods.push(access, method(child, attrs));
                }
                (CursorKind::EnumDecl, Some(access)) if child.is_definition => {
                    class.enums.push(access, enumeration(child, attrs));
                }
                (CursorKind::ClassDecl | CursorKind::StructDecl, _)
                    if child.is_definition && child.is_from(self.file) =>
                {
                    let nested = Node::Class(self.class(child, attrs)?);
                    record_if_needed(&mut class.children, nested)?;
                }
                _ => {}
            }
        }
        Ok(class)
    }
}

fn record_if_needed(out: &mut Vec<Node>, node: Node) -> Result<(), MergeError> {
    if node.needs_recording() {
        record_into(out, node)
    } else {
        trace!(name = node.name(), kind = %node.kind(), "not recorded");
        Ok(())
    }
}

fn local_attrs(cursor: &Cursor) -> ReflAttributes {
    cursor
        .annotation()
        .map_or(ReflAttributes::NONE, ReflAttributes::parse)
}

fn param_types(cursor: &Cursor) -> Vec<String> {
    cursor
        .children
        .iter()
        .filter(|c| c.kind == CursorKind::Parameter)
        .map(|c| c.type_spelling.clone())
        .collect()
}

fn enumeration(cursor: &Cursor, scope: ReflAttributes) -> EnumNode {
    EnumNode {
        name: cursor.spelling.clone(),
        attrs: effective(local_attrs(cursor), scope),
        items: cursor
            .children
            .iter()
            .filter(|c| c.kind == CursorKind::EnumConstant)
            .map(|c| c.spelling.clone())
            .collect(),
    }
}

fn field(cursor: &Cursor, scope: ReflAttributes) -> VariableNode {
    VariableNode {
        name: cursor.spelling.clone(),
        attrs: effective(local_attrs(cursor), scope),
        ty: cursor.type_spelling.clone(),
        is_static: cursor.storage == StorageClass::Static,
        is_member: true,
    }
}

fn method(cursor: &Cursor, scope: ReflAttributes) -> FunctionNode {
    FunctionNode {
        name: cursor.spelling.clone(),
        attrs: effective(local_attrs(cursor), scope),
        params: param_types(cursor),
        return_type: cursor.result_type_spelling.clone(),
        is_static: cursor.storage == StorageClass::Static,
        declared_type: cursor.type_spelling.clone(),
    }
}

fn constructor(cursor: &Cursor, scope: ReflAttributes) -> ConstructorNode {
    ConstructorNode {
        attrs: effective(local_attrs(cursor), scope),
        params: param_types(cursor),
    }
}
