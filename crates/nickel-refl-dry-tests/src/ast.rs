// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scripted AST provider and cursor builders.
//!
//! Builders produce the owned [`Cursor`] trees a real provider would hand the
//! visitor. Declaration locations default to the translation unit's file,
//! filled in by [`CursorBuilder::build`] on the unit.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use nickel_refl_core::cursor::{AstProvider, Cursor, CursorKind, ParseFailure, StorageClass};
use nickel_refl_core::tree::Access;

/// Fluent wrapper around a [`Cursor`].
#[derive(Clone, Debug)]
pub struct CursorBuilder {
    cursor: Cursor,
}

impl CursorBuilder {
    fn new(kind: CursorKind, spelling: &str) -> Self {
        Self {
            cursor: Cursor::new(kind, spelling),
        }
    }

    fn member(kind: CursorKind, spelling: &str) -> Self {
        Self::new(kind, spelling).access(Access::Public)
    }

    /// Declare the cursor in `path`.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cursor.file = Some(path.into());
        self
    }

    /// Mark the cursor as coming from a system header.
    pub fn system_header(mut self) -> Self {
        self.cursor.in_system_header = true;
        self
    }

    /// Set the access specifier.
    pub fn access(mut self, access: Access) -> Self {
        self.cursor.access = Some(access);
        self
    }

    /// Make this a forward declaration.
    pub fn declaration_only(mut self) -> Self {
        self.cursor.is_definition = false;
        self
    }

    /// Mark as `static`.
    pub fn static_storage(mut self) -> Self {
        self.cursor.storage = StorageClass::Static;
        self
    }

    /// Set the type spelling.
    pub fn ty(mut self, ty: &str) -> Self {
        self.cursor.type_spelling = ty.to_owned();
        self
    }

    /// Attach `nickel(...)` annotation text.
    pub fn annotate(self, text: &str) -> Self {
        self.child(annotation(text))
    }

    /// Append a child.
    pub fn child(mut self, child: Self) -> Self {
        self.cursor.children.push(child.cursor);
        self
    }

    /// Append several children.
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.cursor
            .children
            .extend(children.into_iter().map(|c| c.cursor));
        self
    }

    /// Finish. Cursors without a file inherit the nearest ancestor's.
    pub fn build(mut self) -> Cursor {
        let file = self.cursor.file.clone();
        inherit_file(&mut self.cursor, file.as_deref());
        self.cursor
    }
}

fn inherit_file(cursor: &mut Cursor, parent: Option<&Path>) {
    if cursor.file.is_none() {
        cursor.file = parent.map(Path::to_path_buf);
    }
    let own = cursor.file.clone();
    for child in &mut cursor.children {
        inherit_file(child, own.as_deref());
    }
}

/// Translation unit for `path`.
pub fn translation_unit(path: impl Into<PathBuf>) -> CursorBuilder {
    CursorBuilder::new(CursorKind::TranslationUnit, "").file(path)
}

/// `namespace name`
pub fn namespace(name: &str) -> CursorBuilder {
    CursorBuilder::new(CursorKind::Namespace, name)
}

/// `class name { ... }`
pub fn class(name: &str) -> CursorBuilder {
    CursorBuilder::new(CursorKind::ClassDecl, name)
}

/// `struct name { ... }`
pub fn struct_decl(name: &str) -> CursorBuilder {
    CursorBuilder::new(CursorKind::StructDecl, name)
}

/// `enum name { items... }`, public when nested in a class.
pub fn enum_decl(name: &str, items: &[&str]) -> CursorBuilder {
    CursorBuilder::member(CursorKind::EnumDecl, name).children(
        items
            .iter()
            .map(|item| CursorBuilder::new(CursorKind::EnumConstant, item)),
    )
}

/// Public data member `ty name`.
pub fn field(name: &str, ty: &str) -> CursorBuilder {
    CursorBuilder::member(CursorKind::FieldDecl, name).ty(ty)
}

/// Public member function returning `result` and taking `params`.
pub fn method(name: &str, result: &str, params: &[&str]) -> CursorBuilder {
    let mut builder = CursorBuilder::member(CursorKind::Method, name)
        .ty(&format!("{result} ({})", params.join(", ")))
        .children(params.iter().copied().map(param));
    builder.cursor.result_type_spelling = result.to_owned();
    builder
}

/// Public constructor taking `params`.
pub fn ctor(owner: &str, params: &[&str]) -> CursorBuilder {
    CursorBuilder::member(CursorKind::Constructor, owner).children(params.iter().copied().map(param))
}

/// Function parameter of type `ty`.
pub fn param(ty: &str) -> CursorBuilder {
    CursorBuilder::new(CursorKind::Parameter, "").ty(ty)
}

/// Annotation cursor carrying `text`.
pub fn annotation(text: &str) -> CursorBuilder {
    CursorBuilder::new(CursorKind::Annotation, text)
}

/// [`AstProvider`] answering from prepared cursor trees.
///
/// Unscripted paths fail to parse. Clones share scripts and counters.
#[derive(Clone, Default)]
pub struct ScriptedAstProvider {
    inner: Arc<Mutex<Scripts>>,
}

#[derive(Default)]
struct Scripts {
    units: HashMap<PathBuf, Result<Cursor, String>>,
    parsed: Vec<PathBuf>,
}

impl ScriptedAstProvider {
    /// Provider with no scripts.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Scripts> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Answer `path` with `unit`.
    pub fn set_unit(&self, path: impl Into<PathBuf>, unit: Cursor) {
        self.lock().units.insert(path.into(), Ok(unit));
    }

    /// Fail `path` with `reason`.
    pub fn set_failure(&self, path: impl Into<PathBuf>, reason: &str) {
        self.lock().units.insert(path.into(), Err(reason.to_owned()));
    }

    /// Number of `parse` calls so far.
    pub fn parse_count(&self) -> usize {
        self.lock().parsed.len()
    }

    /// Paths handed to `parse`, in call order.
    pub fn parsed_paths(&self) -> Vec<PathBuf> {
        self.lock().parsed.clone()
    }
}

impl AstProvider for ScriptedAstProvider {
    fn parse(&self, path: &Path, _include_dir: &Path) -> Result<Cursor, ParseFailure> {
        let mut scripts = self.lock();
        scripts.parsed.push(path.to_path_buf());
        match scripts.units.get(path) {
            Some(Ok(unit)) => Ok(unit.clone()),
            Some(Err(reason)) => Err(ParseFailure {
                path: path.to_path_buf(),
                reason: reason.clone(),
            }),
            None => Err(ParseFailure {
                path: path.to_path_buf(),
                reason: "no scripted translation unit".into(),
            }),
        }
    }
}
