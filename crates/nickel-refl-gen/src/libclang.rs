// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! libclang-backed [`AstProvider`].
//!
//! libclang is loaded at runtime. Each header is parsed into a fresh index and
//! copied into an owned [`Cursor`] tree before the translation unit is dropped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clang::{Accessibility, Clang, Entity, EntityKind, Index};
use nickel_refl_core::cursor::{AstProvider, Cursor, CursorKind, ParseFailure, StorageClass};
use nickel_refl_core::tree::Access;
use tracing::{debug, trace};

/// Parses headers with libclang using fixed compiler arguments.
pub struct LibclangProvider {
    clang: Clang,
    args: Vec<String>,
}

impl LibclangProvider {
    /// Load libclang. Only one instance may exist per process.
    pub fn new(args: Vec<String>) -> Result<Self, String> {
        let clang = Clang::new()?;
        debug!(version = %clang::get_version(), "loaded libclang");
        Ok(Self { clang, args })
    }
}

impl AstProvider for LibclangProvider {
    fn parse(&self, path: &Path, include_dir: &Path) -> Result<Cursor, ParseFailure> {
        let index = Index::new(&self.clang, false, false);
        let mut args = self.args.clone();
        let include = format!("-I{}", include_dir.display());
        if !args.contains(&include) {
            args.push(include);
        }
        let unit = index
            .parser(path)
            .arguments(&args)
            .skip_function_bodies(true)
            .parse()
            .map_err(|err| ParseFailure {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        for diagnostic in unit.get_diagnostics() {
            trace!(path = %path.display(), %diagnostic, "clang diagnostic");
        }
        let files = FileResolver::new(path);
        Ok(convert(&unit.get_entity(), &files))
    }
}

/// Maps libclang file names back to the form the caller used for the main file.
struct FileResolver {
    main: PathBuf,
    canonical_main: Option<PathBuf>,
    seen: RefCell<HashMap<PathBuf, PathBuf>>,
}

impl FileResolver {
    fn new(main: &Path) -> Self {
        Self {
            main: main.to_path_buf(),
            canonical_main: fs::canonicalize(main).ok(),
            seen: RefCell::new(HashMap::new()),
        }
    }

    fn resolve(&self, reported: PathBuf) -> PathBuf {
        if reported == self.main {
            return reported;
        }
        if let Some(hit) = self.seen.borrow().get(&reported) {
            return hit.clone();
        }
        let resolved = match (&self.canonical_main, fs::canonicalize(&reported)) {
            (Some(main), Ok(canonical)) if *main == canonical => self.main.clone(),
            _ => reported.clone(),
        };
        self.seen.borrow_mut().insert(reported, resolved.clone());
        resolved
    }
}

fn convert(entity: &Entity<'_>, files: &FileResolver) -> Cursor {
    let kind = cursor_kind(entity);
    let spelling = match kind {
        CursorKind::Annotation => entity.get_display_name(),
        _ => entity.get_name(),
    }
    .unwrap_or_default();

    let mut cursor = Cursor::new(kind, spelling);
    cursor.type_spelling = entity
        .get_type()
        .map(|t| t.get_display_name())
        .unwrap_or_default();
    cursor.result_type_spelling = entity
        .get_result_type()
        .map(|t| t.get_display_name())
        .unwrap_or_default();
    cursor.storage = match entity.get_storage_class() {
        None | Some(clang::StorageClass::None) => StorageClass::None,
        Some(clang::StorageClass::Static) => StorageClass::Static,
        Some(clang::StorageClass::Extern) => StorageClass::Extern,
        Some(_) => StorageClass::Other,
    };
    cursor.access = entity.get_accessibility().map(|a| match a {
        Accessibility::Public => Access::Public,
        Accessibility::Protected => Access::Protected,
        Accessibility::Private => Access::Private,
    });
    cursor.is_definition = match kind {
        CursorKind::ClassDecl | CursorKind::StructDecl | CursorKind::EnumDecl => {
            entity.is_definition()
        }
        _ => true,
    };
    cursor.in_system_header = entity.is_in_system_header();
    cursor.file = match kind {
        CursorKind::TranslationUnit => Some(files.main.clone()),
        _ => entity
            .get_location()
            .and_then(|loc| loc.get_file_location().file)
            .map(|file| files.resolve(file.get_path())),
    };
    cursor.children = entity
        .get_children()
        .iter()
        .map(|child| convert(child, files))
        .collect();
    cursor
}

fn cursor_kind(entity: &Entity<'_>) -> CursorKind {
    classify(entity.get_kind(), entity.get_accessibility().is_some())
}

/// Map a libclang entity kind; `has_access` is true for class members.
fn classify(kind: EntityKind, has_access: bool) -> CursorKind {
    match kind {
        EntityKind::TranslationUnit => CursorKind::TranslationUnit,
        EntityKind::Namespace => CursorKind::Namespace,
        EntityKind::ClassDecl => CursorKind::ClassDecl,
        EntityKind::StructDecl => CursorKind::StructDecl,
        EntityKind::EnumDecl => CursorKind::EnumDecl,
        EntityKind::EnumConstantDecl => CursorKind::EnumConstant,
        EntityKind::FieldDecl => CursorKind::FieldDecl,
        // Static data members surface as variables with an access specifier.
        EntityKind::VarDecl if has_access => CursorKind::FieldDecl,
        EntityKind::Method => CursorKind::Method,
        EntityKind::Constructor => CursorKind::Constructor,
        EntityKind::ParmDecl => CursorKind::Parameter,
        EntityKind::AnnotateAttr => CursorKind::Annotation,
        _ => CursorKind::Other,
    }
}
