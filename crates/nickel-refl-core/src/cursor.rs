// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! AST provider port.
//!
//! The generator never parses C++ itself. An [`AstProvider`] turns one header
//! into an owned [`Cursor`] tree carrying just what the visitor reads.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::tree::Access;

/// Cursor kinds the visitor distinguishes. Everything else is [`CursorKind::Other`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CursorKind {
    /// Root of a parsed file.
    TranslationUnit,
    /// `namespace`
    Namespace,
    /// `class`
    ClassDecl,
    /// `struct`
    StructDecl,
    /// `enum` / `enum class`
    EnumDecl,
    /// Enumerator.
    EnumConstant,
    /// Non-static data member.
    FieldDecl,
    /// Member function.
    Method,
    /// Constructor.
    Constructor,
    /// Function parameter.
    Parameter,
    /// `__attribute__((annotate("...")))`
    Annotation,
    /// Any other cursor; traversed transparently.
    Other,
}

/// Storage class of a declaration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// No explicit storage class.
    #[default]
    None,
    /// `static`
    Static,
    /// `extern`
    Extern,
    /// Anything else.
    Other,
}

/// One node of the provider's cursor tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
    /// Kind tag.
    pub kind: CursorKind,
    /// Name (or annotation text for [`CursorKind::Annotation`]).
    pub spelling: String,
    /// Type spelling (field type, parameter type, method's full type).
    pub type_spelling: String,
    /// Result type spelling for methods.
    pub result_type_spelling: String,
    /// Storage class.
    pub storage: StorageClass,
    /// Access specifier for class members.
    pub access: Option<Access>,
    /// File the cursor was declared in, in the same form as the path handed
    /// to [`AstProvider::parse`] for the main file.
    pub file: Option<PathBuf>,
    /// Declared inside a system header.
    pub in_system_header: bool,
    /// Defining declaration (false for forward declarations).
    pub is_definition: bool,
    /// Child cursors in source order.
    pub children: Vec<Cursor>,
}

impl Cursor {
    /// Bare cursor with no location, type or children.
    pub fn new(kind: CursorKind, spelling: impl Into<String>) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
            type_spelling: String::new(),
            result_type_spelling: String::new(),
            storage: StorageClass::None,
            access: None,
            file: None,
            in_system_header: false,
            is_definition: true,
            children: Vec::new(),
        }
    }

    /// Text of the last annotation attached directly to this cursor.
    pub fn annotation(&self) -> Option<&str> {
        self.children
            .iter()
            .rev()
            .find(|c| c.kind == CursorKind::Annotation)
            .map(|c| c.spelling.as_str())
    }

    /// True when the cursor was declared in `path` and not in a system header.
    pub fn is_from(&self, path: &Path) -> bool {
        !self.in_system_header && self.file.as_deref() == Some(path)
    }
}

/// The provider could not produce a translation unit for a file.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("failed to parse {}: {reason}", path.display())]
pub struct ParseFailure {
    /// File that failed.
    pub path: PathBuf,
    /// Provider-specific reason.
    pub reason: String,
}

/// Capability that parses one header into a cursor tree.
pub trait AstProvider {
    /// Parse `path` with `include_dir` on the include search path.
    ///
    /// Returns the translation-unit cursor on success.
    fn parse(&self, path: &Path, include_dir: &Path) -> Result<Cursor, ParseFailure>;
}

impl<P: AstProvider + ?Sized> AstProvider for &P {
    fn parse(&self, path: &Path, include_dir: &Path) -> Result<Cursor, ParseFailure> {
        (**self).parse(path, include_dir)
    }
}
