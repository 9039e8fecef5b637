// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Path normalization and derived identifiers.
//!
//! `a/b/c.hpp`, `./a/b/c.hpp` and `../a/b/c.hpp` all normalize to
//! `a/b/c.hpp`, whose identifier is `a_b_c`. The identifier names the
//! per-file artifacts and their registration functions, so characters that
//! cannot appear in a C++ identifier are replaced by the joiner as well.

use std::path::Path;

/// Separator used when joining path segments into an identifier.
pub const IDENT_JOINER: char = '_';

/// Stable string key for a path: lossy UTF-8 with `/` separators.
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Drop `.`/`..`/empty segments and unify separators.
pub fn normalize_path(path: &str) -> String {
    segments(path).collect::<Vec<_>>().join("/")
}

/// Identifier derived from a header path.
pub fn derive_identifier(path: &str) -> String {
    let mut parts: Vec<&str> = segments(path).collect();
    if let Some(last) = parts.last_mut() {
        *last = strip_extension(last);
    }
    let mut joined = String::with_capacity(path.len());
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            joined.push(IDENT_JOINER);
        }
        joined.extend(part.chars().map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                IDENT_JOINER
            }
        }));
    }
    joined
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}
