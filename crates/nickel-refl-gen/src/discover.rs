// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Header discovery.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Every file under `root` matching `**/*.<ext>` for one of `extensions`,
/// sorted and deduplicated.
///
/// Extensions may be given with or without the leading dot.
pub fn discover_headers(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }
    let Some(base) = root.to_str() else {
        bail!("{} is not valid UTF-8", root.display());
    };
    let base = glob::Pattern::escape(base);

    let mut found = Vec::new();
    for ext in extensions {
        let pattern = format!("{base}/**/*.{}", ext.trim_start_matches('.'));
        let paths = glob::glob(&pattern).with_context(|| format!("bad header pattern {pattern}"))?;
        for path in paths {
            let path = path.context("reading a directory during header discovery")?;
            if path.is_file() {
                found.push(path);
            }
        }
    }
    found.sort();
    found.dedup();
    Ok(found)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::fs;

    fn exts() -> Vec<String> {
        vec!["h".into(), ".hpp".into()]
    }

    #[test]
    fn finds_nested_headers_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b/deep")).unwrap();
        fs::create_dir_all(root.join("a")).unwrap();
        for rel in ["b/deep/z.hpp", "a/y.h", "x.hpp", "a/source.cpp", "README"] {
            fs::write(root.join(rel), "").unwrap();
        }

        let found = discover_headers(root, &exts()).unwrap();
        let rel: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            [
                PathBuf::from("a/y.h"),
                PathBuf::from("b/deep/z.hpp"),
                PathBuf::from("x.hpp"),
            ]
        );
    }

    #[test]
    fn repeated_extensions_and_header_named_dirs_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("odd.hpp")).unwrap();
        fs::write(root.join("odd.hpp/inner.hpp"), "").unwrap();

        let found = discover_headers(root, &["hpp".into(), ".hpp".into()]).unwrap();
        assert_eq!(found, [root.join("odd.hpp/inner.hpp")]);
    }

    #[test]
    fn glob_metacharacters_in_the_root_are_literal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("engine[1]");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.h"), "").unwrap();

        assert_eq!(discover_headers(&root, &exts()).unwrap(), [root.join("a.h")]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_headers(&dir.path().join("nope"), &exts()).is_err());
    }
}
