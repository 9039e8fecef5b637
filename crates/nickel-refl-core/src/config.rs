// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Generator configuration.
//!
//! [`GeneratorConfig`] is the loose, layered form (JSON file, then CLI
//! overrides); [`ResolvedConfig`] is what a run actually uses.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::GenError;
use crate::visitor::DEFAULT_MARKER;

/// Header extensions discovered when none are configured.
pub const DEFAULT_HEADER_EXTENSIONS: [&str; 3] = ["h", "hpp", "hxx"];
/// Parser arguments used when none are configured.
pub const DEFAULT_CLANG_ARGS: [&str; 2] = ["-std=c++20", "-D_NICKEL_REFLECTION_"];
/// Member prefix stripped from exposed field names.
pub const DEFAULT_MEMBER_PREFIX: &str = "m_";

/// Layered configuration; every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Root directory scanned for headers.
    pub parse_dir: Option<PathBuf>,
    /// Directory holding the persisted cache.
    pub cache_dir: Option<PathBuf>,
    /// Output directory for reflection artifacts.
    pub refl_output_dir: Option<PathBuf>,
    /// Output directory for script binding artifacts.
    pub binding_output_dir: Option<PathBuf>,
    /// Include search root; defaults to the parent of `parse_dir`.
    pub include_dir: Option<PathBuf>,
    /// Textual marker a header must contain to be parsed.
    pub marker: Option<String>,
    /// Extensions of headers to discover, without the dot.
    pub header_extensions: Option<Vec<String>>,
    /// Extra parser arguments (the include flag is appended).
    pub clang_args: Option<Vec<String>>,
    /// Prefix stripped from field names.
    pub member_prefix: Option<String>,
    /// Directory with `<name>.jinja` template overrides.
    pub template_dir: Option<PathBuf>,
}

impl GeneratorConfig {
    /// Parse a JSON config document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Layer `top` over `self`: every field set in `top` wins.
    pub fn overlay(self, top: Self) -> Self {
        Self {
            parse_dir: top.parse_dir.or(self.parse_dir),
            cache_dir: top.cache_dir.or(self.cache_dir),
            refl_output_dir: top.refl_output_dir.or(self.refl_output_dir),
            binding_output_dir: top.binding_output_dir.or(self.binding_output_dir),
            include_dir: top.include_dir.or(self.include_dir),
            marker: top.marker.or(self.marker),
            header_extensions: top.header_extensions.or(self.header_extensions),
            clang_args: top.clang_args.or(self.clang_args),
            member_prefix: top.member_prefix.or(self.member_prefix),
            template_dir: top.template_dir.or(self.template_dir),
        }
    }

    /// Fill defaults and check that every required path is present.
    pub fn resolve(self) -> Result<ResolvedConfig, GenError> {
        let parse_dir = self
            .parse_dir
            .ok_or(GenError::MissingConfiguration("parse_dir"))?;
        let cache_dir = self
            .cache_dir
            .ok_or(GenError::MissingConfiguration("cache_dir"))?;
        let refl_output_dir = self
            .refl_output_dir
            .ok_or(GenError::MissingConfiguration("refl_output_dir"))?;
        let binding_output_dir = self
            .binding_output_dir
            .ok_or(GenError::MissingConfiguration("binding_output_dir"))?;
        let include_dir = self
            .include_dir
            .unwrap_or_else(|| default_include_dir(&parse_dir));

        Ok(ResolvedConfig {
            parse_dir,
            cache_dir,
            refl_output_dir,
            binding_output_dir,
            include_dir,
            marker: self.marker.unwrap_or_else(|| DEFAULT_MARKER.to_owned()),
            header_extensions: self
                .header_extensions
                .unwrap_or_else(|| owned(&DEFAULT_HEADER_EXTENSIONS)),
            clang_args: self
                .clang_args
                .unwrap_or_else(|| owned(&DEFAULT_CLANG_ARGS)),
            member_prefix: self
                .member_prefix
                .unwrap_or_else(|| DEFAULT_MEMBER_PREFIX.to_owned()),
            template_dir: self.template_dir,
        })
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn default_include_dir(parse_dir: &Path) -> PathBuf {
    match parse_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Fully resolved configuration for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Root directory scanned for headers.
    pub parse_dir: PathBuf,
    /// Directory holding the persisted cache.
    pub cache_dir: PathBuf,
    /// Output directory for reflection artifacts.
    pub refl_output_dir: PathBuf,
    /// Output directory for script binding artifacts.
    pub binding_output_dir: PathBuf,
    /// Include search root handed to the AST provider.
    pub include_dir: PathBuf,
    /// Textual marker pre-check.
    pub marker: String,
    /// Header extensions without the dot.
    pub header_extensions: Vec<String>,
    /// Parser arguments without the include flag.
    pub clang_args: Vec<String>,
    /// Prefix stripped from field names.
    pub member_prefix: String,
    /// Template override directory.
    pub template_dir: Option<PathBuf>,
}

impl ResolvedConfig {
    /// Full parser argument list: configured arguments plus `-I<include_dir>`.
    pub fn parser_args(&self) -> Vec<String> {
        let mut args = self.clang_args.clone();
        args.push(format!("-I{}", self.include_dir.display()));
        args
    }
}
