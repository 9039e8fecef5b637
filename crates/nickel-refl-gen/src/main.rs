// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! nickel-refl-gen
//!
//! Generates reflection and QuickJS binding registration code for the
//! annotated headers under a parse directory.
//!
//! Invariants:
//! - Configuration is fully resolved before any header is touched.
//! - The cache is committed only after every artifact was written.

mod discover;
mod fs_store;
#[cfg(feature = "libclang")]
mod libclang;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use nickel_refl_core::{AstProvider, Generator, GeneratorConfig, ResolvedConfig, TemplateRenderer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::discover::discover_headers;
use crate::fs_store::FsCacheStore;

#[derive(Parser, Debug)]
#[command(name = "nickel-refl-gen", author, version, about, long_about = None)]
struct Cli {
    /// Directory scanned for headers.
    parse_dir: Option<PathBuf>,

    /// Directory holding the incremental cache.
    cache_dir: Option<PathBuf>,

    /// Output directory for reflection registration code.
    refl_output_dir: Option<PathBuf>,

    /// Output directory for script binding code.
    binding_output_dir: Option<PathBuf>,

    /// JSON configuration file; positional arguments and flags override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Include root for generated `#include`s (default: parent of PARSE_DIR).
    #[arg(long)]
    include_dir: Option<PathBuf>,

    /// Directory of `<name>.jinja` files overriding the built-in templates.
    #[arg(long)]
    template_dir: Option<PathBuf>,

    /// Ignore the persisted cache and re-visit every header.
    #[arg(long)]
    force: bool,

    /// More logging (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> Level {
        match (self.quiet, self.verbose) {
            (true, _) => Level::WARN,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        }
    }

    fn overrides(&self) -> GeneratorConfig {
        GeneratorConfig {
            parse_dir: self.parse_dir.clone(),
            cache_dir: self.cache_dir.clone(),
            refl_output_dir: self.refl_output_dir.clone(),
            binding_output_dir: self.binding_output_dir.clone(),
            include_dir: self.include_dir.clone(),
            template_dir: self.template_dir.clone(),
            ..GeneratorConfig::default()
        }
    }

    fn resolve(&self) -> Result<ResolvedConfig> {
        let base = match &self.config {
            Some(path) => {
                let bytes = fs::read(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                GeneratorConfig::from_json(&bytes)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => GeneratorConfig::default(),
        };
        Ok(base.overlay(self.overrides()).resolve()?)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("installing the log subscriber")?;

    let config = cli.resolve()?;
    info!(
        parse_dir = %config.parse_dir.display(),
        include_dir = %config.include_dir.display(),
        "starting nickel-refl-gen"
    );

    let provider = provider(&config)?;
    generate(config, provider, cli.force)
}

fn generate<P: AstProvider>(config: ResolvedConfig, provider: P, force: bool) -> Result<()> {
    let renderer = match &config.template_dir {
        Some(dir) => TemplateRenderer::with_overrides(dir)
            .with_context(|| format!("loading templates from {}", dir.display()))?,
        None => TemplateRenderer::new().context("loading built-in templates")?,
    };
    let files = discover_headers(&config.parse_dir, &config.header_extensions)
        .with_context(|| format!("scanning {}", config.parse_dir.display()))?;
    info!(headers = files.len(), "discovered headers");

    let store = FsCacheStore::new(config.cache_dir.clone());
    let summary = Generator::new(config, provider, store, renderer)
        .force(force)
        .run(&files)
        .context("generation failed")?;
    if summary.failed > 0 {
        info!(failed = summary.failed, "some headers could not be parsed and were left out");
    }
    Ok(())
}

#[cfg(feature = "libclang")]
fn provider(config: &ResolvedConfig) -> Result<libclang::LibclangProvider> {
    libclang::LibclangProvider::new(config.parser_args())
        .map_err(|reason| anyhow::anyhow!("could not load libclang: {reason}"))
}

/// Stands in for the parser when libclang support is compiled out.
#[cfg(not(feature = "libclang"))]
enum Unavailable {}

#[cfg(not(feature = "libclang"))]
impl AstProvider for Unavailable {
    fn parse(
        &self,
        _path: &std::path::Path,
        _include_dir: &std::path::Path,
    ) -> Result<nickel_refl_core::Cursor, nickel_refl_core::ParseFailure> {
        match *self {}
    }
}

#[cfg(not(feature = "libclang"))]
fn provider(_config: &ResolvedConfig) -> Result<Unavailable> {
    anyhow::bail!("built without the `libclang` feature; headers cannot be parsed")
}
