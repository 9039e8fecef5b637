// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Template rendering port and the default minijinja adapter.
//!
//! Documents are plain serde values ([`crate::emit`]); a [`Renderer`] turns a
//! document into source text. The built-in templates live in `templates/`
//! and are compiled into the crate.

use std::io;
use std::path::{Path, PathBuf};

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Every template the generator renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Template {
    /// One class's reflection registration.
    ClassRefl,
    /// One enum's reflection registration.
    EnumRefl,
    /// Per-file reflection artifact.
    FileRefl,
    /// `refl_generate.hpp`
    ReflHeader,
    /// `refl_generate.cpp`
    ReflImpl,
    /// One class's script binding.
    ClassBinding,
    /// One enum's script binding.
    EnumBinding,
    /// Per-file binding artifact.
    FileBinding,
    /// `script_binding.hpp`
    BindingHeader,
    /// `script_binding.cpp`
    BindingImpl,
}

impl Template {
    /// All templates, in a fixed order.
    pub const ALL: [Self; 10] = [
        Self::ClassRefl,
        Self::EnumRefl,
        Self::FileRefl,
        Self::ReflHeader,
        Self::ReflImpl,
        Self::ClassBinding,
        Self::EnumBinding,
        Self::FileBinding,
        Self::BindingHeader,
        Self::BindingImpl,
    ];

    /// Template name; overrides are looked up as `<name>.jinja`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ClassRefl => "class_refl",
            Self::EnumRefl => "enum_refl",
            Self::FileRefl => "refl",
            Self::ReflHeader => "refl_header",
            Self::ReflImpl => "refl_impl",
            Self::ClassBinding => "class_binding",
            Self::EnumBinding => "enum_binding",
            Self::FileBinding => "binding",
            Self::BindingHeader => "binding_header",
            Self::BindingImpl => "binding_impl",
        }
    }

    const fn builtin(self) -> &'static str {
        match self {
            Self::ClassRefl => include_str!("../templates/class_refl.jinja"),
            Self::EnumRefl => include_str!("../templates/enum_refl.jinja"),
            Self::FileRefl => include_str!("../templates/refl.jinja"),
            Self::ReflHeader => include_str!("../templates/refl_header.jinja"),
            Self::ReflImpl => include_str!("../templates/refl_impl.jinja"),
            Self::ClassBinding => include_str!("../templates/class_binding.jinja"),
            Self::EnumBinding => include_str!("../templates/enum_binding.jinja"),
            Self::FileBinding => include_str!("../templates/binding.jinja"),
            Self::BindingHeader => include_str!("../templates/binding_header.jinja"),
            Self::BindingImpl => include_str!("../templates/binding_impl.jinja"),
        }
    }
}

/// Rendering failure.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The engine rejected a template or a document.
    #[error("template `{template}`: {source}")]
    Template {
        /// Template name.
        template: &'static str,
        /// Engine error.
        #[source]
        source: minijinja::Error,
    },
    /// An override file exists but could not be read.
    #[error("failed to read template override {}: {source}", path.display())]
    Override {
        /// Override file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// Turns a data document into source text.
pub trait Renderer {
    /// Render `doc` with `template`.
    fn render<T: Serialize>(&self, template: Template, doc: &T) -> Result<String, RenderError>;

    /// Feed whatever determines this renderer's output into `hasher`.
    ///
    /// Changing what is hashed invalidates every cached tree.
    fn fingerprint(&self, hasher: &mut blake3::Hasher) {
        let _ = hasher;
    }
}

impl<R: Renderer + ?Sized> Renderer for &R {
    fn render<T: Serialize>(&self, template: Template, doc: &T) -> Result<String, RenderError> {
        (**self).render(template, doc)
    }

    fn fingerprint(&self, hasher: &mut blake3::Hasher) {
        (**self).fingerprint(hasher);
    }
}

/// minijinja-backed [`Renderer`].
#[derive(Debug)]
pub struct TemplateRenderer {
    env: Environment<'static>,
    sources: Vec<(Template, String)>,
}

impl TemplateRenderer {
    /// Renderer using only the built-in templates.
    pub fn new() -> Result<Self, RenderError> {
        Self::build(|template| Ok(template.builtin().to_owned()))
    }

    /// Renderer preferring `<dir>/<name>.jinja` over the built-in template.
    pub fn with_overrides(dir: &Path) -> Result<Self, RenderError> {
        Self::build(|template| {
            let path = dir.join(format!("{}.jinja", template.name()));
            match std::fs::read_to_string(&path) {
                Ok(source) => {
                    debug!(path = %path.display(), "template override");
                    Ok(source)
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    Ok(template.builtin().to_owned())
                }
                Err(source) => Err(RenderError::Override { path, source }),
            }
        })
    }

    fn build(
        mut source_for: impl FnMut(Template) -> Result<String, RenderError>,
    ) -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);

        let mut sources = Vec::with_capacity(Template::ALL.len());
        for template in Template::ALL {
            let source = source_for(template)?;
            env.add_template_owned(template.name(), source.clone())
                .map_err(|source| RenderError::Template {
                    template: template.name(),
                    source,
                })?;
            sources.push((template, source));
        }
        Ok(Self { env, sources })
    }

    /// Effective source of `template`.
    pub fn source(&self, template: Template) -> Option<&str> {
        self.sources
            .iter()
            .find(|(t, _)| *t == template)
            .map(|(_, s)| s.as_str())
    }
}

impl Renderer for TemplateRenderer {
    fn render<T: Serialize>(&self, template: Template, doc: &T) -> Result<String, RenderError> {
        let wrap = |source| RenderError::Template {
            template: template.name(),
            source,
        };
        self.env
            .get_template(template.name())
            .map_err(wrap)?
            .render(doc)
            .map_err(wrap)
    }

    fn fingerprint(&self, hasher: &mut blake3::Hasher) {
        for (template, source) in &self.sources {
            hasher.update(template.name().as_bytes());
            hasher.update(&[0]);
            hasher.update(source.as_bytes());
            hasher.update(&[0]);
        }
    }
}
