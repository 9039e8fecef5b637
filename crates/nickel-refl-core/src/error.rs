// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Run-level error taxonomy.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cache::CacheError;
use crate::render::RenderError;
use crate::tree::MergeError;
use crate::visitor::VisitError;

/// Fatal generator error. Recoverable per-file failures never surface here.
#[derive(Debug, Error)]
pub enum GenError {
    /// A required path was not configured.
    #[error("missing configuration: {0}")]
    MissingConfiguration(&'static str),
    /// Two declarations could not be reconciled.
    #[error("unsupported merge conflict: {0}")]
    UnsupportedMergeConflict(String),
    /// The cache store failed outside of decoding.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    /// A template failed to render.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// Filesystem failure on an output or cache path.
    #[error("{}: {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl GenError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

impl From<MergeError> for GenError {
    fn from(err: MergeError) -> Self {
        Self::UnsupportedMergeConflict(err.to_string())
    }
}

impl From<VisitError> for GenError {
    fn from(err: VisitError) -> Self {
        match err {
            VisitError::Read { path, source } => Self::Io { path, source },
            VisitError::Parse(failure) => Self::Io {
                path: failure.path.clone(),
                source: io::Error::other(failure),
            },
            merge @ VisitError::Merge { .. } => Self::UnsupportedMergeConflict(merge.to_string()),
        }
    }
}
