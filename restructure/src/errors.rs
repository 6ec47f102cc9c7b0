//! Unified error type for restructuring operations.

use std::path::PathBuf;
use thiserror::Error;
use ts_syntax::SyntaxError;

/// Top-level error for restructure operations.
#[derive(Debug, Error)]
pub enum RestructureError {
    /// Storage I/O failure, with the path it happened on.
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Errors from the syntax model (lookup, parse, stale handles, conflicts).
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A source file that must exist in storage does not.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// The destination of a move is occupied and merging was not requested.
    #[error("destination already exists: {from} -> {to}")]
    PathConflict { from: PathBuf, to: PathBuf },

    /// A class has no `extends` clause to flatten.
    #[error("class `{class}` in {path} has no extends clause")]
    HeritageNotFound { class: String, path: PathBuf },

    /// The parent of a class could not be resolved to a declaration in another file.
    #[error("parent `{parent}` of class `{class}` could not be resolved from {path}")]
    ParentNotFound {
        class: String,
        parent: String,
        path: PathBuf,
    },

    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// YAML configuration could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_yml::Error),

    /// A blocking task (glob walk) panicked or was cancelled.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl RestructureError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RestructureError>;
