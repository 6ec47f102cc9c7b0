use crate::model::kind::DeclarationKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyntaxError {
    #[error("tree-sitter language error: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("tree-sitter parse error in {0}")]
    Parse(PathBuf),

    #[error("not a TypeScript source file: {0}")]
    UnsupportedFile(PathBuf),

    #[error("glob error: {0}")]
    Glob(#[from] globset::Error),

    #[error("file is not loaded in the project: {0}")]
    FileNotFound(PathBuf),

    #[error("{kind} `{name}` not found in {path}")]
    DeclarationNotFound {
        kind: DeclarationKind,
        name: String,
        path: PathBuf,
    },

    #[error("{kind} `{name}` is declared {count} times in {path}")]
    AmbiguousDeclaration {
        kind: DeclarationKind,
        name: String,
        path: PathBuf,
        count: usize,
    },

    #[error("member `{member}` not found in class `{class}` ({path})")]
    MemberNotFound {
        class: String,
        member: String,
        path: PathBuf,
    },

    #[error("stale handle for {path}: taken at version {expected}, file is at {actual}")]
    StaleDeclaration {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("cannot move {from}: {to} is already loaded")]
    PathConflict { from: PathBuf, to: PathBuf },

    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

pub type Result<T> = std::result::Result<T, SyntaxError>;
