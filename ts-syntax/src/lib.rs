//! Mutable Tree-sitter syntax model for TypeScript projects.
//!
//! - [`project::Project`]: tracked files, reference-aware moves, identifier resolution
//! - [`source_file::SourceFile`]: one file's text and incrementally re-parsed tree
//! - [`structures`]: structural snapshots that can be rendered into a new owner
//! - [`comments`], [`imports`], [`specifier`]: the pieces the above are built from

pub mod comments;
pub mod discover;
pub mod errors;
pub mod imports;
pub mod index;
pub mod model;
pub mod parse;
pub mod project;
pub mod source_file;
pub mod specifier;
pub mod structures;

pub use errors::{Result, SyntaxError};
pub use model::{
    kind::{DeclarationKind, MemberKind},
    language::LanguageKind,
    span::Span,
};
pub use project::{FileMove, PendingChanges, Project, ProjectOptions, Resolution};
pub use source_file::{ClassMember, Declaration, Heritage, SourceFile};
