//! Language taxonomy and grammar selection.
//!
//! Only the two TypeScript dialects are tracked by the syntax model. Plain
//! JavaScript files are left to raw storage operations.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::Path;
use tree_sitter::Language;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageKind {
    TypeScript,
    Tsx,
}

impl Display for LanguageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LanguageKind::TypeScript => "typescript",
            LanguageKind::Tsx => "tsx",
        })
    }
}

impl LanguageKind {
    /// Best-effort detection by file extension.
    ///
    /// `.d.ts`, `.mts` and `.cts` are plain TypeScript; anything else returns `None`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::from_extension(ext)
    }

    /// Tree-sitter grammar for this dialect.
    pub fn grammar(&self) -> Language {
        match self {
            LanguageKind::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            LanguageKind::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}
