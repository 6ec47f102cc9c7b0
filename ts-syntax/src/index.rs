//! Per-file index of declared names, exports and imports.
//!
//! Built lazily by [`crate::project::Project`] and kept until the file's
//! version moves on, so repeated resolutions only re-scan touched files.

use crate::{
    imports::{ImportDeclaration, ReExport, collect_local_exports, collect_reexports},
    model::kind::DeclarationKind,
    parse::{has_token, text},
    source_file::SourceFile,
};
use std::collections::HashMap;

/// Which binding of an import introduces a local name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    Named(String),
    Default,
    Namespace,
}

#[derive(Debug, Clone)]
pub struct FileIndex {
    pub version: u64,
    pub declarations: Vec<(DeclarationKind, String)>,
    /// Exported name (`default` for default exports) to local name.
    pub exports: HashMap<String, String>,
    pub imports: Vec<ImportDeclaration>,
    pub reexports: Vec<ReExport>,
}

impl FileIndex {
    pub fn build(file: &SourceFile) -> Self {
        let code = file.text();
        let tree = file.tree();

        let mut declarations = Vec::new();
        let mut exports = HashMap::new();
        for d in file.declarations() {
            if d.is_default_export {
                exports.insert("default".to_string(), d.name.clone());
            } else if d.is_exported {
                exports.insert(d.name.clone(), d.name.clone());
            }
            declarations.push((d.kind, d.name));
        }
        for (exported, local) in collect_local_exports(tree, code) {
            exports.insert(exported, local);
        }

        // `export default Name;`
        let root = tree.root_node();
        let mut w = root.walk();
        for node in root.named_children(&mut w) {
            if node.kind() != "export_statement" || !has_token(node, "default") {
                continue;
            }
            if let Some(value) = node.child_by_field_name("value").filter(|v| v.kind() == "identifier") {
                exports.insert("default".to_string(), text(code, value).to_string());
            }
        }

        Self {
            version: file.version(),
            declarations,
            exports,
            imports: file.imports(),
            reexports: collect_reexports(tree, code),
        }
    }

    /// True when the file itself declares `name` at top level.
    pub fn declares(&self, name: &str) -> bool {
        self.declarations.iter().any(|(_, n)| n == name)
    }

    /// The import binding `local` in this file, if any.
    pub fn imported_binding(&self, local: &str) -> Option<(&ImportDeclaration, ImportedName)> {
        self.imports.iter().find_map(|import| {
            if import.default_import.as_deref() == Some(local) {
                return Some((import, ImportedName::Default));
            }
            if import.namespace_import.as_deref() == Some(local) {
                return Some((import, ImportedName::Namespace));
            }
            import
                .named
                .iter()
                .find(|n| n.local_name() == local)
                .map(|n| (import, ImportedName::Named(n.name.clone())))
        })
    }
}
