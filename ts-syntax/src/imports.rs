//! Import declarations and module references.
//!
//! A *module reference* is any string literal naming a module that a move must
//! keep valid: `import ... from "x"`, `import "x"`, `export ... from "x"`,
//! `import x = require("x")`, and `import("x")` / `require("x")` calls with a
//! literal argument, at any depth (ambient modules and namespaces included).
//! An [`ImportDeclaration`] is the richer view of an `import_statement` used by
//! the conflict merger.

use crate::{
    model::span::Span,
    parse::{has_token, text},
};
use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Tree};

/// A module specifier string literal inside a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleReference {
    /// Span of the string literal including its quotes.
    pub span: Span,
    pub specifier: String,
    pub quote: char,
}

impl ModuleReference {
    fn from_string_node(node: Node, code: &str) -> Option<Self> {
        let raw = text(code, node);
        let quote = raw.chars().next()?;
        if raw.len() < 2 || !matches!(quote, '"' | '\'' | '`') {
            return None;
        }
        Some(Self {
            span: Span::of(&node),
            specifier: raw[1..raw.len() - 1].to_string(),
            quote,
        })
    }

    /// Literal text for `specifier` in this reference's quote style.
    pub fn quoted(&self, specifier: &str) -> String {
        format!("{q}{specifier}{q}", q = self.quote)
    }

    pub fn is_relative(&self) -> bool {
        crate::specifier::is_relative(&self.specifier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedImport {
    pub name: String,
    pub alias: Option<String>,
    pub is_type: bool,
}

impl NamedImport {
    /// Name the binding introduces in the importing file.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn render(&self) -> String {
        let prefix = if self.is_type { "type " } else { "" };
        match &self.alias {
            Some(alias) => format!("{prefix}{} as {alias}", self.name),
            None => format!("{prefix}{}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDeclaration {
    /// Whole statement.
    pub span: Span,
    pub source: ModuleReference,
    pub type_only: bool,
    pub default_import: Option<String>,
    pub namespace_import: Option<String>,
    pub named: Vec<NamedImport>,
    /// Span of the `{ ... }` clause, when present.
    pub named_span: Option<Span>,
    /// Span of the default binding identifier, when present.
    pub default_span: Option<Span>,
    pub text: String,
}

impl ImportDeclaration {
    /// Local names bound by this import.
    pub fn local_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        if let Some(d) = &self.default_import {
            out.push(d.as_str());
        }
        if let Some(ns) = &self.namespace_import {
            out.push(ns.as_str());
        }
        out.extend(self.named.iter().map(|n| n.local_name()));
        out
    }

    /// Statement text with the module specifier replaced, everything else verbatim.
    pub fn text_with_specifier(&self, specifier: &str) -> String {
        let start = self.source.span.start_byte - self.span.start_byte;
        let end = self.source.span.end_byte - self.span.start_byte;
        let mut out = String::with_capacity(self.text.len() + specifier.len());
        out.push_str(&self.text[..start]);
        out.push_str(&self.source.quoted(specifier));
        out.push_str(&self.text[end..]);
        out
    }

    /// `import "x";` style imports bind nothing.
    pub fn is_side_effect_only(&self) -> bool {
        self.default_import.is_none() && self.namespace_import.is_none() && self.named.is_empty()
    }
}

/// All `import_statement`s at the top level of `tree`.
pub fn collect_imports(tree: &Tree, code: &str) -> Vec<ImportDeclaration> {
    let root = tree.root_node();
    let mut w = root.walk();
    root.named_children(&mut w)
        .filter(|n| n.kind() == "import_statement")
        .filter_map(|n| parse_import(n, code))
        .collect()
}

fn parse_import(node: Node, code: &str) -> Option<ImportDeclaration> {
    let source = ModuleReference::from_string_node(node.child_by_field_name("source")?, code)?;
    let mut decl = ImportDeclaration {
        span: Span::of(&node),
        source,
        type_only: has_token(node, "type"),
        default_import: None,
        namespace_import: None,
        named: Vec::new(),
        named_span: None,
        default_span: None,
        text: text(code, node).to_string(),
    };

    let mut w = node.walk();
    let clause = node
        .named_children(&mut w)
        .find(|ch| ch.kind() == "import_clause");
    if let Some(clause) = clause {
        let mut cw = clause.walk();
        for part in clause.named_children(&mut cw) {
            match part.kind() {
                "identifier" => {
                    decl.default_import = Some(text(code, part).to_string());
                    decl.default_span = Some(Span::of(&part));
                }
                "namespace_import" => {
                    let mut nw = part.walk();
                    decl.namespace_import = part
                        .named_children(&mut nw)
                        .find(|n| n.kind() == "identifier")
                        .map(|n| text(code, n).to_string());
                }
                "named_imports" => {
                    decl.named_span = Some(Span::of(&part));
                    let mut sw = part.walk();
                    for spec in part.named_children(&mut sw) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let Some(name) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        decl.named.push(NamedImport {
                            name: text(code, name).to_string(),
                            alias: spec
                                .child_by_field_name("alias")
                                .map(|a| text(code, a).to_string()),
                            is_type: has_token(spec, "type"),
                        });
                    }
                }
                _ => {}
            }
        }
    }
    Some(decl)
}

/// Re-export forms that forward names from another module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReExport {
    /// `export * from "x"`
    All { source: ModuleReference },
    /// `export { a, b as c } from "x"`: `(exported name, original name)` pairs.
    Named {
        source: ModuleReference,
        names: Vec<(String, String)>,
    },
}

impl ReExport {
    pub fn source(&self) -> &ModuleReference {
        match self {
            ReExport::All { source } | ReExport::Named { source, .. } => source,
        }
    }
}

/// Top-level re-exports of `tree`.
pub fn collect_reexports(tree: &Tree, code: &str) -> Vec<ReExport> {
    let root = tree.root_node();
    let mut w = root.walk();
    let mut out = Vec::new();
    for node in root.named_children(&mut w) {
        if node.kind() != "export_statement" {
            continue;
        }
        let Some(src) = node.child_by_field_name("source") else {
            continue;
        };
        let Some(source) = ModuleReference::from_string_node(src, code) else {
            continue;
        };
        let mut cw = node.walk();
        let clause = node
            .named_children(&mut cw)
            .find(|ch| ch.kind() == "export_clause");
        match clause {
            Some(clause) => {
                let mut sw = clause.walk();
                let names = clause
                    .named_children(&mut sw)
                    .filter(|s| s.kind() == "export_specifier")
                    .filter_map(|s| {
                        let name = text(code, s.child_by_field_name("name")?).to_string();
                        let exported = s
                            .child_by_field_name("alias")
                            .map(|a| text(code, a).to_string())
                            .unwrap_or_else(|| name.clone());
                        Some((exported, name))
                    })
                    .collect();
                out.push(ReExport::Named { source, names });
            }
            // `export * as ns from` exposes a namespace, not the names themselves.
            None if has_token(node, "*") && !has_namespace_export(node) => {
                out.push(ReExport::All { source })
            }
            None => {}
        }
    }
    out
}

fn has_namespace_export(node: Node) -> bool {
    let mut w = node.walk();
    let found = node
        .named_children(&mut w)
        .any(|ch| ch.kind() == "namespace_export");
    found
}

/// Names exported through a local `export { a, b as c };` clause:
/// `(exported name, local name)` pairs.
pub fn collect_local_exports(tree: &Tree, code: &str) -> Vec<(String, String)> {
    let root = tree.root_node();
    let mut w = root.walk();
    let mut out = Vec::new();
    for node in root.named_children(&mut w) {
        if node.kind() != "export_statement" || node.child_by_field_name("source").is_some() {
            continue;
        }
        let mut cw = node.walk();
        for clause in node.named_children(&mut cw) {
            if clause.kind() != "export_clause" {
                continue;
            }
            let mut sw = clause.walk();
            for s in clause.named_children(&mut sw) {
                let Some(name) = s.child_by_field_name("name") else {
                    continue;
                };
                let local = text(code, name).to_string();
                let exported = s
                    .child_by_field_name("alias")
                    .map(|a| text(code, a).to_string())
                    .unwrap_or_else(|| local.clone());
                out.push((exported, local));
            }
        }
    }
    out
}

/// Every module reference a file move has to keep valid, in source order.
pub fn collect_module_references(tree: &Tree, code: &str) -> Vec<ModuleReference> {
    let mut out = Vec::new();
    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        let literal = match node.kind() {
            "import_statement" | "export_statement" => node.child_by_field_name("source"),
            "import_require_clause" => node
                .child_by_field_name("source")
                .or_else(|| first_named_of(node, "string")),
            "call_expression" => loader_argument(node, code),
            _ => None,
        };
        if let Some(r) = literal.and_then(|s| ModuleReference::from_string_node(s, code)) {
            out.push(r);
        }
        let mut w = node.walk();
        stack.extend(node.named_children(&mut w));
    }
    out.sort_by_key(|r| r.span.start_byte);
    out
}

/// The literal argument of `import("x")` or `require("x")`.
fn loader_argument<'t>(call: Node<'t>, code: &str) -> Option<Node<'t>> {
    let callee = call.child_by_field_name("function")?;
    let is_loader = match callee.kind() {
        "import" => true,
        "identifier" => text(code, callee) == "require",
        _ => false,
    };
    if !is_loader {
        return None;
    }
    let args = call.child_by_field_name("arguments")?;
    let mut w = args.walk();
    let first = args.named_children(&mut w).next()?;
    match first.kind() {
        "string" => Some(first),
        "template_string" if first.named_child_count() == 0 => Some(first),
        _ => None,
    }
}

fn first_named_of<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut w = node.walk();
    node.named_children(&mut w).find(|n| n.kind() == kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::language::LanguageKind, parse::parse};
    use std::path::Path;

    fn tree(code: &str) -> Tree {
        parse(Path::new("a.ts"), LanguageKind::TypeScript, code, None).unwrap()
    }

    #[test]
    fn reads_bindings_and_specifier() {
        let code = "import Def, { a, b as c } from './lib';\nimport * as ns from \"pkg\";\nimport './side';\n";
        let t = tree(code);
        let imports = collect_imports(&t, code);
        assert_eq!(imports.len(), 3);

        let first = &imports[0];
        assert_eq!(first.source.specifier, "./lib");
        assert_eq!(first.source.quote, '\'');
        assert_eq!(first.default_import.as_deref(), Some("Def"));
        assert_eq!(first.local_names(), vec!["Def", "a", "c"]);
        assert_eq!(
            first.text_with_specifier("../lib"),
            "import Def, { a, b as c } from '../lib';"
        );

        assert_eq!(imports[1].namespace_import.as_deref(), Some("ns"));
        assert!(imports[2].is_side_effect_only());
    }

    #[test]
    fn finds_reexports_and_references() {
        let code = "export * from './all';\nexport { A as B } from './named';\nexport { local };\nconst local = 1;\n";
        let t = tree(code);
        let reexports = collect_reexports(&t, code);
        assert_eq!(reexports.len(), 2);
        assert!(matches!(&reexports[0], ReExport::All { source } if source.specifier == "./all"));
        match &reexports[1] {
            ReExport::Named { names, .. } => {
                assert_eq!(names, &vec![("B".to_string(), "A".to_string())])
            }
            other => panic!("unexpected {other:?}"),
        }

        let refs = collect_module_references(&t, code);
        let specs: Vec<_> = refs.iter().map(|r| r.specifier.as_str()).collect();
        assert_eq!(specs, vec!["./all", "./named"]);

        assert_eq!(
            collect_local_exports(&t, code),
            vec![("local".to_string(), "local".to_string())]
        );
    }

    #[test]
    fn references_include_loaders_and_nested_statements() {
        let code = "import fs = require('./fs-shim');\nconst lazy = () => import('./lazy');\nconst cjs = require(\"../cjs\");\nconst dyn = require(name);\ndeclare module 'ext' {\n  export { X } from './nested';\n}\nfoo('./not-a-module');\n";
        let t = tree(code);
        let specs: Vec<_> = collect_module_references(&t, code)
            .into_iter()
            .map(|r| r.specifier)
            .collect();
        assert_eq!(specs, vec!["./fs-shim", "./lazy", "../cjs", "./nested"]);
    }
}
