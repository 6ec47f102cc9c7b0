//! A mutable TypeScript source file: text plus an incrementally maintained tree.
//!
//! Every edit is a byte-range replacement on the text followed by
//! `Tree::edit` + re-parse, so node positions are always those of the current
//! text. Handles returned from queries ([`Declaration`], [`ClassMember`]) are
//! positional snapshots tagged with the file `version`; mutating methods
//! reject handles taken at an older version.

use crate::{
    comments::{CommentRange, leading_comments, trailing_comments},
    errors::{Result, SyntaxError},
    imports::{ImportDeclaration, ModuleReference, NamedImport, collect_imports, collect_module_references},
    model::{
        kind::{DeclarationKind, MemberKind},
        language::LanguageKind,
        span::Span,
    },
    parse::{has_token, input_edit, parse, text},
    specifier::normalize_path,
    structures::{DeclarationStructure, MemberStructure, extract_declaration, extract_member, reindent},
};
use serde::Serialize;
use std::{
    ops::Range,
    path::{Path, PathBuf},
};
use tracing::debug;
use tree_sitter::{Node, Tree};

const DEFAULT_INDENT: &str = "    ";

/// A named top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    pub path: PathBuf,
    /// File version the handle was taken at.
    pub version: u64,
    /// The declaration node itself (`function_declaration`, `class_declaration`, ...).
    pub node: Span,
    /// The whole top-level statement, including an `export` / `declare` wrapper.
    pub statement: Span,
    pub is_exported: bool,
    pub is_default_export: bool,
    pub leading_comments: Vec<CommentRange>,
    pub trailing_comments: Vec<CommentRange>,
    /// Overload signatures directly above a function implementation, with
    /// the comments leading the first one.
    pub overloads: Option<Span>,
}

impl Declaration {
    /// Statement plus its leading and trailing comments (and overload signatures).
    pub fn full_span(&self) -> Span {
        let mut span = self.statement;
        if let Some(overloads) = &self.overloads {
            span = Span::merge(&span, overloads);
        }
        if let Some(first) = self.leading_comments.first() {
            span = Span::merge(&span, &first.span);
        }
        if let Some(last) = self.trailing_comments.last() {
            span = Span::merge(&span, &last.span);
        }
        span
    }
}

/// A member of a class body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassMember {
    pub kind: MemberKind,
    pub name: String,
    pub class_name: String,
    pub path: PathBuf,
    pub version: u64,
    /// The member node.
    pub node: Span,
    /// Preceding decorators through the terminating `;`, when present.
    pub span: Span,
    pub leading_comments: Vec<CommentRange>,
    pub trailing_comments: Vec<CommentRange>,
    /// Indentation of the member's first line.
    pub indent: String,
}

impl ClassMember {
    pub fn full_span(&self) -> Span {
        let mut span = self.span;
        if let Some(first) = self.leading_comments.first() {
            span = Span::merge(&span, &first.span);
        }
        if let Some(last) = self.trailing_comments.last() {
            span = Span::merge(&span, &last.span);
        }
        span
    }
}

/// A class's `extends` relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heritage {
    /// The whole `class_heritage` node.
    pub span: Span,
    pub extends_span: Span,
    /// Every value listed after `extends`, in order.
    pub extends: Vec<String>,
    /// Start of the `implements` clause, when the class has one.
    pub implements_start: Option<usize>,
    /// End of the sibling before the heritage (class name or type parameters).
    pub previous_end: usize,
}

/// A top-level statement, comments excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopLevelStatement {
    pub span: Span,
    pub kind: String,
    pub is_import: bool,
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    language: LanguageKind,
    text: String,
    tree: Tree,
    version: u64,
    dirty: bool,
}

impl SourceFile {
    /// Parse `text` as the file at project-relative `path`.
    pub fn parse(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<Self> {
        let path = normalize_path(&path.into());
        let language = LanguageKind::from_path(&path)
            .ok_or_else(|| SyntaxError::UnsupportedFile(path.clone()))?;
        let text = text.into();
        let tree = parse(&path, language, &text, None)?;
        if tree.root_node().has_error() {
            debug!("{} parsed with syntax errors", path.display());
        }
        Ok(Self {
            path,
            language,
            text,
            tree,
            version: 0,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn language(&self) -> LanguageKind {
        self.language
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// True when the in-memory text differs from what storage last saw.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Change the file's identity; re-parses when the dialect changes.
    pub(crate) fn relocate(&mut self, to: PathBuf) -> Result<()> {
        let to = normalize_path(&to);
        let language =
            LanguageKind::from_path(&to).ok_or_else(|| SyntaxError::UnsupportedFile(to.clone()))?;
        if language != self.language {
            self.tree = parse(&to, language, &self.text, None)?;
            self.language = language;
        }
        self.path = to;
        self.version += 1;
        self.dirty = true;
        Ok(())
    }

    /// Replace the whole text with what storage currently holds.
    pub fn reload(&mut self, text: String) -> Result<()> {
        self.tree = parse(&self.path, self.language, &text, None)?;
        self.text = text;
        self.version += 1;
        self.dirty = false;
        Ok(())
    }

    /// Replace `range` with `replacement` and re-parse incrementally.
    pub fn replace_range(&mut self, range: Range<usize>, replacement: &str) -> Result<()> {
        if range.start > range.end || range.end > self.text.len() {
            return Err(SyntaxError::InvalidState("edit range outside of file text"));
        }
        let edit = input_edit(&self.text, range.start, range.end, replacement);
        self.text.replace_range(range, replacement);
        self.tree.edit(&edit);
        self.tree = parse(&self.path, self.language, &self.text, Some(&self.tree))?;
        self.version += 1;
        self.dirty = true;
        Ok(())
    }

    /// Apply non-overlapping edits computed against the current text.
    pub fn apply_edits(&mut self, mut edits: Vec<(Range<usize>, String)>) -> Result<()> {
        edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
        for pair in edits.windows(2) {
            if pair[1].0.end > pair[0].0.start {
                return Err(SyntaxError::InvalidState("overlapping edits"));
            }
        }
        for (range, replacement) in edits {
            self.replace_range(range, &replacement)?;
        }
        Ok(())
    }

    fn ensure_current(&self, version: u64) -> Result<()> {
        if version != self.version {
            return Err(SyntaxError::StaleDeclaration {
                path: self.path.clone(),
                expected: version,
                actual: self.version,
            });
        }
        Ok(())
    }

    /// Node exactly covering `span` whose kind satisfies `pred`.
    fn node_for(&self, span: Span, pred: impl Fn(&str) -> bool) -> Result<Node<'_>> {
        let root = self.tree.root_node();
        let mut cur = root.descendant_for_byte_range(span.start_byte, span.end_byte);
        while let Some(n) = cur {
            if n.start_byte() == span.start_byte && n.end_byte() == span.end_byte && pred(n.kind()) {
                return Ok(n);
            }
            cur = n.parent();
        }
        Err(SyntaxError::InvalidState("handle does not match a syntax node"))
    }

    /* ------------------------- declarations ------------------------- */

    /// Every named top-level declaration, in source order.
    pub fn declarations(&self) -> Vec<Declaration> {
        let root = self.tree.root_node();
        let mut w = root.walk();
        let mut out = Vec::new();
        // Consecutive `function_signature` statements: (name, span incl. leading comments).
        let mut signatures: Vec<(String, Span)> = Vec::new();
        for statement in root.named_children(&mut w) {
            if statement.kind() == "comment" {
                continue;
            }
            if let Some(sig) = overload_signature(statement) {
                let name = sig
                    .child_by_field_name("name")
                    .map(|n| text(&self.text, n).to_string())
                    .unwrap_or_default();
                if signatures.last().is_some_and(|(last, _)| *last != name) {
                    signatures.clear();
                }
                let mut span = Span::of(&statement);
                if let Some(first) = leading_comments(statement, &self.text).first() {
                    span = Span::merge(&span, &first.span);
                }
                signatures.push((name, span));
                continue;
            }
            let pending = std::mem::take(&mut signatures);
            let Some(decl) = unwrap_declaration(statement) else {
                continue;
            };
            let Some(kind) = DeclarationKind::from_node_kind(decl.kind()) else {
                continue;
            };
            let is_exported = statement.kind() == "export_statement";
            let is_default_export = is_exported && has_token(statement, "default");
            let leading = leading_comments(statement, &self.text);
            let trailing = trailing_comments(statement, &self.text);
            let names = declaration_names(decl, &self.text);
            let overloads = match (kind, pending.first(), pending.last()) {
                (DeclarationKind::Function, Some((name, first)), Some((_, last)))
                    if names.first() == Some(name) =>
                {
                    Some(Span::merge(first, last))
                }
                _ => None,
            };
            for name in names {
                out.push(Declaration {
                    kind,
                    name,
                    path: self.path.clone(),
                    version: self.version,
                    node: Span::of(&decl),
                    statement: Span::of(&statement),
                    is_exported,
                    is_default_export,
                    leading_comments: leading.clone(),
                    trailing_comments: trailing.clone(),
                    overloads,
                });
            }
        }
        out
    }

    /// The unique declaration of `kind` named `name`.
    pub fn find_declaration(&self, kind: DeclarationKind, name: &str) -> Result<Declaration> {
        let mut matches: Vec<Declaration> = self
            .declarations()
            .into_iter()
            .filter(|d| d.kind == kind && d.name == name)
            .collect();
        match matches.len() {
            0 => Err(SyntaxError::DeclarationNotFound {
                kind,
                name: name.to_string(),
                path: self.path.clone(),
            }),
            1 => Ok(matches.remove(0)),
            count => Err(SyntaxError::AmbiguousDeclaration {
                kind,
                name: name.to_string(),
                path: self.path.clone(),
                count,
            }),
        }
    }

    /// Exact original text of a declaration with its comments.
    pub fn full_text(&self, decl: &Declaration) -> Result<&str> {
        self.ensure_current(decl.version)?;
        Ok(decl.full_span().slice_text(&self.text))
    }

    /// Structural description of a Function, VariableStatement or TypeAlias.
    pub fn declaration_structure(&self, decl: &Declaration) -> Result<Option<DeclarationStructure>> {
        self.ensure_current(decl.version)?;
        let node = self.node_for(decl.node, |k| DeclarationKind::from_node_kind(k) == Some(decl.kind))?;
        let statement = self.node_for(decl.statement, |_| true)?;
        Ok(extract_declaration(statement, node, &self.text))
    }

    /// Delete the statement, its comments and the rest of its line.
    pub fn remove_declaration(&mut self, decl: &Declaration) -> Result<()> {
        self.ensure_current(decl.version)?;
        let range = removal_range(&self.text, decl.full_span());
        self.replace_range(range, "")
    }

    /// Append `snippet` after the last statement, separated by a blank line.
    pub fn append_block(&mut self, snippet: &str) -> Result<()> {
        let (range, replacement) = block_append_edit(&self.text, snippet);
        self.replace_range(range, &replacement)
    }

    /// Top-level statements in order, comments excluded.
    pub fn top_level_statements(&self) -> Vec<TopLevelStatement> {
        let root = self.tree.root_node();
        let mut w = root.walk();
        root.named_children(&mut w)
            .filter(|n| !matches!(n.kind(), "comment" | "hash_bang_line"))
            .map(|n| TopLevelStatement {
                span: Span::of(&n),
                kind: n.kind().to_string(),
                is_import: n.kind() == "import_statement",
            })
            .collect()
    }

    /// Exact text of every non-import statement, original order and comments kept.
    ///
    /// Runs of consecutive non-imports are copied with the text between them;
    /// the gap that follows an import is copied too, so comments above the
    /// first statement after the imports survive.
    pub fn non_import_text(&self) -> String {
        let statements = self.top_level_statements();
        let mut out = String::new();
        let mut prev_end = 0;
        for s in &statements {
            if !s.is_import {
                out.push_str(&self.text[prev_end..s.span.end_byte]);
            }
            prev_end = s.span.end_byte;
        }
        if statements.last().is_some_and(|s| !s.is_import) {
            out.push_str(&self.text[prev_end..]);
        }
        out.trim_start_matches(['\n', '\r']).trim_end().to_string()
    }

    /* ------------------------- imports ------------------------- */

    pub fn imports(&self) -> Vec<ImportDeclaration> {
        collect_imports(&self.tree, &self.text)
    }

    pub fn module_references(&self) -> Vec<ModuleReference> {
        collect_module_references(&self.tree, &self.text)
    }

    /// Insert a full import statement after the last import (or at the top).
    pub fn insert_import(&mut self, import_text: &str) -> Result<()> {
        match self.imports().last() {
            Some(last) => {
                let at = last.span.end_byte;
                self.replace_range(at..at, &format!("\n{import_text}"))
            }
            None => {
                let sep = if self.text.trim().is_empty() { "\n" } else { "\n\n" };
                self.replace_range(0..0, &format!("{import_text}{sep}"))
            }
        }
    }

    /// Remove whole import statements (and the rest of their lines).
    pub fn remove_imports(&mut self, imports: &[ImportDeclaration]) -> Result<()> {
        let edits = imports
            .iter()
            .map(|i| (removal_range(&self.text, i.span), String::new()))
            .collect();
        self.apply_edits(edits)
    }

    /// Add named bindings to an existing import of this file.
    ///
    /// Returns `false` when the import cannot take named bindings
    /// (namespace imports, side-effect imports).
    pub fn add_named_imports(
        &mut self,
        import: &ImportDeclaration,
        names: &[NamedImport],
    ) -> Result<bool> {
        if names.is_empty() {
            return Ok(true);
        }
        let rendered = names.iter().map(NamedImport::render).collect::<Vec<_>>().join(", ");

        if let Some(clause) = import.named_span {
            let inner_start = clause.start_byte + 1;
            let inner_end = clause.end_byte.saturating_sub(1).max(inner_start);
            let inner = &self.text[inner_start..inner_end];
            let trimmed = inner.trim_end();
            if trimmed.trim().is_empty() {
                self.replace_range(inner_start..inner_end, &format!(" {rendered} "))?;
            } else if trimmed.ends_with(',') {
                let at = inner_start + trimmed.len();
                self.replace_range(at..at, &format!(" {rendered},"))?;
            } else {
                let at = inner_start + trimmed.len();
                self.replace_range(at..at, &format!(", {rendered}"))?;
            }
            return Ok(true);
        }
        match (import.default_span, &import.namespace_import) {
            (Some(default), None) => {
                let at = default.end_byte;
                self.replace_range(at..at, &format!(", {{ {rendered} }}"))?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /* ------------------------- classes ------------------------- */

    fn class_node(&self, class: &Declaration) -> Result<Node<'_>> {
        if class.kind != DeclarationKind::Class {
            return Err(SyntaxError::InvalidState("declaration is not a class"));
        }
        self.ensure_current(class.version)?;
        self.node_for(class.node, |k| {
            DeclarationKind::from_node_kind(k) == Some(DeclarationKind::Class)
        })
    }

    fn class_body(&self, class: &Declaration) -> Result<Node<'_>> {
        self.class_node(class)?
            .child_by_field_name("body")
            .ok_or(SyntaxError::InvalidState("class without body"))
    }

    /// Members of a class in source order.
    pub fn class_members(&self, class: &Declaration) -> Result<Vec<ClassMember>> {
        let body = self.class_body(class)?;
        let mut w = body.walk();
        let mut out = Vec::new();
        for node in body.named_children(&mut w) {
            let kind = match node.kind() {
                "public_field_definition" => MemberKind::Property,
                "method_definition" if has_token(node, "get") => MemberKind::GetAccessor,
                "method_definition" if has_token(node, "set") => MemberKind::SetAccessor,
                "method_definition" => MemberKind::Method,
                "method_signature" | "abstract_method_signature" => MemberKind::MethodSignature,
                _ => continue,
            };
            let Some(name_node) = node.child_by_field_name("name") else {
                continue;
            };
            let name = text(&self.text, name_node).to_string();
            let kind = if kind == MemberKind::Method && name == "constructor" {
                MemberKind::Constructor
            } else {
                kind
            };

            let mut first = node;
            while let Some(prev) = first.prev_sibling() {
                if prev.kind() != "decorator" {
                    break;
                }
                first = prev;
            }
            let mut span = Span::merge(&Span::of(&first), &Span::of(&node));
            if let Some(semi) = node.next_sibling().filter(|n| n.kind() == ";" && !n.is_named()) {
                span = Span::merge(&span, &Span::of(&semi));
            }

            out.push(ClassMember {
                kind,
                name,
                class_name: class.name.clone(),
                path: self.path.clone(),
                version: self.version,
                node: Span::of(&node),
                span,
                leading_comments: leading_comments(first, &self.text),
                trailing_comments: trailing_comments(node, &self.text),
                indent: line_indent(&self.text, first.start_byte()),
            });
        }
        Ok(out)
    }

    /// All members named `name` (overloads and accessor pairs share a name).
    pub fn members_named(&self, class: &Declaration, name: &str) -> Result<Vec<ClassMember>> {
        let members: Vec<ClassMember> = self
            .class_members(class)?
            .into_iter()
            .filter(|m| m.name == name)
            .collect();
        if members.is_empty() {
            return Err(SyntaxError::MemberNotFound {
                class: class.name.clone(),
                member: name.to_string(),
                path: self.path.clone(),
            });
        }
        Ok(members)
    }

    /// Structure of a property, accessor or method; `None` for signatures and constructors.
    pub fn member_structure(&self, member: &ClassMember) -> Result<Option<MemberStructure>> {
        self.ensure_current(member.version)?;
        if matches!(member.kind, MemberKind::MethodSignature | MemberKind::Constructor) {
            return Ok(None);
        }
        let node = self.node_for(member.node, |k| {
            matches!(k, "public_field_definition" | "method_definition")
        })?;
        let mut decorators = Vec::new();
        let mut cur = node.prev_sibling();
        while let Some(prev) = cur.filter(|n| n.kind() == "decorator") {
            decorators.push(text(&self.text, prev).to_string());
            cur = prev.prev_sibling();
        }
        decorators.reverse();
        Ok(extract_member(node, decorators, &member.indent, &self.text))
    }

    /// Raw member text (decorators and leading comments included), shifted to `indent`.
    pub fn member_text(&self, member: &ClassMember, indent: &str) -> Result<String> {
        self.ensure_current(member.version)?;
        let mut span = member.span;
        if let Some(first) = member.leading_comments.first() {
            span = Span::merge(&span, &first.span);
        }
        let raw = span.slice_text(&self.text);
        Ok(format!("{indent}{}", reindent(raw, &member.indent, indent)))
    }

    /// Indentation for new members of `class`.
    pub fn member_indent(&self, class: &Declaration) -> Result<String> {
        if let Some(first) = self.class_members(class)?.first() {
            return Ok(first.indent.clone());
        }
        let base = line_indent(&self.text, class.statement.start_byte);
        Ok(format!("{base}{}", self.indent_unit()))
    }

    /// Append already rendered members before the closing brace of the class body.
    pub fn insert_class_members(&mut self, class: &Declaration, rendered: &[String]) -> Result<()> {
        if rendered.is_empty() {
            return Ok(());
        }
        let body = self.class_body(class)?;
        let open = body.start_byte() + 1;
        let close = body.end_byte().saturating_sub(1).max(open);
        let inner = &self.text[open..close];
        let at = open + inner.trim_end().len();
        let tail = &self.text[at..close];

        let mut insertion = String::new();
        for member in rendered {
            insertion.push('\n');
            insertion.push_str(member);
        }
        let class_indent = line_indent(&self.text, class.statement.start_byte);
        if tail.contains('\n') {
            self.replace_range(at..at, &insertion)
        } else {
            insertion.push('\n');
            insertion.push_str(&class_indent);
            self.replace_range(at..close, &insertion)
        }
    }

    /// Remove members from their class, with comments and the rest of their lines.
    pub fn remove_class_members(&mut self, members: &[ClassMember]) -> Result<()> {
        let mut edits = Vec::with_capacity(members.len());
        for m in members {
            self.ensure_current(m.version)?;
            edits.push((removal_range(&self.text, m.full_span()), String::new()));
        }
        self.apply_edits(edits)
    }

    /// The class's `extends` relation, if any.
    pub fn heritage(&self, class: &Declaration) -> Result<Option<Heritage>> {
        let node = self.class_node(class)?;
        let mut w = node.walk();
        let Some(heritage) = node.children(&mut w).find(|n| n.kind() == "class_heritage") else {
            return Ok(None);
        };
        let mut hw = heritage.walk();
        let clauses: Vec<Node> = heritage.named_children(&mut hw).collect();
        let Some(extends) = clauses.iter().find(|n| n.kind() == "extends_clause") else {
            return Ok(None);
        };
        let mut vw = extends.walk();
        let values = extends
            .children_by_field_name("value", &mut vw)
            .map(|v| text(&self.text, v).to_string())
            .collect();
        Ok(Some(Heritage {
            span: Span::of(&heritage),
            extends_span: Span::of(extends),
            extends: values,
            implements_start: clauses
                .iter()
                .find(|n| n.kind() == "implements_clause")
                .map(|n| n.start_byte()),
            previous_end: heritage
                .prev_sibling()
                .map(|p| p.end_byte())
                .unwrap_or(heritage.start_byte()),
        }))
    }

    /// Drop `extends ...` from the class header, keeping any `implements` clause.
    pub fn remove_extends_clause(&mut self, class: &Declaration) -> Result<bool> {
        let Some(h) = self.heritage(class)? else {
            return Ok(false);
        };
        let range = match h.implements_start {
            Some(implements) => h.extends_span.start_byte..implements,
            None => h.previous_end..h.span.end_byte,
        };
        self.replace_range(range, "")?;
        Ok(true)
    }

    /// Whitespace that starts the line containing `byte`.
    pub fn line_indent_at(&self, byte: usize) -> String {
        line_indent(&self.text, byte.min(self.text.len()))
    }

    /// Indentation unit used by the file, guessed from its first indented line.
    pub fn indent_unit(&self) -> String {
        for line in self.text.lines() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('*') {
                continue;
            }
            let ws = &line[..line.len() - trimmed.len()];
            if ws.starts_with('\t') {
                return "\t".to_string();
            }
            if !ws.is_empty() {
                return ws.to_string();
            }
        }
        DEFAULT_INDENT.to_string()
    }
}

/// Peel `export` / `declare` wrappers off a top-level statement.
fn unwrap_declaration(statement: Node) -> Option<Node> {
    match statement.kind() {
        "export_statement" => statement
            .child_by_field_name("declaration")
            .and_then(unwrap_declaration),
        "ambient_declaration" => {
            let mut w = statement.walk();
            let found = statement
                .named_children(&mut w)
                .find(|n| DeclarationKind::from_node_kind(n.kind()).is_some());
            found
        }
        k if DeclarationKind::from_node_kind(k).is_some() => Some(statement),
        _ => None,
    }
}

/// The `function_signature` of an overload statement, exported or not.
fn overload_signature(statement: Node) -> Option<Node> {
    let node = match statement.kind() {
        "export_statement" => statement.child_by_field_name("declaration")?,
        _ => statement,
    };
    (node.kind() == "function_signature").then_some(node)
}

/// Names a declaration binds; variable statements may bind several.
fn declaration_names(decl: Node, code: &str) -> Vec<String> {
    if DeclarationKind::from_node_kind(decl.kind()) == Some(DeclarationKind::VariableStatement) {
        let mut w = decl.walk();
        let names = decl
            .named_children(&mut w)
            .filter(|n| n.kind() == "variable_declarator")
            .filter_map(|d| d.child_by_field_name("name"))
            .filter(|n| n.kind() == "identifier")
            .map(|n| text(code, n).to_string())
            .collect();
        return names;
    }
    decl.child_by_field_name("name")
        .map(|n| vec![text(code, n).to_string()])
        .unwrap_or_default()
}

/// Whitespace between the start of `byte`'s line and `byte`.
fn line_indent(text: &str, byte: usize) -> String {
    let line_start = text[..byte].rfind('\n').map(|i| i + 1).unwrap_or(0);
    text[line_start..byte]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

/// Range to delete for a construct spanning `span`: whole lines when the
/// construct owns them, plus one following blank line when it was preceded by one.
fn removal_range(text: &str, span: Span) -> Range<usize> {
    let mut start = span.start_byte;
    let mut end = span.end_byte;

    let line_start = text[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let owns_line_start = text[line_start..start].trim().is_empty();
    if owns_line_start {
        start = line_start;
    }
    let line_end = text[end..].find('\n').map(|i| end + i + 1).unwrap_or(text.len());
    if text[end..line_end].trim().is_empty() {
        end = line_end;
    }

    if owns_line_start && end == text.len() {
        while start >= 2 && text[..start].ends_with("\n\n") {
            start -= 1;
        }
    } else if owns_line_start && (start == 0 || text[..start].ends_with("\n\n")) {
        let rest = &text[end..];
        if let Some(nl) = rest.find('\n') {
            if rest[..nl].trim().is_empty() {
                end += nl + 1;
            }
        }
    }
    start..end
}

/// Edit that appends `snippet` after the existing content with one blank line
/// between them and a single trailing newline.
pub fn block_append_edit(existing: &str, snippet: &str) -> (Range<usize>, String) {
    let keep = existing.trim_end().len();
    let body = snippet.trim_start_matches(['\n', '\r']).trim_end();
    let sep = if keep == 0 { "" } else { "\n\n" };
    (keep..existing.len(), format!("{sep}{body}\n"))
}

/// `existing` with `snippet` appended the way [`SourceFile::append_block`] does.
pub fn append_block(existing: &str, snippet: &str) -> String {
    let (range, replacement) = block_append_edit(existing, snippet);
    let mut out = existing.to_string();
    out.replace_range(range, &replacement);
    out
}
