//! Structural snapshots of declarations and class members.
//!
//! A structure describes the *shape* of a construct (name, modifiers, type
//! parameters, parameters, return type, body/initializer text) and can be
//! rendered back into source in a new owner. Extraction never captures the
//! construct's own leading/trailing comments: callers that want them carried
//! along must fill `leading_trivia` / `trailing_trivia` explicitly.

use crate::parse::{has_token, text};
use serde::{Deserialize, Serialize};
use tree_sitter::Node;

/// Statement-level flags shared by top-level declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementFlags {
    pub is_exported: bool,
    pub is_default_export: bool,
    pub has_declare_keyword: bool,
}

impl StatementFlags {
    fn prefix(&self) -> String {
        let mut out = String::new();
        if self.is_exported {
            out.push_str("export ");
        }
        if self.is_default_export {
            out.push_str("default ");
        }
        if self.has_declare_keyword {
            out.push_str("declare ");
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionStructure {
    pub leading_trivia: Vec<String>,
    pub trailing_trivia: Option<String>,
    pub flags: StatementFlags,
    pub is_async: bool,
    pub is_generator: bool,
    pub name: String,
    pub type_parameters: Option<String>,
    pub parameters: String,
    pub return_type: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDeclarationStructure {
    pub name: String,
    pub has_exclamation_token: bool,
    pub type_annotation: Option<String>,
    pub initializer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableStatementStructure {
    pub leading_trivia: Vec<String>,
    pub trailing_trivia: Option<String>,
    pub flags: StatementFlags,
    /// `const`, `let`, `var`.
    pub declaration_kind: String,
    pub declarations: Vec<VariableDeclarationStructure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAliasStructure {
    pub leading_trivia: Vec<String>,
    pub trailing_trivia: Option<String>,
    pub flags: StatementFlags,
    pub name: String,
    pub type_parameters: Option<String>,
    pub type_text: String,
}

/// Top-level declarations that support structural copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclarationStructure {
    Function(FunctionStructure),
    VariableStatement(VariableStatementStructure),
    TypeAlias(TypeAliasStructure),
}

impl DeclarationStructure {
    pub fn set_leading_trivia(&mut self, trivia: Vec<String>) {
        match self {
            DeclarationStructure::Function(s) => s.leading_trivia = trivia,
            DeclarationStructure::VariableStatement(s) => s.leading_trivia = trivia,
            DeclarationStructure::TypeAlias(s) => s.leading_trivia = trivia,
        }
    }

    pub fn set_trailing_trivia(&mut self, trivia: Option<String>) {
        match self {
            DeclarationStructure::Function(s) => s.trailing_trivia = trivia,
            DeclarationStructure::VariableStatement(s) => s.trailing_trivia = trivia,
            DeclarationStructure::TypeAlias(s) => s.trailing_trivia = trivia,
        }
    }

    /// Source text of the reconstructed declaration (no trailing newline).
    pub fn render(&self) -> String {
        let (leading, trailing, head) = match self {
            DeclarationStructure::Function(s) => {
                let mut head = s.flags.prefix();
                if s.is_async {
                    head.push_str("async ");
                }
                head.push_str("function");
                if s.is_generator {
                    head.push('*');
                }
                head.push(' ');
                head.push_str(&s.name);
                head.push_str(s.type_parameters.as_deref().unwrap_or(""));
                head.push_str(&s.parameters);
                head.push_str(s.return_type.as_deref().unwrap_or(""));
                match &s.body {
                    Some(body) => {
                        head.push(' ');
                        head.push_str(body);
                    }
                    None => head.push(';'),
                }
                (&s.leading_trivia, &s.trailing_trivia, head)
            }
            DeclarationStructure::VariableStatement(s) => {
                let decls = s
                    .declarations
                    .iter()
                    .map(|d| {
                        let mut out = d.name.clone();
                        if d.has_exclamation_token {
                            out.push('!');
                        }
                        out.push_str(d.type_annotation.as_deref().unwrap_or(""));
                        if let Some(init) = &d.initializer {
                            out.push_str(" = ");
                            out.push_str(init);
                        }
                        out
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let head = format!("{}{} {decls};", s.flags.prefix(), s.declaration_kind);
                (&s.leading_trivia, &s.trailing_trivia, head)
            }
            DeclarationStructure::TypeAlias(s) => {
                let head = format!(
                    "{}type {}{} = {};",
                    s.flags.prefix(),
                    s.name,
                    s.type_parameters.as_deref().unwrap_or(""),
                    s.type_text
                );
                (&s.leading_trivia, &s.trailing_trivia, head)
            }
        };

        let mut out = String::new();
        for t in leading {
            out.push_str(t);
            out.push('\n');
        }
        out.push_str(&head);
        if let Some(t) = trailing {
            out.push_str(t);
        }
        out
    }
}

/// Extract the structure of `decl`, whose enclosing top-level statement is `statement`.
///
/// Returns `None` for kinds that are not structurally copied (enum, interface, class).
pub fn extract_declaration(
    statement: Node,
    decl: Node,
    code: &str,
) -> Option<DeclarationStructure> {
    let flags = StatementFlags {
        is_exported: statement.kind() == "export_statement",
        is_default_export: statement.kind() == "export_statement"
            && has_token(statement, "default"),
        has_declare_keyword: has_ambient_ancestor(decl, statement),
    };
    let field = |name: &str| decl.child_by_field_name(name).map(|n| text(code, n).to_string());

    match decl.kind() {
        "function_declaration" | "generator_function_declaration" | "function_signature" => {
            Some(DeclarationStructure::Function(FunctionStructure {
                leading_trivia: Vec::new(),
                trailing_trivia: None,
                flags,
                is_async: has_token(decl, "async"),
                is_generator: decl.kind() == "generator_function_declaration",
                name: field("name")?,
                type_parameters: field("type_parameters"),
                parameters: field("parameters").unwrap_or_else(|| "()".to_string()),
                return_type: field("return_type"),
                body: field("body"),
            }))
        }
        "lexical_declaration" | "variable_declaration" => {
            let declaration_kind = if decl.kind() == "variable_declaration" {
                "var".to_string()
            } else {
                field("kind").unwrap_or_else(|| "const".to_string())
            };
            let mut w = decl.walk();
            let declarations = decl
                .named_children(&mut w)
                .filter(|n| n.kind() == "variable_declarator")
                .filter_map(|d| {
                    let f = |name: &str| d.child_by_field_name(name).map(|n| text(code, n).to_string());
                    Some(VariableDeclarationStructure {
                        name: f("name")?,
                        has_exclamation_token: has_token(d, "!"),
                        type_annotation: f("type"),
                        initializer: f("value"),
                    })
                })
                .collect();
            Some(DeclarationStructure::VariableStatement(
                VariableStatementStructure {
                    leading_trivia: Vec::new(),
                    trailing_trivia: None,
                    flags,
                    declaration_kind,
                    declarations,
                },
            ))
        }
        "type_alias_declaration" => Some(DeclarationStructure::TypeAlias(TypeAliasStructure {
            leading_trivia: Vec::new(),
            trailing_trivia: None,
            flags,
            name: field("name")?,
            type_parameters: field("type_parameters"),
            type_text: field("value")?,
        })),
        _ => None,
    }
}

fn has_ambient_ancestor(decl: Node, statement: Node) -> bool {
    let mut cur = Some(decl);
    while let Some(n) = cur {
        if n.kind() == "ambient_declaration" {
            return true;
        }
        if n.id() == statement.id() {
            break;
        }
        cur = n.parent();
    }
    false
}

/* ------------------------- class members ------------------------- */

/// Parts common to every member structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberHead {
    pub leading_trivia: Vec<String>,
    pub decorators: Vec<String>,
    /// `private`, `static`, `readonly`, `async`, `override`, ... in source order.
    pub modifiers: Vec<String>,
    pub name: String,
    /// Indentation of the member in its original class, used to re-indent bodies.
    pub source_indent: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyStructure {
    pub head: MemberHead,
    pub has_question_token: bool,
    pub has_exclamation_token: bool,
    pub type_annotation: Option<String>,
    pub initializer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorStructure {
    pub head: MemberHead,
    pub parameters: String,
    pub return_type: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodStructure {
    pub head: MemberHead,
    pub is_generator: bool,
    pub has_question_token: bool,
    pub type_parameters: Option<String>,
    pub parameters: String,
    pub return_type: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStructure {
    Property(PropertyStructure),
    GetAccessor(AccessorStructure),
    SetAccessor(AccessorStructure),
    Method(MethodStructure),
}

impl MemberStructure {
    fn head(&self) -> &MemberHead {
        match self {
            MemberStructure::Property(s) => &s.head,
            MemberStructure::GetAccessor(s) | MemberStructure::SetAccessor(s) => &s.head,
            MemberStructure::Method(s) => &s.head,
        }
    }

    fn head_mut(&mut self) -> &mut MemberHead {
        match self {
            MemberStructure::Property(s) => &mut s.head,
            MemberStructure::GetAccessor(s) | MemberStructure::SetAccessor(s) => &mut s.head,
            MemberStructure::Method(s) => &mut s.head,
        }
    }

    pub fn name(&self) -> &str {
        &self.head().name
    }

    pub fn set_leading_trivia(&mut self, trivia: Vec<String>) {
        self.head_mut().leading_trivia = trivia;
    }

    /// Render the member at `indent`; continuation lines are shifted from the
    /// member's original indentation to `indent`.
    pub fn render(&self, indent: &str) -> String {
        let head = self.head();
        let from = head.source_indent.as_str();

        let mut line = String::new();
        for m in &head.modifiers {
            line.push_str(m);
            line.push(' ');
        }
        match self {
            MemberStructure::Property(s) => {
                line.push_str(&head.name);
                if s.has_question_token {
                    line.push('?');
                }
                if s.has_exclamation_token {
                    line.push('!');
                }
                line.push_str(s.type_annotation.as_deref().unwrap_or(""));
                if let Some(init) = &s.initializer {
                    line.push_str(" = ");
                    line.push_str(init);
                }
                line.push(';');
            }
            MemberStructure::GetAccessor(s) | MemberStructure::SetAccessor(s) => {
                let keyword = if matches!(self, MemberStructure::GetAccessor(_)) {
                    "get"
                } else {
                    "set"
                };
                line.push_str(&format!(
                    "{keyword} {}{}{} {}",
                    head.name,
                    s.parameters,
                    s.return_type.as_deref().unwrap_or(""),
                    s.body
                ));
            }
            MemberStructure::Method(s) => {
                if s.is_generator {
                    line.push('*');
                }
                line.push_str(&head.name);
                if s.has_question_token {
                    line.push('?');
                }
                line.push_str(&format!(
                    "{}{}{} {}",
                    s.type_parameters.as_deref().unwrap_or(""),
                    s.parameters,
                    s.return_type.as_deref().unwrap_or(""),
                    s.body
                ));
            }
        }

        let mut out = String::new();
        for t in &head.leading_trivia {
            out.push_str(indent);
            out.push_str(&reindent(t, from, indent));
            out.push('\n');
        }
        for d in &head.decorators {
            out.push_str(indent);
            out.push_str(d);
            out.push('\n');
        }
        out.push_str(indent);
        out.push_str(&reindent(&line, from, indent));
        out
    }
}

/// Extract a member structure from a `public_field_definition` or
/// `method_definition` node. `decorators` are the decorator siblings that
/// precede a method inside the class body.
pub fn extract_member(
    node: Node,
    mut decorators: Vec<String>,
    source_indent: &str,
    code: &str,
) -> Option<MemberStructure> {
    let name_node = node.child_by_field_name("name")?;
    let field = |name: &str| node.child_by_field_name(name).map(|n| text(code, n).to_string());

    let mut modifiers = Vec::new();
    let mut accessor: Option<&str> = None;
    let mut is_generator = false;
    let mut w = node.walk();
    for ch in node.children(&mut w) {
        if ch.start_byte() >= name_node.start_byte() {
            break;
        }
        match ch.kind() {
            "decorator" => decorators.push(text(code, ch).to_string()),
            "comment" => {}
            "get" | "set" if !ch.is_named() => accessor = Some(ch.kind()),
            "*" => is_generator = true,
            _ => modifiers.push(text(code, ch).to_string()),
        }
    }

    let head = MemberHead {
        leading_trivia: Vec::new(),
        decorators,
        modifiers,
        name: text(code, name_node).to_string(),
        source_indent: source_indent.to_string(),
    };

    match node.kind() {
        "public_field_definition" => Some(MemberStructure::Property(PropertyStructure {
            head,
            has_question_token: has_token(node, "?"),
            has_exclamation_token: has_token(node, "!"),
            type_annotation: field("type"),
            initializer: field("value"),
        })),
        "method_definition" => {
            let body = field("body")?;
            let parameters = field("parameters").unwrap_or_else(|| "()".to_string());
            match accessor {
                Some(kind) => {
                    let s = AccessorStructure {
                        head,
                        parameters,
                        return_type: field("return_type"),
                        body,
                    };
                    Some(if kind == "get" {
                        MemberStructure::GetAccessor(s)
                    } else {
                        MemberStructure::SetAccessor(s)
                    })
                }
                None => Some(MemberStructure::Method(MethodStructure {
                    head,
                    is_generator,
                    has_question_token: has_token(node, "?"),
                    type_parameters: field("type_parameters"),
                    parameters,
                    return_type: field("return_type"),
                    body,
                })),
            }
        }
        _ => None,
    }
}

/// Shift every continuation line of `text` from indentation `from` to `to`.
///
/// The first line is left alone (callers place it themselves); lines that do
/// not start with `from` are kept verbatim.
pub fn reindent(text: &str, from: &str, to: &str) -> String {
    if from == to {
        return text.to_string();
    }
    let mut lines = text.split('\n');
    let mut out = lines.next().unwrap_or("").to_string();
    for line in lines {
        out.push('\n');
        match line.strip_prefix(from) {
            Some(rest) if !rest.is_empty() => {
                out.push_str(to);
                out.push_str(rest);
            }
            Some(_) => {}
            None => out.push_str(line),
        }
    }
    out
}
