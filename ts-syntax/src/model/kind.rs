//! Declaration and class-member kinds recognised by the syntax model.
//!
//! Extend conservatively; the restructuring layer matches on these exhaustively.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Top-level declaration kinds that can be looked up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Function,
    VariableStatement,
    TypeAlias,
    Enum,
    Interface,
    Class,
}

impl DeclarationKind {
    pub const ALL: [DeclarationKind; 6] = [
        DeclarationKind::Function,
        DeclarationKind::VariableStatement,
        DeclarationKind::TypeAlias,
        DeclarationKind::Enum,
        DeclarationKind::Interface,
        DeclarationKind::Class,
    ];

    /// Map a Tree-sitter node kind onto a declaration kind.
    pub fn from_node_kind(kind: &str) -> Option<Self> {
        match kind {
            "function_declaration" | "generator_function_declaration" => Some(Self::Function),
            "lexical_declaration" | "variable_declaration" => Some(Self::VariableStatement),
            "type_alias_declaration" => Some(Self::TypeAlias),
            "enum_declaration" => Some(Self::Enum),
            "interface_declaration" => Some(Self::Interface),
            "class_declaration" | "abstract_class_declaration" => Some(Self::Class),
            _ => None,
        }
    }

    /// Kinds moved by splicing their raw text instead of structural copy.
    ///
    /// Raw text keeps member-level comments exactly; structural copy only
    /// carries the declaration's own leading/trailing comments.
    pub fn moves_by_text(&self) -> bool {
        matches!(self, Self::Enum | Self::Interface | Self::Class)
    }
}

impl Display for DeclarationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DeclarationKind::Function => "function",
            DeclarationKind::VariableStatement => "variable",
            DeclarationKind::TypeAlias => "type",
            DeclarationKind::Enum => "enum",
            DeclarationKind::Interface => "interface",
            DeclarationKind::Class => "class",
        })
    }
}

impl FromStr for DeclarationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "function" | "fn" => Ok(Self::Function),
            "variable" | "var" | "const" | "let" => Ok(Self::VariableStatement),
            "type" | "type-alias" | "type_alias" => Ok(Self::TypeAlias),
            "enum" => Ok(Self::Enum),
            "interface" => Ok(Self::Interface),
            "class" => Ok(Self::Class),
            other => Err(format!("unknown declaration kind `{other}`")),
        }
    }
}

/// Members of a class body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Property,
    GetAccessor,
    SetAccessor,
    Method,
    /// Body-less signature: an overload or an abstract method.
    MethodSignature,
    Constructor,
}

impl Display for MemberKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MemberKind::Property => "property",
            MemberKind::GetAccessor => "get accessor",
            MemberKind::SetAccessor => "set accessor",
            MemberKind::Method => "method",
            MemberKind::MethodSignature => "method signature",
            MemberKind::Constructor => "constructor",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("fn".parse::<DeclarationKind>(), Ok(DeclarationKind::Function));
        assert_eq!(
            "type-alias".parse::<DeclarationKind>(),
            Ok(DeclarationKind::TypeAlias)
        );
        assert!("module".parse::<DeclarationKind>().is_err());
    }

    #[test]
    fn text_moved_kinds() {
        let by_text: Vec<_> = DeclarationKind::ALL
            .iter()
            .filter(|k| k.moves_by_text())
            .collect();
        assert_eq!(
            by_text,
            vec![
                &DeclarationKind::Enum,
                &DeclarationKind::Interface,
                &DeclarationKind::Class
            ]
        );
    }
}
