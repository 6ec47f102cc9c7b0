//! Comment-range inspection.
//!
//! Tree-sitter keeps comments as `comment` extras among the siblings of the
//! construct they annotate. A *leading* range is the run of comments directly
//! before a construct; a comment that starts on the line where the previous
//! sibling ends belongs to that sibling as its *trailing* range instead.

use crate::{model::span::Span, parse::text};
use serde::{Deserialize, Serialize};
use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentKind {
    /// `// ...`
    Line,
    /// `/* ... */` and `/** ... */`
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRange {
    pub span: Span,
    pub kind: CommentKind,
    pub text: String,
}

impl CommentRange {
    fn from_node(node: Node, code: &str) -> Self {
        let text = text(code, node).to_string();
        let kind = if text.starts_with("//") {
            CommentKind::Line
        } else {
            CommentKind::Block
        };
        Self {
            span: Span::of(&node),
            kind,
            text,
        }
    }
}

/// Leading comment ranges of `node`, in source order.
pub fn leading_comments(node: Node, code: &str) -> Vec<CommentRange> {
    let mut out = Vec::new();
    let mut cur = node.prev_sibling();
    while let Some(c) = cur {
        if c.kind() != "comment" {
            break;
        }
        if let Some(before) = c.prev_sibling() {
            if before.kind() != "comment" && before.end_position().row == c.start_position().row
            {
                break;
            }
        }
        out.push(CommentRange::from_node(c, code));
        cur = c.prev_sibling();
    }
    out.reverse();
    out
}

/// Trailing comment ranges of `node`: comments after it on its last line.
///
/// A `;` sibling on the same line (class members keep it outside the member
/// node) is stepped over.
pub fn trailing_comments(node: Node, code: &str) -> Vec<CommentRange> {
    let row = node.end_position().row;
    let mut out = Vec::new();
    let mut cur = node.next_sibling();
    while let Some(n) = cur {
        if n.start_position().row != row {
            break;
        }
        match n.kind() {
            ";" | "," if !n.is_named() => {}
            "comment" => out.push(CommentRange::from_node(n, code)),
            _ => break,
        }
        cur = n.next_sibling();
    }
    out
}

/// Synthesized trailing trivia: a single space, then the original comment text.
///
/// The leading space keeps a re-rendered statement from running into `//`.
pub fn trailing_trivia(comments: &[CommentRange]) -> Option<String> {
    if comments.is_empty() {
        return None;
    }
    let joined = comments
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    Some(format!(" {joined}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::language::LanguageKind, parse::parse};
    use std::path::Path;

    fn statements(code: &str) -> (tree_sitter::Tree, Vec<(usize, usize)>) {
        let tree = parse(Path::new("a.ts"), LanguageKind::TypeScript, code, None).unwrap();
        let ranges = {
            let root = tree.root_node();
            let mut w = root.walk();
            root.named_children(&mut w)
                .filter(|n| n.kind() != "comment")
                .map(|n| (n.start_byte(), n.end_byte()))
                .collect()
        };
        (tree, ranges)
    }

    #[test]
    fn leading_block_excludes_previous_trailing() {
        let code = "const a = 1; // about a\n/** doc b */\n// more b\nconst b = 2;\n";
        let (tree, ranges) = statements(code);
        let root = tree.root_node();
        let b = root
            .descendant_for_byte_range(ranges[1].0, ranges[1].1)
            .unwrap();
        let leading = leading_comments(b, code);
        let texts: Vec<_> = leading.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["/** doc b */", "// more b"]);
        assert_eq!(leading[0].kind, CommentKind::Block);

        let a = root
            .descendant_for_byte_range(ranges[0].0, ranges[0].1)
            .unwrap();
        let trailing = trailing_comments(a, code);
        assert_eq!(trailing.len(), 1);
        assert_eq!(trailing_trivia(&trailing).as_deref(), Some(" // about a"));
    }

    #[test]
    fn no_trivia_without_comments() {
        assert_eq!(trailing_trivia(&[]), None);
    }
}
