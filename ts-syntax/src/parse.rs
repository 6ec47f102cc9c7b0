//! Tree-sitter parsing with incremental re-parse after text edits.

use crate::{
    errors::{Result, SyntaxError},
    model::language::LanguageKind,
};
use std::path::Path;
use tree_sitter::{InputEdit, Node, Parser, Point, Tree};

/// Parse `code` with the grammar for `lang`, reusing `old` when it has been edited.
pub fn parse(path: &Path, lang: LanguageKind, code: &str, old: Option<&Tree>) -> Result<Tree> {
    let mut parser = Parser::new();
    parser.set_language(&lang.grammar())?;
    parser
        .parse(code, old)
        .ok_or_else(|| SyntaxError::Parse(path.to_path_buf()))
}

/// Build the [`InputEdit`] describing the replacement of `start..old_end` in
/// `before` by `new_text`.
pub fn input_edit(before: &str, start: usize, old_end: usize, new_text: &str) -> InputEdit {
    let start_position = point_at(before, start);
    let old_end_position = point_at(before, old_end);

    let new_end_position = match new_text.rfind('\n') {
        Some(last_nl) => Point::new(
            start_position.row + new_text.matches('\n').count(),
            new_text.len() - last_nl - 1,
        ),
        None => Point::new(start_position.row, start_position.column + new_text.len()),
    };

    InputEdit {
        start_byte: start,
        old_end_byte: old_end,
        new_end_byte: start + new_text.len(),
        start_position,
        old_end_position,
        new_end_position,
    }
}

/// Row/column (bytes) of a byte offset.
pub fn point_at(code: &str, byte: usize) -> Point {
    let byte = byte.min(code.len());
    let head = &code.as_bytes()[..byte];
    let row = head.iter().filter(|b| **b == b'\n').count();
    let column = match head.iter().rposition(|b| *b == b'\n') {
        Some(nl) => byte - nl - 1,
        None => byte,
    };
    Point::new(row, column)
}

pub(crate) fn text<'a>(code: &'a str, node: Node) -> &'a str {
    &code[node.byte_range()]
}

/// True when `node` has a direct anonymous child token `token` (e.g. `async`, `get`).
pub(crate) fn has_token(node: Node, token: &str) -> bool {
    let mut w = node.walk();
    let found = node
        .children(&mut w)
        .any(|ch| !ch.is_named() && ch.kind() == token);
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_counts_rows_and_columns() {
        let code = "ab\ncde\nf";
        assert_eq!(point_at(code, 0), Point::new(0, 0));
        assert_eq!(point_at(code, 4), Point::new(1, 1));
        assert_eq!(point_at(code, code.len()), Point::new(2, 1));
    }

    #[test]
    fn edit_tracks_inserted_lines() {
        let edit = input_edit("let a = 1;\n", 4, 5, "b\n\nc");
        assert_eq!(edit.new_end_byte, 8);
        assert_eq!(edit.new_end_position, Point::new(2, 1));
        assert_eq!(edit.old_end_position, Point::new(0, 5));
    }

    #[test]
    fn parses_typescript() {
        let tree = parse(
            Path::new("a.ts"),
            LanguageKind::TypeScript,
            "export const a: number = 1;\n",
            None,
        )
        .unwrap();
        assert_eq!(tree.root_node().kind(), "program");
        assert!(!tree.root_node().has_error());
    }
}
