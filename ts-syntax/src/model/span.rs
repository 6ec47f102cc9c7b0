//! Positional handles into one version of a file.
//!
//! A `Span` carries 1-based lines (for messages) and 0-based byte offsets (for
//! edits). It is only valid for the file version it was taken from; every
//! handle type that embeds one also records that version.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use tree_sitter::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub end_line: usize,
    pub start_byte: usize,
    /// Exclusive.
    pub end_byte: usize,
}

impl Span {
    pub fn of(node: &Node) -> Self {
        Self {
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
        }
    }

    pub fn byte_range(&self) -> Range<usize> {
        self.start_byte..self.end_byte
    }

    /// Smallest span covering both.
    pub fn merge(a: &Span, b: &Span) -> Span {
        Span {
            start_line: a.start_line.min(b.start_line),
            end_line: a.end_line.max(b.end_line),
            start_byte: a.start_byte.min(b.start_byte),
            end_byte: a.end_byte.max(b.end_byte),
        }
    }

    /// The spanned text, clamped to `text`'s length.
    pub fn slice_text<'a>(&self, text: &'a str) -> &'a str {
        let start = self.start_byte.min(text.len());
        let end = self.end_byte.min(text.len()).max(start);
        &text[start..end]
    }
}
