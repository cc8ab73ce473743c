//! Source locations

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in the input text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Line number (1-based)
    pub line: usize,
    /// Column number in characters (1-based)
    pub column: usize,
    /// Byte offset from the start of the input (0-based)
    pub offset: usize,
}

impl SourceLocation {
    pub const fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// Locate a byte offset of `source`
    pub fn from_offset(offset: usize, source: &str) -> Self {
        let (line, column) = offset_to_line_col(source, offset);
        Self { line, column, offset }
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::new(1, 1, 0)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Line and column of a byte offset, both 1-based
pub fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..floor_char_boundary(source, offset)];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |at| at + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

fn floor_char_boundary(source: &str, offset: usize) -> usize {
    let mut at = offset.min(source.len());
    while !source.is_char_boundary(at) {
        at -= 1;
    }
    at
}

/// Text of a 1-based line, without its terminator
pub fn line_text(source: &str, line: usize) -> &str {
    source
        .lines()
        .nth(line.saturating_sub(1))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_to_line_col() {
        let source = "x := 1\ny := 2\nx + y";
        assert_eq!(offset_to_line_col(source, 0), (1, 1));
        assert_eq!(offset_to_line_col(source, 5), (1, 6));
        assert_eq!(offset_to_line_col(source, 7), (2, 1));
        assert_eq!(offset_to_line_col(source, 14), (3, 1));
        assert_eq!(offset_to_line_col(source, 99), (3, 6));
    }

    #[test]
    fn test_columns_count_characters() {
        assert_eq!(offset_to_line_col("'é' + 1", 5), (1, 5));
    }

    #[test]
    fn test_line_text() {
        let source = "first\nsecond\n";
        assert_eq!(line_text(source, 2), "second");
        assert_eq!(line_text(source, 9), "");
    }
}
