//! Statement splitting
//!
//! A statement ends at `;` or at a newline, both only outside brackets,
//! strings and comments. A newline followed by a line starting with `.`
//! continues the statement, so postfix chains can be written one step per
//! line. A blank line ends a statement even inside brackets, which keeps an
//! unclosed bracket from swallowing the rest of the input. Lines starting
//! with `#` are directives.

/// One top-level unit of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk<'s> {
    Statement(&'s str),
    /// Directive text without the leading `#`
    Directive(&'s str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece<'s> {
    pub chunk: Chunk<'s>,
    /// Byte offset of the first character in the whole input
    pub offset: usize,
}

pub fn split(source: &str) -> Vec<Piece<'_>> {
    let bytes = source.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            match b {
                b'\'' => in_string = false,
                // strings never span lines
                b'\n' => {
                    in_string = false;
                    continue;
                }
                _ => {}
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' => in_string = true,
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = line_end(source, i);
                continue;
            }
            b'#' if is_blank(&source[start..i]) => {
                let end = line_end(source, i);
                let text = source[i + 1..end].trim();
                pieces.push(Piece {
                    chunk: Chunk::Directive(text),
                    offset: i,
                });
                start = end;
                i = end;
                continue;
            }
            b'(' | b'{' | b'[' => depth += 1,
            b')' | b'}' | b']' => depth = depth.saturating_sub(1),
            b';' if depth == 0 => {
                push(source, start, i, &mut pieces);
                start = i + 1;
            }
            b'\n' => {
                let rest = &source[i + 1..];
                let ends = if depth == 0 {
                    !rest.trim_start().starts_with('.')
                } else {
                    starts_with_blank_line(rest)
                };
                if ends {
                    push(source, start, i, &mut pieces);
                    start = i + 1;
                    depth = 0;
                }
            }
            _ => {}
        }
        i += 1;
    }
    push(source, start, source.len(), &mut pieces);
    pieces
}

fn line_end(source: &str, from: usize) -> usize {
    source[from..].find('\n').map_or(source.len(), |at| from + at)
}

fn starts_with_blank_line(rest: &str) -> bool {
    let line = rest.split('\n').next().unwrap_or_default();
    line.trim().is_empty() && rest.contains('\n')
}

/// Nothing but whitespace and comments
fn is_blank(text: &str) -> bool {
    text.lines().all(|line| {
        let code = line.find("--").map_or(line, |at| &line[..at]);
        code.trim().is_empty()
    })
}

fn push<'s>(source: &'s str, start: usize, end: usize, pieces: &mut Vec<Piece<'s>>) {
    let raw = &source[start..end];
    if is_blank(raw) {
        return;
    }
    let text = raw.trim();
    let offset = start + (raw.len() - raw.trim_start().len());
    pieces.push(Piece {
        chunk: Chunk::Statement(text),
        offset,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn statements(source: &str) -> Vec<&str> {
        split(source)
            .into_iter()
            .map(|p| match p.chunk {
                Chunk::Statement(s) => s,
                Chunk::Directive(d) => d,
            })
            .collect()
    }

    #[test]
    fn semicolons_and_newlines() {
        assert_eq!(statements("x := 1; y := 2\nx + y\n\n"), vec!["x := 1", "y := 2", "x + y"]);
    }

    #[test]
    fn brackets_and_strings_hold_statements_together() {
        assert_eq!(
            statements("do { a := 1;\n a + 1 }\n'x;y'"),
            vec!["do { a := 1;\n a + 1 }", "'x;y'"]
        );
    }

    #[test]
    fn dot_lines_continue() {
        assert_eq!(statements("r\n  .where(a > 1)\n  .{ a }\n1"), vec!["r\n  .where(a > 1)\n  .{ a }", "1"]);
    }

    #[test]
    fn comments_and_directives() {
        let pieces = split("-- setup\n#trace 2\nx -- trailing ; not a split\n");
        assert_eq!(pieces[0].chunk, Chunk::Directive("trace 2"));
        assert_eq!(pieces[0].offset, 9);
        assert_eq!(pieces[1].chunk, Chunk::Statement("x -- trailing ; not a split"));
        assert_eq!(pieces.len(), 2);
    }

    #[test]
    fn offsets_point_at_statement_start() {
        let pieces = split("1;  2\n   3");
        let offsets: Vec<usize> = pieces.iter().map(|p| p.offset).collect();
        assert_eq!(offsets, vec![0, 4, 9]);
    }

    #[test]
    fn unclosed_bracket_stops_at_blank_line() {
        assert_eq!(statements("f(1,\n\n2"), vec!["f(1,", "2"]);
        assert_eq!(statements("'open\n2"), vec!["'open", "2"]);
    }
}
