//! Reference grammar
//!
//! Turns the text of one statement into an untyped [`StatementSyntax`].
//! Nothing is resolved here; infix chains stay flat and every construct
//! carries a [`Mark`] so later errors can point back into the source.

mod expr;
mod lexeme;
pub mod syntax;

pub use syntax::*;

use relq_diagnostics::{ErrorCode, RQ0001, RQ0002, RQ0004, RQ0005, RQ0006, RQ0007, RQ0008, RQ0010};
use thiserror::Error;
use winnow::error::{ContextError, ErrMode, StrContext};

use lexeme::{CLOSING, EXPRESSION, Input, NUMBER, STRING, TIME, ws};

/// A statement that does not match the grammar
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{code}: {message}")]
pub struct SyntaxError {
    pub code: ErrorCode,
    pub message: String,
    /// Byte offset into the statement text
    pub offset: usize,
}

/// Parse one statement; the whole text must be consumed
pub fn parse_statement(text: &str) -> Result<StatementSyntax, SyntaxError> {
    let mut input: Input<'_> = text;
    match expr::statement(&mut input) {
        Ok(statement) => {
            let _ = ws(&mut input);
            if input.is_empty() {
                return Ok(statement);
            }
            let token: String = input.chars().take_while(|c| !c.is_whitespace()).take(16).collect();
            Err(SyntaxError {
                code: RQ0010,
                message: format!("unexpected '{token}' after the end of the statement"),
                offset: text.len() - input.len(),
            })
        }
        Err(e) => {
            let error = match e {
                ErrMode::Backtrack(e) | ErrMode::Cut(e) => e,
                ErrMode::Incomplete(_) => ContextError::new(),
            };
            let mut rest = input;
            let _ = ws(&mut rest);
            let (code, message) = describe(&error, rest.is_empty());
            log::debug!("{code} at offset {}: {message}", text.len() - rest.len());
            Err(SyntaxError {
                code,
                message,
                offset: text.len() - rest.len(),
            })
        }
    }
}

/// Pick the error code from the innermost label
fn describe(error: &ContextError, at_end: bool) -> (ErrorCode, String) {
    let label = error.context().find_map(|c| match c {
        StrContext::Label(label) => Some(*label),
        _ => None,
    });
    let expected = error.context().find_map(|c| match c {
        StrContext::Expected(value) => Some(value.to_string()),
        _ => None,
    });
    match label {
        Some(NUMBER) => (RQ0005, "invalid number literal".to_string()),
        Some(STRING) => (RQ0004, "unterminated string literal".to_string()),
        Some(TIME) => (RQ0006, "invalid time literal".to_string()),
        Some(CLOSING) if at_end => (RQ0007, "missing closing delimiter at end of statement".to_string()),
        Some(CLOSING) => (RQ0007, "missing closing delimiter".to_string()),
        _ if at_end => (RQ0002, "unexpected end of statement".to_string()),
        Some(EXPRESSION) if expected.is_none() => (RQ0008, "expected an expression".to_string()),
        _ => match (expected, label) {
            (Some(value), _) => (RQ0001, format!("expected {value}")),
            (None, Some(label)) => (RQ0001, format!("expected {label}")),
            (None, None) => (RQ0001, "syntax error".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(text: &str) -> StatementSyntax {
        parse_statement(text).unwrap()
    }

    fn expr(text: &str) -> ExprSyntax {
        match parse(text) {
            StatementSyntax::Expr(e) => e.kind,
            other => panic!("not an expression: {other:?}"),
        }
    }

    #[test]
    fn infix_chain_stays_flat() {
        let ExprSyntax::Infix { first, rest } = expr("1 + 2 * 3") else {
            panic!("expected a chain");
        };
        assert!(matches!(first.kind, ExprSyntax::Number(_)));
        let ops: Vec<&str> = rest.iter().map(|(op, _)| op.name.as_str()).collect();
        assert_eq!(ops, vec!["+", "*"]);
    }

    #[test]
    fn parenthesised_group_is_one_operand() {
        let ExprSyntax::Infix { first, rest } = expr("(1 + 2) * 3") else {
            panic!("expected a chain");
        };
        assert!(matches!(first.kind, ExprSyntax::Infix { .. }));
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn postfix_chain() {
        let ExprSyntax::Fields { base, list } = expr("r.where(a > 1).{ a, b := a * 2 }") else {
            panic!("expected a field list");
        };
        assert!(matches!(base.kind, ExprSyntax::Where { .. }));
        assert!(!list.all_but);
        assert_eq!(list.fields.len(), 2);
        assert!(matches!(&list.fields[1], FieldSyntax::Assign { name, .. } if name == "b"));
    }

    #[test]
    fn all_but_and_order_keys() {
        let ExprSyntax::Fields { list, .. } = expr("r.{ *, x, $(%g, -d), n := ord() }") else {
            panic!("expected a field list");
        };
        assert!(list.all_but);
        assert_eq!(list.order.len(), 2);
        assert!(list.order[0].grouped && !list.order[0].descending);
        assert!(list.order[1].descending && !list.order[1].grouped);
        assert_eq!(list.fields.len(), 2);
    }

    #[test]
    fn literals_and_constructors() {
        assert!(matches!(expr("{ a := 1, b := 'x' }"), ExprSyntax::Row(r) if r.len() == 2));
        assert!(matches!(expr("{ {a := 1}, {a := 2} }"), ExprSyntax::Table(rows) if rows.len() == 2));
        assert!(matches!(expr("{ {a: number, b: text} }"), ExprSyntax::EmptyTable(c) if c.len() == 2));
        assert!(matches!(expr("fold(+, x)"), ExprSyntax::Fold { op, .. } if op == "+"));
        assert!(matches!(expr("do { x := 1; x + 1 }"), ExprSyntax::Block { locals, .. } if locals.len() == 1));
        assert!(matches!(expr("t'2024-01-31 12:00:00'"), ExprSyntax::Time(_)));
        assert!(matches!(expr("not -x"), ExprSyntax::Not(_)));
    }

    #[test]
    fn statements() {
        assert!(matches!(parse("x := 1"), StatementSyntax::Assign { name, .. } if name == "x"));
        let StatementSyntax::Define { name, params, returns, .. } = parse("def f(x: number): number => x + 1") else {
            panic!("expected a definition");
        };
        assert_eq!(name, "f");
        assert_eq!(params.len(), 1);
        assert!(matches!(returns, Some(TypeSyntax::Named(t, _)) if t == "number"));
        let StatementSyntax::TypeDef { supertype, components, .. } = parse("type point3 : point (z: number)") else {
            panic!("expected a type definition");
        };
        assert_eq!(supertype.map(|(s, _)| s), Some("point".to_string()));
        assert_eq!(components.len(), 1);
    }

    #[test]
    fn comments_are_whitespace() {
        assert!(matches!(expr("1 -- one\n + 2"), ExprSyntax::Infix { .. }));
    }

    #[rstest]
    #[case("'abc", RQ0004)]
    #[case("99999999999999999999999999999999999", RQ0005)]
    #[case("t'2024-13-45'", RQ0006)]
    #[case("f(1, 2", RQ0007)]
    #[case("1 +", RQ0002)]
    #[case("1 + )", RQ0008)]
    #[case("1 2", RQ0010)]
    #[case("def f(x: number) x", RQ0001)]
    fn error_codes(#[case] text: &str, #[case] code: ErrorCode) {
        assert_eq!(parse_statement(text).unwrap_err().code, code);
    }

    #[test]
    fn error_offset_points_at_token() {
        let err = parse_statement("1 + )").unwrap_err();
        assert_eq!(err.offset, 4);
        let err = parse_statement("x := 'open").unwrap_err();
        assert_eq!(err.offset, 5);
    }
}
