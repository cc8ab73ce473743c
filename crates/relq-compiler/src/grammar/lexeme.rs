//! Token-level parsers shared by the grammar

use chrono::{NaiveDate, NaiveDateTime};
use relq_types::TIME_FORMAT;
use rust_decimal::Decimal;
use winnow::ascii::digit1;
use winnow::combinator::{alt, cut_err, fail, opt};
use winnow::error::{ContextError, ErrMode, StrContext};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use super::syntax::Mark;

pub type Input<'a> = &'a str;

// error labels, mapped to error codes when parsing fails
pub const EXPRESSION: &str = "expression";
pub const NUMBER: &str = "number";
pub const STRING: &str = "closing quote";
pub const TIME: &str = "time";
pub const CLOSING: &str = "closing delimiter";
pub const NAME: &str = "name";
pub const OPERATOR: &str = "infix operator";
pub const TYPE: &str = "type";

/// Words that can never be names
pub const RESERVED: &[&str] = &[
    "and", "or", "xor", "not", "sub", "sup", "union", "intersect", "minus", "join", "compose", "semijoin",
    "antijoin", "div", "mod", "true", "false", "def", "type", "do", "where", "fold", "allbut", "tup", "rel",
];

const WORD_OPERATORS: &[&str] = &[
    "or", "xor", "and", "sub", "sup", "union", "intersect", "minus", "join", "compose", "semijoin", "antijoin",
    "div", "mod",
];

pub fn backtrack() -> ErrMode<ContextError> {
    ErrMode::Backtrack(ContextError::new())
}

/// Fail without consuming, labelled
pub fn expected<T>(input: &mut Input<'_>, label: &'static str) -> ModalResult<T> {
    fail.context(StrContext::Label(label)).parse_next(input)
}

/// Fail without consuming, labelled, with no way back
pub fn cut_with<T>(input: &mut Input<'_>, label: &'static str) -> ModalResult<T> {
    cut_err(fail.context(StrContext::Label(label))).parse_next(input)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Skip whitespace and `--` comments
pub fn ws<'a>(input: &mut Input<'a>) -> ModalResult<()> {
    loop {
        let current: &'a str = *input;
        let rest = current.trim_start();
        if let Some(comment) = rest.strip_prefix("--") {
            let end = comment.find('\n').unwrap_or(comment.len());
            *input = &comment[end..];
        } else {
            *input = rest;
            return Ok(());
        }
    }
}

/// Position of the next token
pub fn mark(input: &mut Input<'_>) -> ModalResult<Mark> {
    ws(input)?;
    Ok(Mark(input.len()))
}

/// A literal token after optional whitespace
pub fn lit<'a>(mut token: &'static str) -> impl Parser<Input<'a>, &'a str, ErrMode<ContextError>> {
    move |input: &mut Input<'a>| -> ModalResult<&'a str> {
        ws(input)?;
        token.parse_next(input)
    }
}

/// A keyword, not followed by an identifier character
pub fn kw<'a>(mut word: &'static str) -> impl Parser<Input<'a>, &'a str, ErrMode<ContextError>> {
    move |input: &mut Input<'a>| -> ModalResult<&'a str> {
        ws(input)?;
        let start = *input;
        let matched: ModalResult<&'a str> = word.parse_next(input);
        let matched = matched?;
        if input.starts_with(is_ident_char) {
            *input = start;
            return Err(backtrack());
        }
        Ok(matched)
    }
}

/// Require a closing token
pub fn close(input: &mut Input<'_>, token: &'static str) -> ModalResult<()> {
    cut_err(lit(token))
        .context(StrContext::Label(CLOSING))
        .void()
        .parse_next(input)
}

/// Require a token that is not a closing delimiter
pub fn expect(input: &mut Input<'_>, token: &'static str) -> ModalResult<()> {
    cut_err(lit(token))
        .context(StrContext::Expected(winnow::error::StrContextValue::StringLiteral(token)))
        .void()
        .parse_next(input)
}

fn raw_ident<'a>(input: &mut Input<'a>) -> ModalResult<&'a str> {
    (one_of(|c: char| c.is_ascii_alphabetic() || c == '_'), take_while(0.., is_ident_char))
        .take()
        .parse_next(input)
}

/// A name that is not a reserved word
pub fn ident<'a>(input: &mut Input<'a>) -> ModalResult<&'a str> {
    ws(input)?;
    let start = *input;
    let name = raw_ident(input)?;
    if RESERVED.contains(&name) {
        *input = start;
        return Err(backtrack());
    }
    Ok(name)
}

/// A name, required
pub fn name(input: &mut Input<'_>) -> ModalResult<String> {
    cut_err(ident)
        .context(StrContext::Label(NAME))
        .map(str::to_string)
        .parse_next(input)
}

fn symbol_operator<'a>(input: &mut Input<'a>) -> ModalResult<&'a str> {
    alt(("<=", ">=", "<>", "=", "<", ">", "+", "-", "&", "*", "/", "^")).parse_next(input)
}

/// An infix operator, symbolic or a word
pub fn infix_operator<'a>(input: &mut Input<'a>) -> ModalResult<&'a str> {
    ws(input)?;
    if input.starts_with(":=") || input.starts_with("=>") {
        return Err(backtrack());
    }
    let start = *input;
    if let Ok(op) = symbol_operator(input) {
        return Ok(op);
    }
    match raw_ident(input) {
        Ok(word) if WORD_OPERATORS.contains(&word) => Ok(word),
        _ => {
            *input = start;
            Err(backtrack())
        }
    }
}

fn number_text<'a>(input: &mut Input<'a>) -> ModalResult<&'a str> {
    (digit1, opt(('.', digit1))).take().parse_next(input)
}

pub fn number(input: &mut Input<'_>) -> ModalResult<Decimal> {
    ws(input)?;
    let start = *input;
    let text = number_text(input)?;
    match text.parse::<Decimal>() {
        Ok(n) => Ok(n),
        Err(_) => {
            *input = start;
            cut_with(input, NUMBER)
        }
    }
}

/// Single-quoted text; `''` is an escaped quote
pub fn string<'a>(input: &mut Input<'a>) -> ModalResult<String> {
    ws(input)?;
    let start = *input;
    lit("'").parse_next(input)?;
    let mut out = String::new();
    loop {
        let rest: &'a str = *input;
        let Some(at) = rest.find('\'') else {
            *input = start;
            return cut_with(input, STRING);
        };
        out.push_str(&rest[..at]);
        let after = &rest[at + 1..];
        if let Some(escaped) = after.strip_prefix('\'') {
            out.push('\'');
            *input = escaped;
        } else {
            *input = after;
            return Ok(out);
        }
    }
}

/// `t'YYYY-MM-DD[ HH:MM:SS]'`
pub fn time(input: &mut Input<'_>) -> ModalResult<NaiveDateTime> {
    ws(input)?;
    let start = *input;
    lit("t").parse_next(input)?;
    let text = string(input)?;
    let parsed = NaiveDateTime::parse_from_str(&text, TIME_FORMAT).ok().or_else(|| {
        NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    });
    match parsed {
        Some(t) => Ok(t),
        None => {
            *input = start;
            cut_with(input, TIME)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn whitespace_and_comments() {
        let mut input = "  -- note\n  x";
        ws(&mut input).unwrap();
        assert_eq!(input, "x");
    }

    #[test]
    fn keywords_need_a_boundary() {
        let mut input = "order";
        assert!(kw("or").parse_next(&mut input).is_err());
        assert_eq!(input, "order");
        assert_eq!(ident(&mut input).unwrap(), "order");
    }

    #[test]
    fn reserved_words_are_not_names() {
        let mut input = "union";
        assert!(ident(&mut input).is_err());
        assert_eq!(infix_operator(&mut input).unwrap(), "union");
    }

    #[test]
    fn operators_longest_first() {
        let mut input = "<= 1";
        assert_eq!(infix_operator(&mut input).unwrap(), "<=");
        let mut input = ":= 1";
        assert!(infix_operator(&mut input).is_err());
    }

    #[test]
    fn literals() {
        assert_eq!(number(&mut "12.50").unwrap(), Decimal::new(1250, 2));
        assert_eq!(string(&mut "'it''s'").unwrap(), "it's");
        let t = time(&mut "t'2024-02-01'").unwrap();
        assert_eq!(t.format(TIME_FORMAT).to_string(), "2024-02-01 00:00:00");
    }

    #[test]
    fn unterminated_string_is_cut() {
        let mut input = "'abc";
        assert!(matches!(string(&mut input), Err(ErrMode::Cut(_))));
    }
}
