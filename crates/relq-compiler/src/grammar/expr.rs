//! Statement and expression parsers
//!
//! Imperative recursive descent over `&str`. Alternatives are tried in
//! order by saving and restoring the input; once a construct is committed
//! (a keyword or an opening delimiter was seen) failures are cut so the
//! error points at the offending token.

use winnow::combinator::{cut_err, separated};
use winnow::error::StrContext;
use winnow::prelude::*;

use super::lexeme::{
    EXPRESSION, Input, OPERATOR, TYPE, close, cut_with, expect, expected, ident, infix_operator, kw, lit,
    mark, name, number, string, time, ws,
};
use super::syntax::{Expr, ExprSyntax, FieldList, FieldSyntax, InfixOp, Mark, OrderKey, StatementSyntax, TypeSyntax};

pub fn statement(input: &mut Input<'_>) -> ModalResult<StatementSyntax> {
    let at = mark(input)?;

    if kw("type").parse_next(input).is_ok() {
        let type_name = name(input)?;
        let supertype = if lit(":").parse_next(input).is_ok() {
            let super_at = mark(input)?;
            Some((name(input)?, super_at))
        } else {
            None
        };
        expect(input, "(")?;
        let components = params(input)?;
        close(input, ")")?;
        return Ok(StatementSyntax::TypeDef {
            name: type_name,
            supertype,
            components,
            mark: at,
        });
    }

    if kw("def").parse_next(input).is_ok() {
        let fn_name = name(input)?;
        expect(input, "(")?;
        let params = params(input)?;
        close(input, ")")?;
        let returns = if lit(":").parse_next(input).is_ok() {
            Some(type_syntax(input)?)
        } else {
            None
        };
        expect(input, "=>")?;
        let body = required_expr(input)?;
        return Ok(StatementSyntax::Define {
            name: fn_name,
            params,
            returns,
            body,
            mark: at,
        });
    }

    let start = *input;
    if let Ok(target) = ident(input) {
        if lit(":=").parse_next(input).is_ok() {
            let value = required_expr(input)?;
            return Ok(StatementSyntax::Assign {
                name: target.to_string(),
                value,
                mark: at,
            });
        }
    }
    *input = start;

    expr.map(StatementSyntax::Expr).parse_next(input)
}

fn required_expr(input: &mut Input<'_>) -> ModalResult<Expr> {
    cut_err(expr).context(StrContext::Label(EXPRESSION)).parse_next(input)
}

/// `unary { INFIX unary }`, left flat for the factory to group
pub fn expr(input: &mut Input<'_>) -> ModalResult<Expr> {
    let at = mark(input)?;
    let first = unary(input)?;
    let mut rest = Vec::new();
    loop {
        let op_at = mark(input)?;
        let start = *input;
        let Ok(op) = infix_operator(input) else {
            *input = start;
            break;
        };
        let rhs = cut_err(unary).context(StrContext::Label(EXPRESSION)).parse_next(input)?;
        rest.push((
            InfixOp {
                name: op.to_string(),
                mark: op_at,
            },
            rhs,
        ));
    }
    if rest.is_empty() {
        return Ok(first);
    }
    Ok(Expr {
        kind: ExprSyntax::Infix {
            first: Box::new(first),
            rest,
        },
        mark: at,
    })
}

fn unary(input: &mut Input<'_>) -> ModalResult<Expr> {
    let at = mark(input)?;
    if kw("not").parse_next(input).is_ok() {
        let arg = cut_err(unary).context(StrContext::Label(EXPRESSION)).parse_next(input)?;
        return Ok(Expr {
            kind: ExprSyntax::Not(Box::new(arg)),
            mark: at,
        });
    }
    if lit("-").parse_next(input).is_ok() {
        let arg = cut_err(unary).context(StrContext::Label(EXPRESSION)).parse_next(input)?;
        return Ok(Expr {
            kind: ExprSyntax::Neg(Box::new(arg)),
            mark: at,
        });
    }
    postfix(input)
}

fn postfix(input: &mut Input<'_>) -> ModalResult<Expr> {
    let mut base = primary(input)?;
    loop {
        let start = *input;
        let at = mark(input)?;
        if lit(".").parse_next(input).is_err() {
            *input = start;
            break;
        }
        let kind = if lit("{").parse_next(input).is_ok() {
            let list = field_list(input)?;
            close(input, "}")?;
            ExprSyntax::Fields {
                base: Box::new(base),
                list,
            }
        } else if kw("where").parse_next(input).is_ok() {
            expect(input, "(")?;
            let predicate = required_expr(input)?;
            close(input, ")")?;
            ExprSyntax::Where {
                base: Box::new(base),
                predicate: Box::new(predicate),
            }
        } else {
            ExprSyntax::Member {
                base: Box::new(base),
                name: name(input)?,
            }
        };
        base = Expr { kind, mark: at };
    }
    Ok(base)
}

fn primary(input: &mut Input<'_>) -> ModalResult<Expr> {
    let at = mark(input)?;
    let kind = match input.chars().next() {
        Some(c) if c.is_ascii_digit() => ExprSyntax::Number(number(input)?),
        Some('\'') => ExprSyntax::Text(string(input)?),
        Some('t') if input.starts_with("t'") => ExprSyntax::Time(time(input)?),
        Some('@') => {
            lit("@").parse_next(input)?;
            ExprSyntax::CurrentRow
        }
        Some('(') => {
            lit("(").parse_next(input)?;
            let inner = required_expr(input)?;
            close(input, ")")?;
            return Ok(inner);
        }
        Some('{') => braces(input)?,
        _ => word(input)?,
    };
    Ok(Expr { kind, mark: at })
}

/// Keyword-led primaries, calls and names
fn word(input: &mut Input<'_>) -> ModalResult<ExprSyntax> {
    if kw("true").parse_next(input).is_ok() {
        return Ok(ExprSyntax::Bool(true));
    }
    if kw("false").parse_next(input).is_ok() {
        return Ok(ExprSyntax::Bool(false));
    }
    if kw("fold").parse_next(input).is_ok() {
        expect(input, "(")?;
        let op = cut_err(infix_operator)
            .context(StrContext::Label(OPERATOR))
            .parse_next(input)?;
        expect(input, ",")?;
        let arg = required_expr(input)?;
        close(input, ")")?;
        return Ok(ExprSyntax::Fold {
            op: op.to_string(),
            arg: Box::new(arg),
        });
    }
    if kw("do").parse_next(input).is_ok() {
        return block(input);
    }
    let Ok(id) = ident(input) else {
        return expected(input, EXPRESSION);
    };
    if lit("(").parse_next(input).is_ok() {
        return Ok(ExprSyntax::Call {
            name: id.to_string(),
            args: call_args(input)?,
        });
    }
    Ok(ExprSyntax::Name(id.to_string()))
}

fn call_args(input: &mut Input<'_>) -> ModalResult<Vec<Expr>> {
    ws(input)?;
    if input.starts_with(')') {
        lit(")").parse_next(input)?;
        return Ok(Vec::new());
    }
    let args: Vec<Expr> = separated(1.., required_expr, lit(",")).parse_next(input)?;
    close(input, ")")?;
    Ok(args)
}

/// `do { name := expr; ... body }`
fn block(input: &mut Input<'_>) -> ModalResult<ExprSyntax> {
    expect(input, "{")?;
    let mut locals = Vec::new();
    loop {
        let start = *input;
        if let Ok(local) = ident(input) {
            if lit(":=").parse_next(input).is_ok() {
                let value = required_expr(input)?;
                expect(input, ";")?;
                locals.push((local.to_string(), value));
                continue;
            }
        }
        *input = start;
        break;
    }
    let body = required_expr(input)?;
    close(input, "}")?;
    Ok(ExprSyntax::Block {
        locals,
        body: Box::new(body),
    })
}

/// Row, table or typed empty table literal
fn braces(input: &mut Input<'_>) -> ModalResult<ExprSyntax> {
    lit("{").parse_next(input)?;
    ws(input)?;
    if input.starts_with('}') {
        lit("}").parse_next(input)?;
        return Ok(ExprSyntax::Row(Vec::new()));
    }
    if !input.starts_with('{') {
        let row = row_body(input)?;
        close(input, "}")?;
        return Ok(ExprSyntax::Row(row));
    }

    lit("{").parse_next(input)?;
    if is_typed_column(input) {
        let columns: Vec<(String, TypeSyntax)> = separated(1.., param, lit(",")).parse_next(input)?;
        close(input, "}")?;
        close(input, "}")?;
        return Ok(ExprSyntax::EmptyTable(columns));
    }
    let mut rows = vec![row_body(input)?];
    close(input, "}")?;
    while lit(",").parse_next(input).is_ok() {
        expect(input, "{")?;
        rows.push(row_body(input)?);
        close(input, "}")?;
    }
    close(input, "}")?;
    Ok(ExprSyntax::Table(rows))
}

/// `name :` but not `name :=`
fn is_typed_column(input: &Input<'_>) -> bool {
    let mut ahead = *input;
    if ident(&mut ahead).is_err() {
        return false;
    }
    let _ = ws(&mut ahead);
    ahead.starts_with(':') && !ahead.starts_with(":=")
}

fn row_body(input: &mut Input<'_>) -> ModalResult<Vec<(String, Expr)>> {
    separated(0.., binding, lit(",")).parse_next(input)
}

fn binding(input: &mut Input<'_>) -> ModalResult<(String, Expr)> {
    let column = ident(input)?;
    expect(input, ":=")?;
    let value = required_expr(input)?;
    Ok((column.to_string(), value))
}

/// Contents of `.{ ... }`, without the braces
fn field_list(input: &mut Input<'_>) -> ModalResult<FieldList> {
    let mut list = FieldList::default();
    if lit("*").parse_next(input).is_ok() || kw("allbut").parse_next(input).is_ok() {
        list.all_but = true;
        let _ = lit(",").parse_next(input);
    }
    ws(input)?;
    if input.starts_with('}') {
        return Ok(list);
    }
    loop {
        field_entry(input, &mut list)?;
        if lit(",").parse_next(input).is_err() {
            break;
        }
    }
    Ok(list)
}

fn field_entry(input: &mut Input<'_>, list: &mut FieldList) -> ModalResult<()> {
    let at = mark(input)?;
    if lit("$").parse_next(input).is_ok() {
        expect(input, "(")?;
        let keys: Vec<OrderKey> = separated(1.., order_key, lit(",")).parse_next(input)?;
        close(input, ")")?;
        list.order.extend(keys);
        return Ok(());
    }
    let field = name(input)?;
    if lit(":=").parse_next(input).is_ok() {
        let value = required_expr(input)?;
        list.fields.push(FieldSyntax::Assign {
            name: field,
            value,
            mark: at,
        });
    } else {
        list.fields.push(FieldSyntax::Name(field, at));
    }
    Ok(())
}

/// `[%][-]name`
fn order_key(input: &mut Input<'_>) -> ModalResult<OrderKey> {
    let at = mark(input)?;
    let grouped = lit("%").parse_next(input).is_ok();
    let descending = lit("-").parse_next(input).is_ok();
    let key = name(input)?;
    Ok(OrderKey {
        name: key,
        descending,
        grouped,
        mark: at,
    })
}

fn params(input: &mut Input<'_>) -> ModalResult<Vec<(String, TypeSyntax)>> {
    separated(0.., param, lit(",")).parse_next(input)
}

fn param(input: &mut Input<'_>) -> ModalResult<(String, TypeSyntax)> {
    let param_name = ident(input)?;
    expect(input, ":")?;
    let ty = type_syntax(input)?;
    Ok((param_name.to_string(), ty))
}

fn type_syntax(input: &mut Input<'_>) -> ModalResult<TypeSyntax> {
    let at: Mark = mark(input)?;
    if kw("tup").parse_next(input).is_ok() {
        expect(input, "{")?;
        let columns = params(input)?;
        close(input, "}")?;
        return Ok(TypeSyntax::Tuple(columns));
    }
    if kw("rel").parse_next(input).is_ok() {
        expect(input, "{")?;
        let columns = params(input)?;
        close(input, "}")?;
        return Ok(TypeSyntax::Relation(columns));
    }
    match ident(input) {
        Ok(type_name) => Ok(TypeSyntax::Named(type_name.to_string(), at)),
        Err(_) => cut_with(input, TYPE),
    }
}
