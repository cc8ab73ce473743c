//! Parse tree to typed tree
//!
//! Walks a [`StatementSyntax`] in source order and fires the matching
//! factory actions, so scopes open and close exactly around the operands
//! they cover. Infix chains are grouped here with [`climb`]. Every error
//! leaving the walk carries the location of the innermost construct that
//! raised it.

use relq_ast::{Node, Statement};
use relq_diagnostics::{RQ0101, SourceLocation};
use relq_types::{CompileContext, DataType, Heading, Value};

use crate::allbut::FieldSpec;
use crate::catalog::Catalog;
use crate::error::FactoryResult;
use crate::factory::AstFactory;
use crate::grammar::{Expr, ExprSyntax, FieldList, FieldSyntax, Mark, StatementSyntax, TypeSyntax};
use crate::infix::climb;

/// Maps marks of one statement to locations in the whole input
#[derive(Debug, Clone, Copy)]
pub struct Locator<'s> {
    source: &'s str,
    start: usize,
    len: usize,
}

impl<'s> Locator<'s> {
    /// The statement is `source[start..start + len]`
    pub fn new(source: &'s str, start: usize, len: usize) -> Self {
        Self { source, start, len }
    }

    pub fn at(self, mark: Mark) -> SourceLocation {
        self.offset(mark.offset(self.len))
    }

    /// A byte offset relative to the statement
    pub fn offset(self, offset: usize) -> SourceLocation {
        SourceLocation::from_offset(self.start + offset, self.source)
    }
}

pub struct Builder<'a> {
    factory: AstFactory<'a>,
    locate: Locator<'a>,
}

impl<'a> Builder<'a> {
    pub fn new(ctx: &'a mut CompileContext, catalog: &'a mut dyn Catalog, locate: Locator<'a>) -> Self {
        Self {
            factory: AstFactory::new(ctx, catalog),
            locate,
        }
    }

    pub fn statement(&mut self, syntax: &StatementSyntax) -> FactoryResult<Statement> {
        match syntax {
            StatementSyntax::Expr(expr) => {
                let node = self.expr(expr)?;
                Ok(self.factory.expression(node))
            }
            StatementSyntax::Assign { name, value, mark } => {
                let value = self.expr(value)?;
                let at = self.locate.at(*mark);
                self.factory.assign(name, value).map_err(|e| e.or_at(at))
            }
            StatementSyntax::Define {
                name,
                params,
                returns,
                body,
                mark,
            } => {
                let at = self.locate.at(*mark);
                let params = self.heading_of(params)?;
                let returns = returns.as_ref().map(|t| self.type_of(t)).transpose()?;
                self.factory.enter_define(name, &params).map_err(|e| e.or_at(at.clone()))?;
                let body = self.expr(body)?;
                self.factory
                    .define(name, params, returns, body)
                    .map_err(|e| e.or_at(at))
            }
            StatementSyntax::TypeDef {
                name,
                supertype,
                components,
                mark,
            } => {
                let components = self.heading_of(components)?;
                let at = self.locate.at(*mark);
                let parent_at = supertype.as_ref().map(|(_, m)| self.locate.at(*m));
                self.factory
                    .type_def(name, supertype.as_ref().map(|(s, _)| s.as_str()), components)
                    .map_err(|e| match parent_at {
                        Some(parent_at) if e.code() == RQ0101 => e.or_at(parent_at),
                        _ => e.or_at(at),
                    })
            }
        }
    }

    fn expr(&mut self, expr: &Expr) -> FactoryResult<Node> {
        let at = self.locate.at(expr.mark);
        self.build(expr).map_err(|e| e.or_at(at))
    }

    fn build(&mut self, expr: &Expr) -> FactoryResult<Node> {
        match &expr.kind {
            ExprSyntax::Number(n) => Ok(self.factory.literal(*n)),
            ExprSyntax::Text(s) => Ok(self.factory.literal(s.as_str())),
            ExprSyntax::Bool(b) => Ok(self.factory.literal(*b)),
            ExprSyntax::Time(t) => Ok(self.factory.literal(Value::Time(*t))),
            ExprSyntax::Name(name) => self.factory.name(name),
            ExprSyntax::CurrentRow => self.factory.current_row(),
            ExprSyntax::Call { name, args } => {
                let args = self.exprs(args)?;
                self.factory.call(name, args)
            }
            ExprSyntax::Fold { op, arg } => {
                let arg = self.expr(arg)?;
                self.factory.fold(op, arg)
            }
            ExprSyntax::Infix { first, rest } => {
                let first = self.expr(first)?;
                let mut operands = Vec::with_capacity(rest.len());
                for (op, operand) in rest {
                    operands.push((op, self.expr(operand)?));
                }
                let locate = self.locate;
                let factory = &mut self.factory;
                climb(
                    first,
                    operands,
                    |op| AstFactory::precedence(&op.name),
                    |lhs, op, rhs| {
                        factory
                            .binary(&op.name, lhs, rhs)
                            .map_err(|e| e.or_at(locate.at(op.mark)))
                    },
                )
            }
            ExprSyntax::Not(arg) => {
                let arg = self.expr(arg)?;
                self.factory.not(arg)
            }
            ExprSyntax::Neg(arg) => {
                let arg = self.expr(arg)?;
                self.factory.negate(arg)
            }
            ExprSyntax::Member { base, name } => {
                let base = self.expr(base)?;
                self.factory.member(base, name)
            }
            ExprSyntax::Where { base, predicate } => {
                let base = self.expr(base)?;
                self.factory.enter_restrict(&base)?;
                let predicate = self.expr(predicate)?;
                self.factory.restrict(base, predicate)
            }
            ExprSyntax::Fields { .. } => self.field_chain(expr),
            ExprSyntax::Row(fields) => {
                let fields = self.bindings(fields)?;
                self.factory.row(fields)
            }
            ExprSyntax::Table(rows) => {
                let mut built = Vec::with_capacity(rows.len());
                for row in rows {
                    built.push(self.bindings(row)?);
                }
                self.factory.table(built)
            }
            ExprSyntax::EmptyTable(columns) => {
                let heading = self.heading_of(columns)?;
                Ok(self.factory.empty_table(heading))
            }
            ExprSyntax::Block { locals, body } => {
                let first = self.factory.enter_block();
                for (name, value) in locals {
                    let at = self.locate.at(value.mark);
                    self.factory.begin_local();
                    let value = self.expr(value)?;
                    self.factory.bind_local(name, value).map_err(|e| e.or_at(at))?;
                }
                let body = self.expr(body)?;
                self.factory.block(first, body)
            }
        }
    }

    fn exprs(&mut self, exprs: &[Expr]) -> FactoryResult<Vec<Node>> {
        exprs.iter().map(|e| self.expr(e)).collect()
    }

    fn bindings(&mut self, fields: &[(String, Expr)]) -> FactoryResult<Vec<(String, Node)>> {
        fields
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.expr(value)?)))
            .collect()
    }

    /// `base.{..}.{..}`: each list after the first continues in the fold
    /// scope of the previous one
    fn field_chain(&mut self, expr: &Expr) -> FactoryResult<Node> {
        let mut lists = Vec::new();
        let mut current = expr;
        while let ExprSyntax::Fields { base, list } = &current.kind {
            lists.push((list, current.mark));
            current = base;
        }
        lists.reverse();

        let mut node = self.expr(current)?;
        let last = lists.len().saturating_sub(1);
        for (i, (list, mark)) in lists.into_iter().enumerate() {
            let at = self.locate.at(mark);
            node = self
                .field_list(node, list, i > 0, i < last)
                .map_err(|e| e.or_at(at))?;
        }
        Ok(node)
    }

    fn field_list(&mut self, base: Node, list: &FieldList, chained: bool, keep_open: bool) -> FactoryResult<Node> {
        if chained {
            self.factory.chain_fields(&base, list.all_but)?;
        } else {
            self.factory.enter_fields(&base, list.all_but)?;
        }

        let mut order = Vec::with_capacity(list.order.len());
        for key in &list.order {
            let at = self.locate.at(key.mark);
            let segment = self
                .factory
                .order_key(&key.name, key.descending, key.grouped)
                .map_err(|e| e.or_at(at))?;
            order.push(segment);
        }

        let mut entries = Vec::with_capacity(list.fields.len());
        for field in &list.fields {
            match field {
                FieldSyntax::Name(name, _) => entries.push(FieldSpec::Project(name.clone())),
                FieldSyntax::Assign { name, value, mark } => {
                    if let ExprSyntax::Name(from) = &value.kind {
                        if self.factory.is_rename(from) {
                            entries.push(FieldSpec::Rename {
                                from: from.clone(),
                                to: name.clone(),
                            });
                            continue;
                        }
                    }
                    let at = self.locate.at(*mark);
                    self.factory.begin_field()?;
                    let value = self.expr(value)?;
                    let segment = self.factory.end_field(name, value).map_err(|e| e.or_at(at))?;
                    entries.push(FieldSpec::Extend(name.clone(), segment));
                }
            }
        }

        self.factory.finish_fields(base, order, entries, keep_open)
    }

    fn type_of(&self, ty: &TypeSyntax) -> FactoryResult<DataType> {
        match ty {
            TypeSyntax::Named(name, mark) => self
                .factory
                .named_type(name)
                .map_err(|e| e.or_at(self.locate.at(*mark))),
            TypeSyntax::Tuple(columns) => Ok(DataType::Tuple(self.heading_of(columns)?)),
            TypeSyntax::Relation(columns) => Ok(DataType::Relation(self.heading_of(columns)?)),
        }
    }

    fn heading_of(&self, columns: &[(String, TypeSyntax)]) -> FactoryResult<Heading> {
        let columns = columns
            .iter()
            .map(|(name, ty)| Ok((name.clone(), self.type_of(ty)?)))
            .collect::<FactoryResult<Vec<_>>>()?;
        self.factory.heading(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::grammar::parse_statement;
    use pretty_assertions::assert_eq;
    use relq_ast::{CallNode, TransformKind};
    use relq_diagnostics::{ErrorCode, RQ0103, RQ0110, RQ0111, RQ0112};
    use relq_types::Column;
    use rstest::rstest;

    fn catalog() -> MemoryCatalog {
        let mut catalog = MemoryCatalog::new();
        let heading = Heading::from_columns([
            Column::new("name", DataType::Text),
            Column::new("dept", DataType::Text),
            Column::new("salary", DataType::Number),
        ])
        .unwrap();
        catalog.add_variable("staff", DataType::Relation(heading)).unwrap();
        catalog
    }

    fn compile(text: &str) -> FactoryResult<Statement> {
        let mut ctx = CompileContext::new();
        let mut catalog = catalog();
        let syntax = parse_statement(text).unwrap();
        let result = Builder::new(&mut ctx, &mut catalog, Locator::new(text, 0, text.len())).statement(&syntax);
        if result.is_ok() {
            assert!(ctx.in_sync());
            assert_eq!(ctx.depth(), 0);
        }
        result
    }

    fn root(text: &str) -> Node {
        match compile(text).unwrap() {
            Statement::Expression(node) => node,
            other => panic!("not an expression: {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter() {
        let Node::Call(CallNode { call, args, .. }) = root("1 + 2 * 3") else {
            panic!("expected a call");
        };
        assert_eq!(call.name, "+");
        assert!(matches!(&args[1], Node::Call(c) if c.call.name == "*"));
    }

    #[test]
    fn grouped_aggregate() {
        let Node::Transform(t) = root("staff.{ dept, n := count(), top := max(salary) }") else {
            panic!("expected a transform");
        };
        assert_eq!(t.kind, TransformKind::Aggregating);
        assert_eq!(t.accums, 2);
        assert_eq!(t.fields.len(), 3);
    }

    #[test]
    fn chained_lists_restart_accumulators() {
        let Node::Transform(outer) = root("staff.{ dept, n := count() }.{ n, m := count() }") else {
            panic!("expected a transform");
        };
        assert_eq!(outer.accums, 1);
        assert!(matches!(&*outer.base, Node::Transform(inner) if inner.accums == 1));
    }

    #[test]
    fn all_but_rename() {
        let node = root("staff.{ *, who := name }");
        assert!(matches!(node, Node::Rename(r) if r.pairs == vec![("name".to_string(), "who".to_string())]));
    }

    #[test]
    fn restriction_reads_its_columns() {
        let Node::Restrict(r) = root("staff.where(salary > 10)") else {
            panic!("expected a restriction");
        };
        assert_eq!(r.predicate.lookup.names().collect::<Vec<_>>(), vec!["salary"]);
    }

    #[rstest]
    #[case("count()", RQ0110)]
    #[case("staff.where(count() > 1)", RQ0110)]
    #[case("ord()", RQ0111)]
    #[case("staff.where(salary)", RQ0103)]
    #[case("staff.{ nope }", RQ0112)]
    fn semantic_errors(#[case] text: &str, #[case] code: ErrorCode) {
        assert_eq!(compile(text).unwrap_err().code(), code);
    }

    #[test]
    fn error_points_at_operator() {
        let err = compile("1 + 'a'").unwrap_err();
        assert_eq!(err.location().map(|l| l.offset), Some(2));
        let err = compile("staff.{ n := nope }").unwrap_err();
        assert_eq!(err.location().map(|l| l.offset), Some(13));
    }
}
