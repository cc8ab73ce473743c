//! Untyped parse tree
//!
//! What the reference grammar recognises, before any name is resolved.
//! Positions are kept as the length of the input remaining at the start of
//! a construct; `Mark::offset` turns that into a byte offset.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// Start of a construct, as remaining input length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(pub(crate) usize);

impl Mark {
    /// Byte offset into a statement of `total` bytes
    pub fn offset(self, total: usize) -> usize {
        total.saturating_sub(self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprSyntax,
    pub mark: Mark,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprSyntax {
    Number(Decimal),
    Text(String),
    Bool(bool),
    Time(NaiveDateTime),
    Name(String),
    /// `@`
    CurrentRow,
    Call { name: String, args: Vec<Expr> },
    /// `fold(op, expr)`
    Fold { op: String, arg: Box<Expr> },
    /// `first op x op x ...`, ungrouped
    Infix { first: Box<Expr>, rest: Vec<(InfixOp, Expr)> },
    Not(Box<Expr>),
    Neg(Box<Expr>),
    /// `base.name`
    Member { base: Box<Expr>, name: String },
    /// `base.where(predicate)`
    Where { base: Box<Expr>, predicate: Box<Expr> },
    /// `base.{ ... }`
    Fields { base: Box<Expr>, list: FieldList },
    /// `{ a := x, ... }`
    Row(Vec<(String, Expr)>),
    /// `{ {a := x}, {a := y} }`
    Table(Vec<Vec<(String, Expr)>>),
    /// `{ {a: number, ...} }`
    EmptyTable(Vec<(String, TypeSyntax)>),
    /// `do { x := e; ...; body }`
    Block { locals: Vec<(String, Expr)>, body: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfixOp {
    pub name: String,
    pub mark: Mark,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldList {
    /// Leading `*` or `allbut`
    pub all_but: bool,
    pub order: Vec<OrderKey>,
    pub fields: Vec<FieldSyntax>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub name: String,
    pub descending: bool,
    /// `%`: grouping key of a windowed transform
    pub grouped: bool,
    pub mark: Mark,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldSyntax {
    /// `name`
    Name(String, Mark),
    /// `name := expr`
    Assign { name: String, value: Expr, mark: Mark },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSyntax {
    /// A builtin scalar or a user type name
    Named(String, Mark),
    Tuple(Vec<(String, TypeSyntax)>),
    Relation(Vec<(String, TypeSyntax)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementSyntax {
    /// `type name [: super] (params)`
    TypeDef {
        name: String,
        supertype: Option<(String, Mark)>,
        components: Vec<(String, TypeSyntax)>,
        mark: Mark,
    },
    /// `def name(params) [: type] => body`
    Define {
        name: String,
        params: Vec<(String, TypeSyntax)>,
        returns: Option<TypeSyntax>,
        body: Expr,
        mark: Mark,
    },
    /// `name := value`
    Assign { name: String, value: Expr, mark: Mark },
    Expr(Expr),
}
