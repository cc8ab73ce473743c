//! Typed expression nodes
//!
//! Every node owns its children and knows its result type. Nodes are
//! immutable once the factory has built them.

use crate::TransformKind;
use relq_bytecode::{BlockFlags, ExprKind};
use relq_types::{CallInfo, DataType, Heading, UserType, Value};

/// All relq expression shapes
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // === Leaves ===
    /// Literal value
    Literal(Value),
    /// Named value
    Variable(Variable),
    /// The row under evaluation (`@`)
    CurrentRow(DataType),

    // === Blocks ===
    /// Reference to a block binding, emitted inline
    Local(LocalNode),
    /// `do { ... }` block
    Block(BlockNode),

    // === Calls ===
    /// Builtin call with a fixed argument count
    Call(CallNode),
    /// Builtin call with a variable argument count
    VarCall(VarCallNode),
    /// Call of a user defined function
    Deferred(DeferredNode),
    /// `fold(op, expr)`
    Fold(FoldNode),

    // === Constructors ===
    Row(RowNode),
    Table(TableNode),
    /// Value of a user type built from its components
    Selector(SelectorNode),

    // === Relational postfix ===
    Project(ProjectNode),
    Rename(RenameNode),
    Transform(TransformNode),
    Restrict(RestrictNode),
    Order(OrderNode),

    /// A code segment passed as a value
    Code(Segment),

    // === Accessors ===
    /// Component of a user type value
    Component(AccessNode),
    /// Field of a tuple value
    TupleField(AccessNode),
}

/// Where a variable is loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarSource {
    /// Catalog variable, by value
    Catalog,
    /// Catalog entry, by reference
    CatalogRef,
    /// Column of the lookup row
    Field,
    /// Parameter of the function being defined
    Parameter,
    /// Component of the user type value being transformed
    Component,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub source: VarSource,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalNode {
    pub name: String,
    pub value: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    /// Bindings in definition order; referenced through `Node::Local`
    pub locals: Vec<(String, Node)>,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallNode {
    pub call: CallInfo,
    pub args: Vec<Node>,
    pub data_type: DataType,
    /// First accumulator slot, for calls that fold
    pub accum_base: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarCallNode {
    pub call: CallInfo,
    /// Fixed arguments first, then the variable ones
    pub args: Vec<Node>,
    pub data_type: DataType,
}

impl VarCallNode {
    pub fn fixed(&self) -> usize {
        self.call.arity()
    }

    pub fn var(&self) -> usize {
        self.args.len().saturating_sub(self.call.arity())
    }

    pub fn returns_table(&self) -> bool {
        self.data_type.is_relation()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeferredNode {
    pub call: CallInfo,
    pub args: Vec<Node>,
    pub data_type: DataType,
    pub accum_base: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoldNode {
    /// The infix operator folded over the rows
    pub op: String,
    pub base: usize,
    pub arg: Box<Node>,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowNode {
    pub heading: Heading,
    /// One value per column, in heading order
    pub values: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableNode {
    pub heading: Heading,
    /// Row nodes sharing `heading`
    pub rows: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorNode {
    pub user: UserType,
    pub args: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectNode {
    pub base: Box<Node>,
    pub heading: Heading,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenameNode {
    pub base: Box<Node>,
    /// (old, new) pairs
    pub pairs: Vec<(String, String)>,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformNode {
    pub base: Box<Node>,
    pub kind: TransformKind,
    /// Ordering keys, flagged `ORDER`
    pub order: Vec<Segment>,
    pub fields: Vec<Segment>,
    /// Accumulator slots used by all fields together
    pub accums: usize,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestrictNode {
    pub base: Box<Node>,
    pub predicate: Segment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderNode {
    pub base: Box<Node>,
    pub keys: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessNode {
    pub base: Box<Node>,
    pub name: String,
    pub data_type: DataType,
}

/// An independently invokable piece of code
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub kind: ExprKind,
    pub accums: usize,
    pub flags: BlockFlags,
    /// Columns of the enclosing row the body reads
    pub lookup: Heading,
    pub body: Box<Node>,
}

impl Segment {
    pub fn new(name: impl Into<String>, body: Node, lookup: Heading, accums: usize, has_window: bool) -> Self {
        Self {
            name: name.into(),
            kind: ExprKind::classify(&lookup, accums, has_window),
            accums,
            flags: BlockFlags::NONE,
            lookup,
            body: Box::new(body),
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: BlockFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Type of the value the body computes
    pub fn result_type(&self) -> DataType {
        self.body.data_type()
    }
}

impl Node {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn variable(name: impl Into<String>, source: VarSource, data_type: DataType) -> Self {
        Self::Variable(Variable {
            name: name.into(),
            source,
            data_type,
        })
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Self::Literal(v) => v.data_type(),
            Self::Variable(v) => v.data_type.clone(),
            Self::CurrentRow(t) => t.clone(),
            Self::Local(l) => l.value.data_type(),
            Self::Block(b) => b.body.data_type(),
            Self::Call(c) => c.data_type.clone(),
            Self::VarCall(c) => c.data_type.clone(),
            Self::Deferred(c) => c.data_type.clone(),
            Self::Fold(f) => f.data_type.clone(),
            Self::Row(r) => DataType::Tuple(r.heading.clone()),
            Self::Table(t) => DataType::Relation(t.heading.clone()),
            Self::Selector(s) => DataType::user(s.user.clone()),
            Self::Project(p) => p.data_type.clone(),
            Self::Rename(r) => r.data_type.clone(),
            Self::Transform(t) => t.data_type.clone(),
            Self::Restrict(r) => r.base.data_type(),
            Self::Order(o) => o.base.data_type(),
            Self::Code(_) => DataType::Code,
            Self::Component(a) | Self::TupleField(a) => a.data_type.clone(),
        }
    }

    /// Direct children, segment bodies included
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Self::Literal(_) | Self::Variable(_) | Self::CurrentRow(_) => Vec::new(),
            Self::Local(l) => vec![&*l.value],
            Self::Block(b) => b.locals.iter().map(|(_, n)| n).chain([&*b.body]).collect(),
            Self::Call(c) => c.args.iter().collect(),
            Self::VarCall(c) => c.args.iter().collect(),
            Self::Deferred(c) => c.args.iter().collect(),
            Self::Fold(f) => vec![&*f.arg],
            Self::Row(r) => r.values.iter().collect(),
            Self::Table(t) => t.rows.iter().collect(),
            Self::Selector(s) => s.args.iter().collect(),
            Self::Project(p) => vec![&*p.base],
            Self::Rename(r) => vec![&*r.base],
            Self::Transform(t) => std::iter::once(&*t.base)
                .chain(t.order.iter().chain(&t.fields).map(|s| &*s.body))
                .collect(),
            Self::Restrict(r) => vec![&*r.base, &*r.predicate.body],
            Self::Order(o) => std::iter::once(&*o.base)
                .chain(o.keys.iter().map(|s| &*s.body))
                .collect(),
            Self::Code(s) => vec![&*s.body],
            Self::Component(a) | Self::TupleField(a) => vec![&*a.base],
        }
    }

    /// Short name of the node shape, for diagnostics
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Literal(_) => "literal",
            Self::Variable(_) => "variable",
            Self::CurrentRow(_) => "current row",
            Self::Local(_) => "local",
            Self::Block(_) => "block",
            Self::Call(_) => "call",
            Self::VarCall(_) => "variadic call",
            Self::Deferred(_) => "function call",
            Self::Fold(_) => "fold",
            Self::Row(_) => "row",
            Self::Table(_) => "table",
            Self::Selector(_) => "selector",
            Self::Project(_) => "projection",
            Self::Rename(_) => "rename",
            Self::Transform(_) => "transform",
            Self::Restrict(_) => "restriction",
            Self::Order(_) => "ordering",
            Self::Code(_) => "code",
            Self::Component(_) => "component",
            Self::TupleField(_) => "tuple field",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relq_types::Column;

    fn heading() -> Heading {
        Heading::from_columns([Column::new("a", DataType::Number)]).unwrap()
    }

    #[test]
    fn segment_classification() {
        let field = Node::variable("a", VarSource::Field, DataType::Number);
        assert_eq!(Segment::new("x", field.clone(), heading(), 0, false).kind, ExprKind::Open);
        assert_eq!(Segment::new("x", Node::literal(1), Heading::new(), 0, false).kind, ExprKind::Closed);
        assert_eq!(Segment::new("x", field, heading(), 1, false).kind, ExprKind::HasFold);
    }

    #[test]
    fn derived_types() {
        let row = Node::Row(RowNode {
            heading: heading(),
            values: vec![Node::literal(1)],
        });
        assert_eq!(row.data_type(), DataType::Tuple(heading()));

        let restrict = Node::Restrict(RestrictNode {
            base: Box::new(Node::variable("r", VarSource::Catalog, DataType::Relation(heading()))),
            predicate: Segment::new("where", Node::literal(true), Heading::new(), 0, false),
        });
        assert_eq!(restrict.data_type(), DataType::Relation(heading()));
        assert_eq!(restrict.children().len(), 2);
    }
}
