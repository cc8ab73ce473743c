//! Typed node construction
//!
//! `AstFactory` is the only way nodes get built. Every operation resolves
//! names against the scope stack, then the catalog, then the builtins;
//! checks operand types; allocates accumulator slots; and keeps the scope
//! and fold stacks in step. Operations that open a scope come in pairs
//! (`enter_restrict`/`restrict`, `enter_fields`/`finish_fields`,
//! `begin_field`/`end_field`, `enter_block`/`block`, `begin_local`/`bind_local`,
//! `enter_define`/`define`); the builder calls them around the operands
//! they scope.
//!
//! Errors come back without a location. The builder attaches one.

use relq_ast::{
    AccessNode, Assignment, BlockFlags, BlockNode, CallNode, Definition, DeferredNode, FieldItem, FoldNode,
    LocalNode, Node, OrderNode, ProjectNode, RenameNode, RestrictNode, RowNode, Segment, SelectorNode, Statement,
    Strategy, TableNode, TransformNode, VarCallNode, VarSource, select_strategy,
};
use relq_diagnostics::{
    RQ0100, RQ0101, RQ0102, RQ0103, RQ0104, RQ0105, RQ0106, RQ0109, RQ0112, RQ0113, RQ0300, RelqError,
};
use relq_types::{
    AccumCounter, Builtins, CallInfo, CallKind, Column, CompileContext, DataType, FoldMode, Heading, Resolved,
    Symbol, SymbolKind, UserType, Value, check_type, type_match,
};

use crate::allbut::{self, Expanded, FieldSpec};
use crate::catalog::{Catalog, CatalogError};
use crate::error::{FactoryResult, IntoRelq, semantic};

/// A block binding and the enclosing columns its value reads
struct LocalSlot {
    name: String,
    value: Node,
    reads: Vec<(Column, usize)>,
}

/// An open field list
struct FieldFrame {
    base: DataType,
    all_but: bool,
}

pub struct AstFactory<'a> {
    ctx: &'a mut CompileContext,
    catalog: &'a mut dyn Catalog,
    /// Block bindings, indexed by their local slot
    locals: Vec<LocalSlot>,
    /// Fold counters saved by `begin_local`, innermost last
    pending: Vec<AccumCounter>,
    fields: Vec<FieldFrame>,
}

impl<'a> AstFactory<'a> {
    pub fn new(ctx: &'a mut CompileContext, catalog: &'a mut dyn Catalog) -> Self {
        Self {
            ctx,
            catalog,
            locals: Vec::new(),
            pending: Vec::new(),
            fields: Vec::new(),
        }
    }

    // === Leaves ===

    pub fn literal(&self, value: impl Into<Value>) -> Node {
        Node::literal(value)
    }

    /// A bare name used as a value
    pub fn name(&mut self, name: &str) -> FactoryResult<Node> {
        if let Some(symbol) = self.ctx.scopes.resolve(name) {
            return self.scoped(symbol);
        }
        if let Some(symbol) = self.catalog.find_ident(name) {
            return match symbol.kind {
                SymbolKind::Catalog => Ok(Node::variable(name, VarSource::Catalog, symbol.data_type)),
                SymbolKind::Deferred => Ok(Node::variable(name, VarSource::CatalogRef, DataType::Code)),
                kind => Err(semantic(RQ0113, format!("'{name}' is a {kind}, not a value"))),
            };
        }
        if Builtins::get().lookup(name).is_some() {
            return Err(semantic(RQ0113, format!("'{name}' is an operator, not a value")));
        }
        Err(semantic(RQ0100, format!("undefined identifier '{name}'")))
    }

    fn scoped(&mut self, symbol: Symbol) -> FactoryResult<Node> {
        let source = match symbol.kind {
            SymbolKind::Field => VarSource::Field,
            SymbolKind::Parameter => VarSource::Parameter,
            SymbolKind::Component => VarSource::Component,
            SymbolKind::Catalog => VarSource::Catalog,
            SymbolKind::Local(slot) => return self.local(&symbol.name, slot),
            kind => {
                return Err(semantic(
                    RQ0113,
                    format!("'{}' is a {kind}, not a value", symbol.name),
                ));
            }
        };
        Ok(Node::variable(symbol.name, source, symbol.data_type))
    }

    /// A use of a block binding
    ///
    /// The bound value is substituted. Its enclosing-column reads are
    /// recorded again where it is used, and its folds get fresh slots from
    /// the counter in force here, so every use is a fold site of its own.
    fn local(&mut self, name: &str, slot: usize) -> FactoryResult<Node> {
        let (mut value, reads) = match self.locals.get(slot) {
            Some(local) => (local.value.clone(), local.reads.clone()),
            None => return Err(RelqError::internal(RQ0300, format!("local '{name}' has no slot {slot}"))),
        };
        for (column, level) in &reads {
            self.ctx.scopes.record(column, *level);
        }
        self.relocate(&mut value)?;
        Ok(Node::Local(LocalNode {
            name: name.to_string(),
            value: Box::new(value),
        }))
    }

    /// Reallocate the fold sites of `node` in the current fold scope
    ///
    /// Segments keep their own counters and are left alone.
    fn relocate(&mut self, node: &mut Node) -> FactoryResult<()> {
        match node {
            Node::Literal(_) | Node::Variable(_) | Node::CurrentRow(_) | Node::Code(_) => Ok(()),
            Node::Local(local) => self.relocate(&mut local.value),
            Node::Block(block) => self.relocate(&mut block.body),
            Node::Call(call) => {
                self.relocate_all(&mut call.args)?;
                if call.call.windowed {
                    self.ctx.accums.mark_window(&call.call.name).map_err(IntoRelq::into_relq)?;
                }
                if call.accum_base.is_some() {
                    call.accum_base = self.allocate(&call.call)?;
                }
                Ok(())
            }
            Node::Deferred(call) => {
                self.relocate_all(&mut call.args)?;
                if call.accum_base.is_some() {
                    call.accum_base = self.allocate(&call.call)?;
                }
                Ok(())
            }
            Node::Fold(fold) => {
                self.relocate(&mut fold.arg)?;
                fold.base = self.ctx.accums.allocate("fold", 1).map_err(IntoRelq::into_relq)?;
                Ok(())
            }
            Node::VarCall(call) => self.relocate_all(&mut call.args),
            Node::Row(row) => self.relocate_all(&mut row.values),
            Node::Table(table) => self.relocate_all(&mut table.rows),
            Node::Selector(sel) => self.relocate_all(&mut sel.args),
            Node::Project(p) => self.relocate(&mut p.base),
            Node::Rename(r) => self.relocate(&mut r.base),
            Node::Transform(t) => self.relocate(&mut t.base),
            Node::Restrict(r) => self.relocate(&mut r.base),
            Node::Order(o) => self.relocate(&mut o.base),
            Node::Component(a) | Node::TupleField(a) => self.relocate(&mut a.base),
        }
    }

    fn relocate_all(&mut self, nodes: &mut [Node]) -> FactoryResult<()> {
        nodes.iter_mut().try_for_each(|n| self.relocate(n))
    }

    /// `@`, the row currently iterated
    pub fn current_row(&mut self) -> FactoryResult<Node> {
        let heading = self
            .ctx
            .scopes
            .current_heading()
            .cloned()
            .ok_or_else(|| semantic(RQ0100, "'@' used outside of a row context"))?;
        for column in heading.names() {
            self.ctx.scopes.resolve(column);
        }
        Ok(Node::CurrentRow(DataType::Tuple(heading)))
    }

    // === Calls ===

    /// A named call: builtin, user function or type selector
    pub fn call(&mut self, name: &str, args: Vec<Node>) -> FactoryResult<Node> {
        let actuals: Vec<DataType> = args.iter().map(Node::data_type).collect();

        if let Some(builtin) = Builtins::get().lookup(name) {
            let Resolved { data_type, call } = check_type(builtin, &actuals).map_err(IntoRelq::into_relq)?;
            return self.builtin(call, args, data_type);
        }

        match self.catalog.find_ident(name) {
            Some(symbol) if symbol.kind == SymbolKind::Deferred => {
                let Resolved { data_type, call } = check_type(&symbol, &actuals).map_err(IntoRelq::into_relq)?;
                let accum_base = self.allocate(&call)?;
                Ok(Node::Deferred(DeferredNode {
                    call,
                    args,
                    data_type,
                    accum_base,
                }))
            }
            Some(symbol) if symbol.kind == SymbolKind::UserType => match symbol.data_type {
                DataType::User(user) => self.selector(*user, args),
                _ => Err(RelqError::internal(RQ0300, format!("type '{name}' has no components"))),
            },
            Some(_) => Err(semantic(RQ0113, format!("'{name}' is not callable"))),
            None if self.ctx.scopes.find_any(name).is_some() => {
                Err(semantic(RQ0113, format!("'{name}' is not callable")))
            }
            None => Err(semantic(RQ0100, format!("undefined function '{name}'"))),
        }
    }

    fn builtin(&mut self, call: CallInfo, args: Vec<Node>, data_type: DataType) -> FactoryResult<Node> {
        match call.kind {
            CallKind::Fold => Err(semantic(RQ0104, "'fold' takes an operator: fold(op, expr)")),
            CallKind::Variadic | CallKind::VariadicTable => Ok(Node::VarCall(VarCallNode {
                call,
                args,
                data_type,
            })),
            CallKind::Fixed | CallKind::Deferred => {
                if call.windowed {
                    self.ctx.accums.mark_window(&call.name).map_err(IntoRelq::into_relq)?;
                }
                let accum_base = self.allocate(&call)?;
                Ok(Node::Call(CallNode {
                    call,
                    args,
                    data_type,
                    accum_base,
                }))
            }
        }
    }

    fn allocate(&mut self, call: &CallInfo) -> FactoryResult<Option<usize>> {
        if call.accum_count == 0 {
            return Ok(None);
        }
        self.ctx
            .accums
            .allocate(&call.name, call.accum_count)
            .map(Some)
            .map_err(IntoRelq::into_relq)
    }

    /// `type_name(args)`, one argument per component
    fn selector(&mut self, user: UserType, args: Vec<Node>) -> FactoryResult<Node> {
        if args.len() != user.heading.degree() {
            return Err(semantic(
                RQ0104,
                format!(
                    "'{}' expected {} arguments, found {}",
                    user.name,
                    user.heading.degree(),
                    args.len()
                ),
            ));
        }
        for (column, arg) in user.heading.iter().zip(&args) {
            let actual = arg.data_type();
            if !type_match(&column.data_type, &actual) {
                return Err(semantic(
                    RQ0103,
                    format!("component '{}' of '{}' is {}, found {actual}", column.name, user.name, column.data_type),
                ));
            }
        }
        Ok(Node::Selector(SelectorNode { user, args }))
    }

    pub fn not(&mut self, arg: Node) -> FactoryResult<Node> {
        self.call("not", vec![arg])
    }

    /// Unary minus; folded into number literals
    pub fn negate(&mut self, arg: Node) -> FactoryResult<Node> {
        if let Node::Literal(Value::Number(n)) = arg {
            return Ok(Node::Literal(Value::Number(-n)));
        }
        self.call("neg", vec![arg])
    }

    /// One reduced step of an infix chain
    pub fn binary(&mut self, op: &str, lhs: Node, rhs: Node) -> FactoryResult<Node> {
        if Builtins::get().precedence(op).is_none() {
            return Err(RelqError::internal(RQ0300, format!("'{op}' is not an infix operator")));
        }
        self.call(op, vec![lhs, rhs])
    }

    /// Infix precedence as the grammar sees it
    pub fn precedence(op: &str) -> u8 {
        Builtins::get().precedence(op).unwrap_or(0)
    }

    /// `fold(op, arg)` over the enclosing group
    pub fn fold(&mut self, op: &str, arg: Node) -> FactoryResult<Node> {
        let symbol = Builtins::get()
            .lookup(op)
            .filter(|s| s.foldable)
            .ok_or_else(|| semantic(RQ0103, format!("'{op}' cannot be folded")))?;
        let element = arg.data_type();
        let Resolved { data_type, .. } =
            check_type(symbol, &[element.clone(), element]).map_err(IntoRelq::into_relq)?;
        let base = self.ctx.accums.allocate("fold", 1).map_err(IntoRelq::into_relq)?;
        Ok(Node::Fold(FoldNode {
            op: op.to_string(),
            base,
            arg: Box::new(arg),
            data_type,
        }))
    }

    // === Accessors ===

    /// `base.name` on a tuple or user type value
    pub fn member(&mut self, base: Node, name: &str) -> FactoryResult<Node> {
        let base_type = base.data_type();
        let (heading, component) = match &base_type {
            DataType::Tuple(h) => (h, false),
            DataType::User(u) => (&u.heading, true),
            other => return Err(semantic(RQ0103, format!("{other} has no components, cannot read '{name}'"))),
        };
        let data_type = heading
            .get(name)
            .map(|c| c.data_type.clone())
            .ok_or_else(|| semantic(RQ0112, format!("unknown column '{name}' in {base_type}")))?;
        let access = AccessNode {
            base: Box::new(base),
            name: name.to_string(),
            data_type,
        };
        Ok(if component {
            Node::Component(access)
        } else {
            Node::TupleField(access)
        })
    }

    // === Restriction ===

    pub fn enter_restrict(&mut self, base: &Node) -> FactoryResult<()> {
        let base_type = base.data_type();
        if !base_type.is_relation() {
            return Err(semantic(RQ0103, format!("'where' needs a relation, found {base_type}")));
        }
        self.ctx.push(Some(&base_type), FoldMode::Disabled);
        Ok(())
    }

    pub fn restrict(&mut self, base: Node, predicate: Node) -> FactoryResult<Node> {
        let captured = self.ctx.pop().map_err(IntoRelq::into_relq)?;
        let predicate_type = predicate.data_type();
        if predicate_type != DataType::Bool {
            return Err(semantic(
                RQ0103,
                format!("'where' predicate must be bool, found {predicate_type}"),
            ));
        }
        if let Some(symbol) = Builtins::get().lookup("restrict") {
            check_type(symbol, &[base.data_type(), DataType::Code]).map_err(IntoRelq::into_relq)?;
        }
        let counter = captured.counter.unwrap_or_default();
        let segment = Segment::new(
            "where",
            predicate,
            captured.lookup().clone(),
            counter.total,
            counter.has_window,
        );
        Ok(Node::Restrict(RestrictNode {
            base: Box::new(base),
            predicate: segment,
        }))
    }

    // === Field lists ===

    /// Open `base.{ ... }`
    pub fn enter_fields(&mut self, base: &Node, all_but: bool) -> FactoryResult<()> {
        let base_type = Self::field_base(base)?;
        self.ctx.push(Some(&base_type), FoldMode::Enabled);
        self.fields.push(FieldFrame {
            base: base_type,
            all_but,
        });
        Ok(())
    }

    /// Open the next list of a `.{ }.{ }` chain in the scope of the previous one
    pub fn chain_fields(&mut self, base: &Node, all_but: bool) -> FactoryResult<()> {
        let base_type = Self::field_base(base)?;
        self.fields.push(FieldFrame {
            base: base_type,
            all_but,
        });
        Ok(())
    }

    fn field_base(base: &Node) -> FactoryResult<DataType> {
        let base_type = base.data_type();
        if base_type.heading().is_none() {
            return Err(semantic(RQ0103, format!("field list needs a tuple or relation, found {base_type}")));
        }
        Ok(base_type)
    }

    fn frame(&self) -> FactoryResult<&FieldFrame> {
        self.fields
            .last()
            .ok_or_else(|| RelqError::internal(RQ0300, "no open field list"))
    }

    /// `$(...)` key; must name a base column
    pub fn order_key(&mut self, name: &str, descending: bool, grouped: bool) -> FactoryResult<Segment> {
        let symbol = self
            .ctx
            .scopes
            .resolve(name)
            .filter(|s| matches!(s.kind, SymbolKind::Field | SymbolKind::Component))
            .ok_or_else(|| semantic(RQ0112, format!("unknown ordering column '{name}'")))?;
        let mut flags = BlockFlags::ORDER;
        if descending {
            flags = flags.with(BlockFlags::DESC);
        }
        if grouped {
            flags = flags.with(BlockFlags::GROUPED);
        }
        Ok(field_load(name, VarSource::Field, symbol.data_type).with_flags(flags))
    }

    /// Whether `name := value` is a rename: only inside an all-but list,
    /// and only when the value is a bare base column
    pub fn is_rename(&self, value_name: &str) -> bool {
        self.frame().is_ok_and(|f| {
            f.all_but && f.base.heading().is_some_and(|h| h.contains(value_name))
        })
    }

    /// Start computing one field
    pub fn begin_field(&mut self) -> FactoryResult<()> {
        let base = self.frame()?.base.clone();
        self.ctx.push(Some(&base), FoldMode::Inherit);
        self.ctx.accums.reset_field();
        Ok(())
    }

    /// Close a computed field, capturing what it read and folded
    pub fn end_field(&mut self, name: &str, value: Node) -> FactoryResult<Segment> {
        let counter = self.ctx.accums.counter();
        let captured = self.ctx.pop().map_err(IntoRelq::into_relq)?;
        Ok(Segment::new(
            name,
            value,
            captured.lookup().clone(),
            counter.segments,
            counter.has_window,
        ))
    }

    /// Close `base.{ ... }`
    ///
    /// With `keep_open` the fold scope is re-entered for the result type
    /// instead of popped, so a following list can continue in it.
    pub fn finish_fields(
        &mut self,
        base: Node,
        order: Vec<Segment>,
        entries: Vec<FieldSpec<Segment>>,
        keep_open: bool,
    ) -> FactoryResult<Node> {
        let frame = self
            .fields
            .pop()
            .ok_or_else(|| RelqError::internal(RQ0300, "no open field list"))?;
        let heading = frame.base.heading().cloned().unwrap_or_default();

        let items = if frame.all_but {
            expand_all_but(&heading, entries)?
        } else {
            entries.into_iter().map(FieldItem::from).collect()
        };

        let mut output = Heading::new();
        for item in &items {
            let data_type = match item {
                FieldItem::Project(name) | FieldItem::Rename { from: name, .. } => heading
                    .get(name)
                    .map(|c| c.data_type.clone())
                    .ok_or_else(|| semantic(RQ0112, format!("unknown column '{name}'")))?,
                FieldItem::Extend(segment) => segment.result_type(),
            };
            output
                .push(Column::new(item.output_name(), data_type))
                .map_err(IntoRelq::into_relq)?;
        }
        let result_type = match &frame.base {
            DataType::Relation(_) => DataType::Relation(output.clone()),
            _ => DataType::Tuple(output.clone()),
        };

        let counter = self.close_fields(keep_open, &result_type)?;

        if items.is_empty() && !order.is_empty() {
            return Ok(Node::Order(OrderNode {
                base: Box::new(base),
                keys: order,
            }));
        }

        let strategy = select_strategy(&items, !order.is_empty(), heading.degree());
        Ok(match strategy {
            Strategy::Projection => Node::Project(ProjectNode {
                base: Box::new(base),
                heading: output,
                data_type: result_type,
            }),
            Strategy::Rename => Node::Rename(RenameNode {
                base: Box::new(base),
                pairs: items
                    .into_iter()
                    .filter_map(|item| match item {
                        FieldItem::Rename { from, to } => Some((from, to)),
                        _ => None,
                    })
                    .collect(),
                data_type: result_type,
            }),
            Strategy::Transform(kind) => Node::Transform(TransformNode {
                base: Box::new(base),
                kind,
                order,
                fields: items
                    .into_iter()
                    .map(|item| match item {
                        FieldItem::Project(name) => {
                            let data_type = column_type(&heading, &name);
                            field_load(&name, VarSource::Field, data_type)
                        }
                        FieldItem::Rename { from, to } => {
                            let data_type = column_type(&heading, &from);
                            let mut segment = field_load(&from, VarSource::Field, data_type);
                            segment.name = to;
                            segment
                        }
                        FieldItem::Extend(segment) => segment,
                    })
                    .collect(),
                accums: counter.total,
                data_type: result_type,
            }),
        })
    }

    fn close_fields(&mut self, keep_open: bool, result_type: &DataType) -> FactoryResult<AccumCounter> {
        if keep_open {
            let counter = self.ctx.accums.counter();
            self.ctx.reenter(Some(result_type)).map_err(IntoRelq::into_relq)?;
            return Ok(counter);
        }
        let captured = self.ctx.pop().map_err(IntoRelq::into_relq)?;
        Ok(captured.counter.unwrap_or_default())
    }

    // === Constructors ===

    /// `{ a := x, ... }`
    pub fn row(&mut self, fields: Vec<(String, Node)>) -> FactoryResult<Node> {
        let mut heading = Heading::new();
        let mut values = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            heading
                .push(Column::new(name, value.data_type()))
                .map_err(IntoRelq::into_relq)?;
            values.push(value);
        }
        Ok(Node::Row(RowNode { heading, values }))
    }

    /// `{ {..}, {..} }`; every row must have the first row's heading
    pub fn table(&mut self, rows: Vec<Vec<(String, Node)>>) -> FactoryResult<Node> {
        let mut built = Vec::with_capacity(rows.len());
        let mut heading: Option<Heading> = None;
        for fields in rows {
            let Node::Row(row) = self.row(fields)? else {
                return Err(RelqError::internal(RQ0300, "row constructor built a non-row"));
            };
            let row = match &heading {
                None => {
                    heading = Some(row.heading.clone());
                    row
                }
                Some(first) if *first == row.heading => reorder(row, first),
                Some(first) => {
                    return Err(semantic(
                        RQ0106,
                        format!("table rows differ: {first} vs {}", row.heading),
                    ));
                }
            };
            built.push(Node::Row(row));
        }
        Ok(Node::Table(TableNode {
            heading: heading.unwrap_or_default(),
            rows: built,
        }))
    }

    /// `{ {a: number, ...} }`
    pub fn empty_table(&self, heading: Heading) -> Node {
        Node::Table(TableNode {
            heading,
            rows: Vec::new(),
        })
    }

    // === Blocks ===

    /// Open `do { ... }`; returns the first slot it may bind
    pub fn enter_block(&mut self) -> usize {
        self.ctx.push(None, FoldMode::Inherit);
        self.locals.len()
    }

    /// Start the value of a block binding
    pub fn begin_local(&mut self) {
        self.ctx.scopes.track_reads();
        self.pending.push(self.ctx.accums.counter());
    }

    /// Bind the value started by `begin_local`
    ///
    /// Folds in the value were only checked here; they are allocated at
    /// each use.
    pub fn bind_local(&mut self, name: &str, value: Node) -> FactoryResult<()> {
        let level = self.ctx.scopes.level();
        let reads = self
            .ctx
            .scopes
            .take_reads()
            .into_iter()
            .filter(|(_, at)| *at <= level)
            .collect();
        if let Some(saved) = self.pending.pop() {
            self.ctx.accums.restore(saved);
        }
        let slot = self.locals.len();
        self.ctx
            .scopes
            .add(Symbol::new(name, SymbolKind::Local(slot), value.data_type()))
            .map_err(IntoRelq::into_relq)?;
        self.locals.push(LocalSlot {
            name: name.to_string(),
            value,
            reads,
        });
        Ok(())
    }

    pub fn block(&mut self, first_slot: usize, body: Node) -> FactoryResult<Node> {
        self.ctx.pop().map_err(IntoRelq::into_relq)?;
        let locals = self
            .locals
            .split_off(first_slot.min(self.locals.len()))
            .into_iter()
            .map(|local| (local.name, local.value))
            .collect();
        Ok(Node::Block(BlockNode {
            locals,
            body: Box::new(body),
        }))
    }

    // === Types ===

    /// A scalar or user type by name
    pub fn named_type(&self, name: &str) -> FactoryResult<DataType> {
        if let Some(scalar) = DataType::from_name(name) {
            return Ok(scalar);
        }
        match self.catalog.find_ident(name) {
            Some(symbol) if symbol.kind == SymbolKind::UserType => Ok(symbol.data_type),
            _ => Err(semantic(RQ0101, format!("undefined type '{name}'"))),
        }
    }

    pub fn heading(&self, columns: Vec<(String, DataType)>) -> FactoryResult<Heading> {
        Heading::from_columns(columns.into_iter().map(|(n, t)| Column::new(n, t))).map_err(IntoRelq::into_relq)
    }

    // === Statements ===

    pub fn expression(&self, node: Node) -> Statement {
        Statement::Expression(node)
    }

    /// `name := value`
    ///
    /// Only checked here. The driver binds the variable once the statement
    /// has compiled.
    pub fn assign(&mut self, name: &str, value: Node) -> FactoryResult<Statement> {
        let data_type = value.data_type();
        if Builtins::get().lookup(name).is_some() {
            return Err(semantic(RQ0109, format!("cannot assign to operator '{name}'")));
        }
        match self.catalog.find_ident(name) {
            Some(existing) if existing.kind == SymbolKind::Catalog => {
                if existing.data_type != data_type {
                    return Err(semantic(
                        RQ0109,
                        format!("'{name}' is {}, cannot assign {data_type}", existing.data_type),
                    ));
                }
            }
            Some(existing) => {
                return Err(CatalogError::KindConflict {
                    name: existing.name,
                    kind: existing.kind,
                }
                .into_relq());
            }
            None => {}
        }
        Ok(Statement::Assign(Assignment {
            name: name.to_string(),
            value,
        }))
    }

    /// Open a function body over its parameters
    pub fn enter_define(&mut self, name: &str, params: &Heading) -> FactoryResult<()> {
        if Builtins::get().lookup(name).is_some() {
            return Err(semantic(RQ0102, format!("cannot redefine builtin '{name}'")));
        }
        self.ctx.push_parameters(params);
        Ok(())
    }

    /// `def name(params) [: returns] => body`
    pub fn define(
        &mut self,
        name: &str,
        params: Heading,
        returns: Option<DataType>,
        body: Node,
    ) -> FactoryResult<Statement> {
        let captured = self.ctx.pop().map_err(IntoRelq::into_relq)?;
        let body_type = body.data_type();
        let return_type = match returns {
            Some(declared) if !type_match(&declared, &body_type) => {
                return Err(semantic(
                    RQ0103,
                    format!("body of '{name}' is {body_type}, declared {declared}"),
                ));
            }
            Some(declared) => declared,
            None => body_type,
        };
        let counter = captured.counter.unwrap_or_default();
        let mut call = CallInfo::new(name, return_type, CallKind::Deferred)
            .with_args(params.iter().cloned())
            .accums(counter.total);
        if counter.has_window {
            call = call.windowed();
        }
        let body = Segment::new(
            name,
            body,
            captured.lookup().clone(),
            counter.total,
            counter.has_window,
        );
        Ok(Statement::Define(Definition {
            name: name.to_string(),
            call,
            body,
        }))
    }

    /// `type name [: supertype] (components)`
    ///
    /// A subtype starts with its supertype's components.
    pub fn type_def(
        &mut self,
        name: &str,
        supertype: Option<&str>,
        components: Heading,
    ) -> FactoryResult<Statement> {
        if DataType::from_name(name).is_some() || Builtins::get().lookup(name).is_some() {
            return Err(semantic(RQ0102, format!("'{name}' is already defined")));
        }
        let (mut heading, parent) = match supertype {
            None => (Heading::new(), None),
            Some(parent) => match self.catalog.find_ident(parent) {
                Some(symbol) if symbol.kind == SymbolKind::UserType => {
                    let inherited = symbol.data_type.heading().cloned().unwrap_or_default();
                    (inherited, Some(symbol.data_type))
                }
                _ => return Err(semantic(RQ0101, format!("undefined type '{parent}'"))),
            },
        };
        for column in components.iter() {
            heading.push(column.clone()).map_err(|_| {
                semantic(RQ0105, format!("duplicate component '{}' in '{name}'", column.name))
            })?;
        }
        let mut user = UserType::new(name, heading);
        if let Some(parent) = parent {
            user = user.with_supertype(parent);
        }
        Ok(Statement::TypeDef(user))
    }
}

impl From<FieldSpec<Segment>> for FieldItem {
    fn from(spec: FieldSpec<Segment>) -> Self {
        match spec {
            FieldSpec::Project(name) => FieldItem::Project(name),
            FieldSpec::Rename { from, to } => FieldItem::Rename { from, to },
            FieldSpec::Extend(_, segment) => FieldItem::Extend(segment),
        }
    }
}

fn expand_all_but(heading: &Heading, entries: Vec<FieldSpec<Segment>>) -> FactoryResult<Vec<FieldItem>> {
    let expanded = allbut::expand(heading, entries).map_err(IntoRelq::into_relq)?;
    Ok(expanded
        .into_iter()
        .filter_map(|entry| match entry {
            Expanded::Drop(_) => None,
            Expanded::Keep(name) => Some(FieldItem::Project(name)),
            Expanded::Rename { from, to } => Some(FieldItem::Rename { from, to }),
            Expanded::Extend(_, segment) => Some(FieldItem::Extend(segment)),
        })
        .collect())
}

fn column_type(heading: &Heading, name: &str) -> DataType {
    heading
        .get(name)
        .map(|c| c.data_type.clone())
        .unwrap_or(DataType::Unknown)
}

/// A segment that loads one column of the enclosing row
fn field_load(name: &str, source: VarSource, data_type: DataType) -> Segment {
    let lookup = Heading::new().with(Column::new(name, data_type.clone())).unwrap_or_default();
    Segment::new(name, Node::variable(name, source, data_type), lookup, 0, false)
}

/// Put a row's values in the order of `heading`
fn reorder(mut row: RowNode, heading: &Heading) -> RowNode {
    let mut pairs: Vec<(String, Node)> = row
        .heading
        .names()
        .map(str::to_string)
        .zip(std::mem::take(&mut row.values))
        .collect();
    let mut values = Vec::with_capacity(pairs.len());
    for name in heading.names() {
        if let Some(at) = pairs.iter().position(|(n, _)| n == name) {
            values.push(pairs.swap_remove(at).1);
        }
    }
    RowNode {
        heading: heading.clone(),
        values,
    }
}
