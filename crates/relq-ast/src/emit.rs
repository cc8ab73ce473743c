//! Lowering to bytecode
//!
//! Post-order: children first, then the instruction consuming them. Every
//! load pushes one value and every call pops its arguments and pushes its
//! result. Calls that fold receive the accumulator block and their base slot
//! as two leading arguments.

use crate::{AstResult, Node, Segment, Statement, VarSource};
use relq_bytecode::{ByteCode, Emitter, ExprBlock};
use relq_types::{Heading, Value};

/// Lower a whole statement, terminated by `End`
pub fn emit_statement(statement: &Statement) -> AstResult<ByteCode> {
    let mut e = Emitter::new();
    match statement {
        Statement::Expression(node) => emit_node(node, &mut e)?,
        Statement::Assign(assign) => {
            e.load_value(&Value::text(assign.name.clone()))?;
            emit_node(&assign.value, &mut e)?;
            e.call("assign", 2)?;
        }
        Statement::Define(def) => {
            let mut params = Heading::new();
            for arg in &def.call.args {
                params.insert_if_absent(arg.clone());
            }
            e.load_value(&Value::text(def.name.clone()))?;
            e.load_value(&Value::Heading(params))?;
            emit_segment(&def.body, &mut e)?;
            e.call("define", 3)?;
        }
        Statement::TypeDef(user) => {
            e.load_value(&Value::text(user.name.clone()))?;
            e.load_value(&Value::Heading(user.heading.clone()))?;
            e.call("deftype", 2)?;
        }
    }
    e.end();
    Ok(e.finish())
}

fn emit_all(nodes: &[Node], e: &mut Emitter) -> AstResult {
    nodes.iter().try_for_each(|n| emit_node(n, e))
}

/// Push the accumulator block and base slot of a folding call
fn emit_accum(base: Option<usize>, e: &mut Emitter) -> AstResult<usize> {
    match base {
        Some(base) => {
            e.load_acc_block();
            e.load_value(&Value::number(base as i64))?;
            Ok(2)
        }
        None => Ok(0),
    }
}

/// Compile a segment body into its own buffer and push it
pub fn emit_segment(segment: &Segment, e: &mut Emitter) -> AstResult {
    let mut inner = Emitter::new();
    emit_node(&segment.body, &mut inner)?;
    let block = ExprBlock {
        name: segment.name.clone(),
        kind: segment.kind,
        accums: segment.accums,
        flags: segment.flags,
        lookup: segment.lookup.clone(),
        code: inner.finish(),
    };
    e.load_segment(&block)?;
    Ok(())
}

fn call_var_for(table: bool, name: &str, fixed: usize, var: usize, e: &mut Emitter) -> AstResult {
    if table {
        e.call_var_table(name, fixed, var)?;
    } else {
        e.call_var(name, fixed, var)?;
    }
    Ok(())
}

pub fn emit_node(node: &Node, e: &mut Emitter) -> AstResult {
    match node {
        Node::Literal(value) => e.load_value(value)?,
        Node::Variable(var) => match var.source {
            VarSource::Catalog => e.load_catalog(&var.name)?,
            VarSource::CatalogRef => e.load_catalog_ref(&var.name)?,
            VarSource::Field | VarSource::Parameter => e.load_field(&var.name)?,
            VarSource::Component => {
                e.load_lookup();
                e.load_component(&var.name)?;
            }
        },
        Node::CurrentRow(_) => e.load_lookup(),
        Node::Local(local) => emit_node(&local.value, e)?,
        Node::Block(block) => emit_node(&block.body, e)?,
        Node::Call(call) => {
            let extra = emit_accum(call.accum_base, e)?;
            emit_all(&call.args, e)?;
            e.call(&call.call.name, call.args.len() + extra)?;
        }
        Node::VarCall(call) => {
            emit_all(&call.args, e)?;
            call_var_for(call.returns_table(), &call.call.name, call.fixed(), call.var(), e)?;
        }
        Node::Deferred(call) => {
            e.load_catalog_ref(&call.call.name)?;
            let extra = emit_accum(call.accum_base, e)?;
            emit_all(&call.args, e)?;
            e.call_var("invoke", 1 + extra, call.args.len())?;
        }
        Node::Fold(fold) => {
            emit_accum(Some(fold.base), e)?;
            e.load_value(&Value::text(fold.op.clone()))?;
            emit_node(&fold.arg, e)?;
            e.call("fold", 4)?;
        }
        Node::Row(row) => {
            e.load_value(&Value::Heading(row.heading.clone()))?;
            emit_all(&row.values, e)?;
            e.call_var("row", 1, row.values.len())?;
        }
        Node::Table(table) => {
            e.load_value(&Value::Heading(table.heading.clone()))?;
            emit_all(&table.rows, e)?;
            e.call_var_table("table", 1, table.rows.len())?;
        }
        Node::Selector(sel) => {
            e.load_value(&Value::text(sel.user.name.clone()))?;
            emit_all(&sel.args, e)?;
            e.call_var("select", 1, sel.args.len())?;
        }
        Node::Project(project) => {
            emit_node(&project.base, e)?;
            e.load_value(&Value::Heading(project.heading.clone()))?;
            e.call("project", 2)?;
        }
        Node::Rename(rename) => {
            emit_node(&rename.base, e)?;
            for (from, to) in &rename.pairs {
                e.load_value(&Value::text(from.clone()))?;
                e.load_value(&Value::text(to.clone()))?;
            }
            call_var_for(rename.data_type.is_relation(), "rename", 1, rename.pairs.len() * 2, e)?;
        }
        Node::Transform(t) => {
            emit_node(&t.base, e)?;
            for segment in t.order.iter().chain(&t.fields) {
                emit_segment(segment, e)?;
            }
            let var = t.order.len() + t.fields.len();
            call_var_for(t.data_type.is_relation(), t.kind.call_name(), 1, var, e)?;
        }
        Node::Restrict(restrict) => {
            emit_node(&restrict.base, e)?;
            emit_segment(&restrict.predicate, e)?;
            e.call("restrict", 2)?;
        }
        Node::Order(order) => {
            emit_node(&order.base, e)?;
            for key in &order.keys {
                emit_segment(key, e)?;
            }
            e.call_var_table("order", 1, order.keys.len())?;
        }
        Node::Code(segment) => emit_segment(segment, e)?,
        Node::Component(access) => {
            emit_node(&access.base, e)?;
            e.load_component(&access.name)?;
        }
        Node::TupleField(access) => {
            emit_node(&access.base, e)?;
            e.load_tuple_field(&access.name)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Assignment, CallNode, DeferredNode, FoldNode, TransformKind, TransformNode};
    use pretty_assertions::assert_eq;
    use relq_bytecode::{BlockFlags, disassemble};
    use relq_types::{Builtins, CallInfo, CallKind, Column, DataType};

    fn builtin_call(name: &str, args: Vec<Node>) -> Node {
        let call = Builtins::get().lookup(name).unwrap().links()[0].clone();
        Node::Call(CallNode {
            data_type: call.return_type.clone(),
            call,
            args,
            accum_base: None,
        })
    }

    fn text(node: &Node) -> String {
        disassemble(&emit_statement(&Statement::Expression(node.clone())).unwrap()).unwrap()
    }

    #[test]
    fn arithmetic_is_post_order() {
        let product = builtin_call("*", vec![Node::literal(2), Node::literal(3)]);
        let sum = builtin_call("+", vec![Node::literal(1), product]);
        assert_eq!(
            text(&sum),
            "LOAD_VALUE 1\nLOAD_VALUE 2\nLOAD_VALUE 3\nCALL */2\nCALL +/2\nEND\n"
        );
    }

    #[test]
    fn folding_call_gets_accumulator_block() {
        let call = Builtins::get().lookup("count").unwrap().links()[0].clone();
        let node = Node::Call(CallNode {
            call,
            args: Vec::new(),
            data_type: DataType::Number,
            accum_base: Some(3),
        });
        assert_eq!(text(&node), "LOAD_ACC_BLOCK\nLOAD_VALUE 3\nCALL count/2\nEND\n");
    }

    #[test]
    fn fold_operator_layout() {
        let node = Node::Fold(FoldNode {
            op: "+".into(),
            base: 0,
            arg: Box::new(Node::variable("a", VarSource::Field, DataType::Number)),
            data_type: DataType::Number,
        });
        assert_eq!(
            text(&node),
            "LOAD_ACC_BLOCK\nLOAD_VALUE 0\nLOAD_VALUE '+'\nLOAD_FIELD a\nCALL fold/4\nEND\n"
        );
    }

    #[test]
    fn deferred_call_pushes_reference_first() {
        let call = CallInfo::new("f", DataType::Number, CallKind::Deferred).arg("x", DataType::Number);
        let node = Node::Deferred(DeferredNode {
            call,
            args: vec![Node::literal(4)],
            data_type: DataType::Number,
            accum_base: None,
        });
        assert_eq!(text(&node), "LOAD_CATALOG_REF f\nLOAD_VALUE 4\nCALL_VAR invoke/1+1\nEND\n");
    }

    #[test]
    fn transform_emits_order_keys_before_fields() {
        let heading = Heading::from_columns([Column::new("a", DataType::Number)]).unwrap();
        let base = Node::variable("r", VarSource::Catalog, DataType::Relation(heading.clone()));
        let field = Node::variable("a", VarSource::Field, DataType::Number);
        let key = Segment::new("a", field.clone(), heading.clone(), 0, false).with_flags(BlockFlags::ORDER);
        let node = Node::Transform(TransformNode {
            base: Box::new(base),
            kind: TransformKind::Ordered,
            order: vec![key],
            fields: vec![Segment::new("b", field, heading.clone(), 0, false)],
            accums: 0,
            data_type: DataType::Relation(heading),
        });
        assert_eq!(
            text(&node),
            "LOAD_CATALOG r\n\
             LOAD_SEGMENT a [open] accums=0 lookup={a:number} flags=order\n  \
             LOAD_FIELD a\n\
             LOAD_SEGMENT b [open] accums=0 lookup={a:number}\n  \
             LOAD_FIELD a\n\
             CALL_VAR_TABLE transform_ordered/1+2\n\
             END\n"
        );
    }

    #[test]
    fn assignment_layout() {
        let stmt = Statement::Assign(Assignment {
            name: "x".into(),
            value: Node::literal(1),
        });
        let code = emit_statement(&stmt).unwrap();
        assert_eq!(
            disassemble(&code).unwrap(),
            "LOAD_VALUE 'x'\nLOAD_VALUE 1\nCALL assign/2\nEND\n"
        );
    }
}
