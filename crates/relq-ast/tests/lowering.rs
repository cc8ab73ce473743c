use relq_ast::{
    AccessNode, BlockNode, FieldItem, LocalNode, Node, ProjectNode, RestrictNode, RowNode, Segment, Statement, Strategy,
    TableNode, TransformKind, VarSource, emit_statement, select_strategy,
};
use relq_bytecode::{Decoder, Instruction};
use relq_types::{Column, DataType, Heading, Value};

fn heading() -> Heading {
    Heading::from_columns([
        Column::new("id", DataType::Number),
        Column::new("name", DataType::Text),
    ])
    .unwrap()
}

fn row(id: i64, name: &str) -> Node {
    Node::Row(RowNode {
        heading: heading(),
        values: vec![Node::literal(id), Node::literal(name)],
    })
}

#[test]
fn nested_tree_decodes_completely() {
    let table = Node::Table(TableNode {
        heading: heading(),
        rows: vec![row(1, "a"), row(2, "b")],
    });
    let predicate = Segment::new(
        "where",
        Node::variable("id", VarSource::Field, DataType::Number),
        Heading::from_columns([Column::new("id", DataType::Number)]).unwrap(),
        0,
        false,
    );
    let restricted = Node::Restrict(RestrictNode {
        base: Box::new(table),
        predicate,
    });
    let projected = Node::Project(ProjectNode {
        base: Box::new(restricted),
        heading: Heading::from_columns([Column::new("name", DataType::Text)]).unwrap(),
        data_type: DataType::Relation(Heading::from_columns([Column::new("name", DataType::Text)]).unwrap()),
    });

    let code = emit_statement(&Statement::Expression(projected)).unwrap();
    let instructions = Decoder::new(code.as_bytes()).decode_all().unwrap();

    assert_eq!(instructions.first(), Some(&Instruction::LoadValue(Value::Heading(heading()))));
    assert_eq!(instructions.last(), Some(&Instruction::End));
    assert!(instructions.iter().any(|i| matches!(i, Instruction::LoadSegment(b, body)
        if b.name == "where" && body == &[Instruction::LoadField("id".into())])));
    assert!(instructions.contains(&Instruction::Call {
        name: "project".into(),
        arity: 2
    }));
}

#[test]
fn block_locals_are_inlined() {
    let bound = Node::literal(5);
    let body = Node::TupleField(AccessNode {
        base: Box::new(row(1, "x")),
        name: "id".into(),
        data_type: DataType::Number,
    });
    let block = Node::Block(BlockNode {
        locals: vec![("k".into(), bound.clone())],
        body: Box::new(Node::Local(LocalNode {
            name: "k".into(),
            value: Box::new(body),
        })),
    });
    let code = emit_statement(&Statement::Expression(block)).unwrap();
    let instructions = Decoder::new(code.as_bytes()).decode_all().unwrap();
    // the binding itself is never emitted
    assert!(!instructions.contains(&Instruction::LoadValue(Value::number(5))));
    assert!(instructions.contains(&Instruction::LoadTupleField("id".into())));
}

#[test]
fn rename_of_partial_heading_is_a_plain_transform() {
    let items = vec![FieldItem::Rename {
        from: "id".into(),
        to: "key".into(),
    }];
    assert_eq!(select_strategy(&items, false, 2), Strategy::Transform(TransformKind::Plain));
    assert_eq!(select_strategy(&items, false, 1), Strategy::Rename);
}
