//! Every emitted byte is accounted for by the decoder

use proptest::prelude::*;
use relq_bytecode::{BlockFlags, Decoder, Emitter, ExprBlock, ExprKind, Instruction, disassemble};
use relq_types::{Column, DataType, Heading, Value};

#[derive(Debug, Clone)]
enum Op {
    Number(i64),
    Text(String),
    Bool(bool),
    Field(String),
    Catalog(String),
    Acc,
    Call(String, u8),
    CallVar(String, u8, u8),
    Segment(String, Vec<Op>),
}

fn ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}"
}

fn leaf() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<i64>().prop_map(Op::Number),
        ".{0,12}".prop_map(Op::Text),
        any::<bool>().prop_map(Op::Bool),
        ident().prop_map(Op::Field),
        ident().prop_map(Op::Catalog),
        Just(Op::Acc),
        (ident(), any::<u8>()).prop_map(|(n, a)| Op::Call(n, a)),
        (ident(), any::<u8>(), any::<u8>()).prop_map(|(n, f, v)| Op::CallVar(n, f, v)),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    leaf().prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            leaf(),
            (ident(), prop::collection::vec(inner, 0..6)).prop_map(|(n, body)| Op::Segment(n, body)),
        ]
    })
}

fn emit(ops: &[Op]) -> Emitter {
    let mut e = Emitter::new();
    for op in ops {
        match op {
            Op::Number(n) => e.load_value(&Value::number(*n)).unwrap(),
            Op::Text(s) => e.load_value(&Value::text(s.clone())).unwrap(),
            Op::Bool(b) => e.load_value(&Value::Bool(*b)).unwrap(),
            Op::Field(n) => e.load_field(n).unwrap(),
            Op::Catalog(n) => e.load_catalog(n).unwrap(),
            Op::Acc => e.load_acc_block(),
            Op::Call(n, a) => e.call(n, *a as usize).unwrap(),
            Op::CallVar(n, f, v) => e.call_var(n, *f as usize, *v as usize).unwrap(),
            Op::Segment(n, body) => {
                let lookup = Heading::from_columns([Column::new("x", DataType::Number)]).unwrap();
                let block = ExprBlock::new(n.clone(), lookup, 0, false, emit(body).finish())
                    .with_flags(BlockFlags::ORDER);
                e.load_segment(&block).unwrap();
            }
        }
    }
    e
}

fn count(instructions: &[Instruction]) -> usize {
    instructions
        .iter()
        .map(|i| match i {
            Instruction::LoadSegment(_, body) => 1 + count(body),
            _ => 1,
        })
        .sum()
}

fn expected(ops: &[Op]) -> usize {
    ops.iter()
        .map(|op| match op {
            Op::Segment(_, body) => 1 + expected(body),
            _ => 1,
        })
        .sum()
}

proptest! {
    #[test]
    fn decoder_consumes_whole_stream(ops in prop::collection::vec(op(), 0..16)) {
        let mut e = emit(&ops);
        e.end();
        let code = e.finish();

        let mut decoder = Decoder::new(code.as_bytes());
        let mut top = Vec::new();
        while !decoder.is_at_end() {
            top.push(decoder.next_instruction().unwrap());
        }
        prop_assert_eq!(decoder.position(), code.len());
        prop_assert_eq!(top.len(), ops.len() + 1);
        prop_assert_eq!(top.last(), Some(&Instruction::End));
        prop_assert_eq!(count(&top), expected(&ops) + 1);

        prop_assert!(disassemble(&code).is_ok());
    }

    #[test]
    fn truncation_is_always_reported(ops in prop::collection::vec(op(), 1..8), cut in any::<prop::sample::Index>()) {
        let code = emit(&ops).finish();
        let cut = cut.index(code.len());
        let bytes = &code.as_bytes()[..cut];
        // a prefix either decodes cleanly on an instruction boundary or fails
        if let Ok(decoded) = Decoder::new(bytes).decode_all() {
            prop_assert!(decoded.len() <= ops.len());
        }
    }
}

#[test]
fn segment_header_survives() {
    let mut body = Emitter::new();
    body.load_field("amount").unwrap();
    body.load_acc_block();
    body.load_value(&Value::number(0)).unwrap();
    body.call("sum", 3).unwrap();
    let lookup = Heading::from_columns([Column::new("amount", DataType::Number)]).unwrap();
    let block = ExprBlock::new("total", lookup, 1, false, body.finish());
    assert_eq!(block.kind, ExprKind::HasFold);

    let mut e = Emitter::new();
    e.load_segment(&block).unwrap();
    let all = Decoder::new(e.finish().as_bytes()).decode_all().unwrap();
    match &all[..] {
        [Instruction::LoadSegment(decoded, body)] => {
            assert_eq!(decoded, &block);
            assert_eq!(body.len(), 4);
        }
        other => panic!("unexpected decode {other:?}"),
    }
}
