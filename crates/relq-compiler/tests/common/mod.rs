//! Shared helpers for the integration tests
//!
//! `StackEvaluator` runs the scalar subset of the instruction set: literals,
//! catalog variables, arithmetic, comparison, logic and `assign`. Anything
//! relational is reported as unsupported.

#![allow(dead_code)]

use relq_bytecode::{ByteCode, Decoder, ExprBlock, Instruction};
use relq_compiler::{BufferSink, CompiledStatement, Compiler, Evaluator, MemoryCatalog, ProgramError};
use relq_types::Value;
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct StackEvaluator {
    pub variables: HashMap<String, Value>,
}

impl StackEvaluator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Evaluator for StackEvaluator {
    fn exec(&mut self, code: &ByteCode, _argument_row: Option<&Value>) -> Result<Value, ProgramError> {
        let mut stack: Vec<Value> = Vec::new();
        for instruction in decode(code)? {
            match instruction {
                Instruction::End => break,
                Instruction::LoadValue(value) => stack.push(value),
                Instruction::LoadCatalog(name) => {
                    let value = self
                        .variables
                        .get(&name)
                        .cloned()
                        .ok_or_else(|| ProgramError::failed(format!("unbound variable '{name}'")))?;
                    stack.push(value);
                }
                Instruction::Call { name, arity } => {
                    let at = stack
                        .len()
                        .checked_sub(usize::from(arity))
                        .ok_or_else(|| ProgramError::failed("stack underflow"))?;
                    let args = stack.split_off(at);
                    let result = self.call(&name, args)?;
                    stack.push(result);
                }
                other => {
                    return Err(ProgramError::Unsupported {
                        instruction: other.opcode().name().to_string(),
                    });
                }
            }
        }
        stack.pop().ok_or_else(|| ProgramError::failed("empty stack"))
    }
}

impl StackEvaluator {
    fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, ProgramError> {
        if name == "assign" {
            let mut args = args.into_iter();
            let (Some(Value::Text(var)), Some(value)) = (args.next(), args.next()) else {
                return Err(ProgramError::failed("bad assign"));
            };
            self.variables.insert(var, value);
            return Ok(Value::Void);
        }

        match (name, args.as_slice()) {
            ("neg", [Value::Number(a)]) => Ok(Value::Number(-*a)),
            ("not", [Value::Bool(a)]) => Ok(Value::Bool(!a)),
            ("and", [Value::Bool(a), Value::Bool(b)]) => Ok(Value::Bool(*a && *b)),
            ("or", [Value::Bool(a), Value::Bool(b)]) => Ok(Value::Bool(*a || *b)),
            ("&", [Value::Text(a), Value::Text(b)]) => Ok(Value::text(format!("{a}{b}"))),
            ("=", [a, b]) => Ok(Value::Bool(a == b)),
            ("<>", [a, b]) => Ok(Value::Bool(a != b)),
            (op, [Value::Number(a), Value::Number(b)]) => arithmetic(op, *a, *b),
            _ => Err(ProgramError::Unsupported {
                instruction: format!("{name}/{}", args.len()),
            }),
        }
    }
}

fn arithmetic(op: &str, a: Decimal, b: Decimal) -> Result<Value, ProgramError> {
    let overflow = || ProgramError::failed("numeric overflow");
    Ok(match op {
        "+" => Value::Number(a.checked_add(b).ok_or_else(overflow)?),
        "-" => Value::Number(a.checked_sub(b).ok_or_else(overflow)?),
        "*" => Value::Number(a.checked_mul(b).ok_or_else(overflow)?),
        "/" if b.is_zero() => return Err(ProgramError::DivisionByZero),
        "/" => Value::Number(a.checked_div(b).ok_or_else(overflow)?),
        "<" => Value::Bool(a < b),
        "<=" => Value::Bool(a <= b),
        ">" => Value::Bool(a > b),
        ">=" => Value::Bool(a >= b),
        _ => {
            return Err(ProgramError::Unsupported {
                instruction: op.to_string(),
            });
        }
    })
}

pub fn decode(code: &ByteCode) -> Result<Vec<Instruction>, ProgramError> {
    Decoder::new(code.as_bytes())
        .decode_all()
        .map_err(|e| ProgramError::failed(e.to_string()))
}

/// Every segment in `instructions`, outermost first
pub fn segments(instructions: &[Instruction]) -> Vec<&ExprBlock> {
    let mut found = Vec::new();
    for instruction in instructions {
        if let Instruction::LoadSegment(block, body) = instruction {
            found.push(block);
            found.extend(segments(body));
        }
    }
    found
}

/// Accumulator slots passed to folding calls, in emission order
pub fn accumulator_slots(instructions: &[Instruction]) -> Vec<Decimal> {
    let mut slots = Vec::new();
    let mut after_block = false;
    for instruction in instructions {
        match instruction {
            Instruction::LoadAccBlock => {
                after_block = true;
                continue;
            }
            Instruction::LoadValue(Value::Number(n)) if after_block => slots.push(*n),
            Instruction::LoadSegment(_, body) => slots.extend(accumulator_slots(body)),
            _ => {}
        }
        after_block = false;
    }
    slots
}

/// Results of running `text` through a fresh compiler
pub struct Run {
    pub ok: bool,
    pub errors: usize,
    pub aborted: bool,
    pub output: Vec<CompiledStatement>,
    pub catalog: MemoryCatalog,
    pub sink: BufferSink,
}

pub fn run(text: &str) -> Run {
    let mut catalog = MemoryCatalog::new();
    let mut sink = BufferSink::new();
    let mut compiler = Compiler::new(&mut catalog, &mut sink);
    let ok = compiler.process(text);
    let errors = compiler.errors();
    let aborted = compiler.aborted();
    let output = compiler.take_output();
    drop(compiler);
    Run {
        ok,
        errors,
        aborted,
        output,
        catalog,
        sink,
    }
}

/// Compile and execute `text`, returning the last statement's value
pub fn evaluate(text: &str) -> Option<Value> {
    let mut catalog = MemoryCatalog::new();
    let mut sink = BufferSink::new();
    let mut evaluator = StackEvaluator::new();
    let mut compiler = Compiler::new(&mut catalog, &mut sink).with_evaluator(&mut evaluator);
    assert!(compiler.process("#exec on"));
    assert!(compiler.process(text), "failed to compile {text:?}");
    compiler.output().last().and_then(|s| s.value.clone())
}
