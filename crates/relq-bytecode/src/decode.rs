//! Bytecode decoder and disassembler
//!
//! Used for tracing only. The decoder never trusts the buffer: every
//! truncated operand, unknown opcode or malformed literal is an error.

use crate::encode::{
    TAG_BINARY, TAG_BOOL, TAG_HEADING, TAG_NUMBER, TAG_RELATION, TAG_TEXT, TAG_TIME, TAG_TUPLE, TAG_VOID,
    TYPE_BINARY, TYPE_BOOL, TYPE_CODE, TYPE_NUMBER, TYPE_RELATION, TYPE_TEXT, TYPE_TIME, TYPE_TUPLE, TYPE_USER,
    TYPE_VOID,
};
use crate::{BlockFlags, ByteCode, ExprBlock, ExprKind, OpCode};
use chrono::DateTime;
use relq_types::{Column, DataType, Heading, UserType, Value};
use rust_decimal::Decimal;
use std::fmt::Write;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("truncated operand at offset {offset}: needed {needed} bytes")]
    Truncated { offset: usize, needed: usize },

    #[error("unknown opcode {byte:#04x} at offset {offset}")]
    UnknownOpcode { offset: usize, byte: u8 },

    #[error("unknown value tag {tag} at offset {offset}")]
    BadValueTag { offset: usize, tag: u8 },

    #[error("unknown type tag {tag} at offset {offset}")]
    BadTypeTag { offset: usize, tag: u8 },

    #[error("unknown segment kind {kind} at offset {offset}")]
    BadSegmentKind { offset: usize, kind: u8 },

    #[error("invalid UTF-8 at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("time out of range at offset {offset}")]
    BadTime { offset: usize },

    #[error("malformed literal at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: String },
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// One decoded instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    End,
    LoadValue(Value),
    LoadCatalog(String),
    LoadCatalogRef(String),
    LoadField(String),
    LoadComponent(String),
    LoadTupleField(String),
    LoadAccBlock,
    LoadLookup,
    /// A segment header with its decoded body
    LoadSegment(ExprBlock, Vec<Instruction>),
    Call { name: String, arity: u8 },
    CallVar { name: String, fixed: u8, var: u8 },
    CallVarTable { name: String, fixed: u8, var: u8 },
}

impl Instruction {
    pub fn opcode(&self) -> OpCode {
        match self {
            Self::End => OpCode::End,
            Self::LoadValue(_) => OpCode::LoadValue,
            Self::LoadCatalog(_) => OpCode::LoadCatalog,
            Self::LoadCatalogRef(_) => OpCode::LoadCatalogRef,
            Self::LoadField(_) => OpCode::LoadField,
            Self::LoadComponent(_) => OpCode::LoadComponent,
            Self::LoadTupleField(_) => OpCode::LoadTupleField,
            Self::LoadAccBlock => OpCode::LoadAccBlock,
            Self::LoadLookup => OpCode::LoadLookup,
            Self::LoadSegment(..) => OpCode::LoadSegment,
            Self::Call { .. } => OpCode::Call,
            Self::CallVar { .. } => OpCode::CallVar,
            Self::CallVarTable { .. } => OpCode::CallVarTable,
        }
    }
}

/// Cursor over a bytecode buffer
pub struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Offset of `bytes[0]` in the outermost buffer, for error reporting
    base: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0, base: 0 }
    }

    fn nested(bytes: &'a [u8], base: usize) -> Self {
        Self { bytes, pos: 0, base }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn take(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.bytes.len()).ok_or(
            DecodeError::Truncated {
                offset: self.offset(),
                needed: n,
            },
        )?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> DecodeResult<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> DecodeResult<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn u32(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn utf8(&mut self, len: usize) -> DecodeResult<String> {
        let offset = self.offset();
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8 { offset })
    }

    fn name(&mut self) -> DecodeResult<String> {
        let len = self.u16()? as usize;
        self.utf8(len)
    }

    fn data_type(&mut self) -> DecodeResult<DataType> {
        let offset = self.offset();
        Ok(match self.u8()? {
            TYPE_BOOL => DataType::Bool,
            TYPE_NUMBER => DataType::Number,
            TYPE_TEXT => DataType::Text,
            TYPE_BINARY => DataType::Binary,
            TYPE_TIME => DataType::Time,
            TYPE_TUPLE => DataType::Tuple(self.heading()?),
            TYPE_RELATION => DataType::Relation(self.heading()?),
            TYPE_USER => {
                let name = self.name()?;
                let heading = self.heading()?;
                let mut user = UserType::new(name, heading);
                if self.u8()? != 0 {
                    user = user.with_supertype(self.data_type()?);
                }
                DataType::user(user)
            }
            TYPE_CODE => DataType::Code,
            TYPE_VOID => DataType::Void,
            tag => return Err(DecodeError::BadTypeTag { offset, tag }),
        })
    }

    fn heading(&mut self) -> DecodeResult<Heading> {
        let offset = self.offset();
        let count = self.u16()?;
        let mut heading = Heading::new();
        for _ in 0..count {
            let name = self.name()?;
            let ty = self.data_type()?;
            heading.push(Column::new(name, ty)).map_err(|e| DecodeError::Malformed {
                offset,
                reason: e.to_string(),
            })?;
        }
        Ok(heading)
    }

    fn value(&mut self) -> DecodeResult<Value> {
        let offset = self.offset();
        Ok(match self.u8()? {
            TAG_VOID => Value::Void,
            TAG_BOOL => Value::Bool(self.u8()? != 0),
            TAG_NUMBER => Value::Number(Decimal::deserialize(self.array()?)),
            TAG_TEXT => {
                let len = self.u32()? as usize;
                Value::Text(self.utf8(len)?)
            }
            TAG_BINARY => {
                let len = self.u32()? as usize;
                Value::Binary(self.take(len)?.to_vec())
            }
            TAG_TIME => {
                let at = self.offset();
                let ms = i64::from_be_bytes(self.array()?);
                let time = DateTime::from_timestamp_millis(ms).ok_or(DecodeError::BadTime { offset: at })?;
                Value::Time(time.naive_utc())
            }
            TAG_TUPLE => {
                let count = self.u16()?;
                let mut fields = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let name = self.name()?;
                    fields.push((name, self.value()?));
                }
                Value::Tuple(fields)
            }
            TAG_RELATION => {
                let heading = self.heading()?;
                let count = self.u32()?;
                let mut rows = Vec::new();
                for _ in 0..count {
                    let row = (0..heading.degree())
                        .map(|_| self.value())
                        .collect::<DecodeResult<Vec<_>>>()?;
                    rows.push(row);
                }
                Value::Relation { heading, rows }
            }
            TAG_HEADING => Value::Heading(self.heading()?),
            tag => return Err(DecodeError::BadValueTag { offset, tag }),
        })
    }

    fn segment(&mut self) -> DecodeResult<(ExprBlock, Vec<Instruction>)> {
        let name = self.name()?;
        let kind_at = self.offset();
        let kind_byte = self.u8()?;
        let kind = ExprKind::from_u8(kind_byte).ok_or(DecodeError::BadSegmentKind {
            offset: kind_at,
            kind: kind_byte,
        })?;
        let accums = self.u16()? as usize;
        let flags = BlockFlags::from_bits(self.u8()?);
        let lookup = self.heading()?;
        let len = self.u32()? as usize;
        let body_base = self.offset();
        let body = self.take(len)?;
        let instructions = Decoder::nested(body, body_base).decode_all()?;
        let block = ExprBlock {
            name,
            kind,
            accums,
            flags,
            lookup,
            code: ByteCode::from_bytes(body.to_vec()),
        };
        Ok((block, instructions))
    }

    /// Decode the next instruction
    pub fn next_instruction(&mut self) -> DecodeResult<Instruction> {
        let offset = self.offset();
        let byte = self.u8()?;
        let op = OpCode::from_u8(byte).ok_or(DecodeError::UnknownOpcode { offset, byte })?;
        Ok(match op {
            OpCode::End => Instruction::End,
            OpCode::LoadValue => Instruction::LoadValue(self.value()?),
            OpCode::LoadCatalog => Instruction::LoadCatalog(self.name()?),
            OpCode::LoadCatalogRef => Instruction::LoadCatalogRef(self.name()?),
            OpCode::LoadField => Instruction::LoadField(self.name()?),
            OpCode::LoadComponent => Instruction::LoadComponent(self.name()?),
            OpCode::LoadTupleField => Instruction::LoadTupleField(self.name()?),
            OpCode::LoadAccBlock => Instruction::LoadAccBlock,
            OpCode::LoadLookup => Instruction::LoadLookup,
            OpCode::LoadSegment => {
                let (block, body) = self.segment()?;
                Instruction::LoadSegment(block, body)
            }
            OpCode::Call => Instruction::Call {
                name: self.name()?,
                arity: self.u8()?,
            },
            OpCode::CallVar => Instruction::CallVar {
                name: self.name()?,
                fixed: self.u8()?,
                var: self.u8()?,
            },
            OpCode::CallVarTable => Instruction::CallVarTable {
                name: self.name()?,
                fixed: self.u8()?,
                var: self.u8()?,
            },
        })
    }

    /// Decode every remaining instruction
    pub fn decode_all(mut self) -> DecodeResult<Vec<Instruction>> {
        let mut out = Vec::new();
        while !self.is_at_end() {
            out.push(self.next_instruction()?);
        }
        Ok(out)
    }
}

/// Render a buffer as indented text, one instruction per line
pub fn disassemble(code: &ByteCode) -> DecodeResult<String> {
    let instructions = Decoder::new(code.as_bytes()).decode_all()?;
    let mut out = String::new();
    write_instructions(&mut out, &instructions, 0);
    Ok(out)
}

fn write_instructions(out: &mut String, instructions: &[Instruction], depth: usize) {
    let indent = "  ".repeat(depth);
    for instruction in instructions {
        let name = instruction.opcode().name();
        // writing to a String cannot fail
        let _ = match instruction {
            Instruction::End | Instruction::LoadAccBlock | Instruction::LoadLookup => {
                writeln!(out, "{indent}{name}")
            }
            Instruction::LoadValue(v) => writeln!(out, "{indent}{name} {v}"),
            Instruction::LoadCatalog(n)
            | Instruction::LoadCatalogRef(n)
            | Instruction::LoadField(n)
            | Instruction::LoadComponent(n)
            | Instruction::LoadTupleField(n) => writeln!(out, "{indent}{name} {n}"),
            Instruction::Call { name: f, arity } => writeln!(out, "{indent}{name} {f}/{arity}"),
            Instruction::CallVar { name: f, fixed, var } | Instruction::CallVarTable { name: f, fixed, var } => {
                writeln!(out, "{indent}{name} {f}/{fixed}+{var}")
            }
            Instruction::LoadSegment(block, body) => {
                let _ = write!(
                    out,
                    "{indent}{name} {} [{}] accums={} lookup={}",
                    block.name, block.kind, block.accums, block.lookup
                );
                if block.flags != BlockFlags::NONE {
                    let _ = write!(out, " flags={}", block.flags);
                }
                let _ = writeln!(out);
                write_instructions(out, body, depth + 1);
                Ok(())
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Emitter;
    use chrono::NaiveDateTime;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn heading() -> Heading {
        Heading::from_columns([
            Column::new("a", DataType::Number),
            Column::new("b", DataType::Text),
        ])
        .unwrap()
    }

    #[test]
    fn roundtrip_every_opcode() {
        let mut inner = Emitter::new();
        inner.load_field("a").unwrap();
        inner.load_acc_block();
        inner.load_value(&Value::number(0)).unwrap();
        inner.call("count", 2).unwrap();
        let block = ExprBlock::new("n", heading(), 1, false, inner.finish());

        let time = NaiveDateTime::parse_from_str("2024-01-31 12:00:00", relq_types::TIME_FORMAT).unwrap();
        let mut e = Emitter::new();
        e.load_catalog("r").unwrap();
        e.load_catalog_ref("f").unwrap();
        e.load_value(&Value::Time(time)).unwrap();
        e.load_value(&Value::Binary(vec![1, 2, 3])).unwrap();
        e.load_value(&Value::Relation {
            heading: heading(),
            rows: vec![vec![Value::number(1), Value::text("x")]],
        })
        .unwrap();
        e.load_component("x").unwrap();
        e.load_tuple_field("y").unwrap();
        e.load_lookup();
        e.load_segment(&block).unwrap();
        e.call_var("concat", 0, 3).unwrap();
        e.call_var_table("transform", 1, 1).unwrap();
        e.end();
        let code = e.finish();

        let mut decoder = Decoder::new(code.as_bytes());
        let mut count = 0;
        while !decoder.is_at_end() {
            decoder.next_instruction().unwrap();
            count += 1;
        }
        assert_eq!(count, 12);
        assert_eq!(decoder.position(), code.len());

        let all = Decoder::new(code.as_bytes()).decode_all().unwrap();
        assert_eq!(all[2], Instruction::LoadValue(Value::Time(time)));
        let Instruction::LoadSegment(decoded, body) = &all[8] else {
            panic!("expected a segment");
        };
        assert_eq!(decoded, &block);
        assert_eq!(body.len(), 4);
    }

    #[test]
    fn disassembly_indents_segments() {
        let mut inner = Emitter::new();
        inner.load_field("a").unwrap();
        let block = ExprBlock::new("x", heading(), 0, false, inner.finish());

        let mut e = Emitter::new();
        e.load_catalog("r").unwrap();
        e.load_segment(&block).unwrap();
        e.call_var_table("transform", 1, 1).unwrap();
        e.end();

        let text = disassemble(&e.finish()).unwrap();
        assert_eq!(
            text,
            "LOAD_CATALOG r\n\
             LOAD_SEGMENT x [open] accums=0 lookup={a:number,b:text}\n  \
             LOAD_FIELD a\n\
             CALL_VAR_TABLE transform/1+1\n\
             END\n"
        );
    }

    #[test]
    fn truncated_operand() {
        let mut e = Emitter::new();
        e.load_field("abc").unwrap();
        let bytes = e.finish().into_bytes();
        let err = Decoder::new(&bytes[..4]).decode_all().unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }

    #[test]
    fn unknown_opcode() {
        let err = Decoder::new(&[0x7f]).decode_all().unwrap_err();
        assert_eq!(err, DecodeError::UnknownOpcode { offset: 0, byte: 0x7f });
    }

    #[test]
    fn bad_value_tag() {
        let err = Decoder::new(&[OpCode::LoadValue as u8, 99]).decode_all().unwrap_err();
        assert_eq!(err, DecodeError::BadValueTag { offset: 1, tag: 99 });
    }

    proptest! {
        #[test]
        fn text_and_number_literals_consume_every_byte(s in ".{0,40}", n in any::<i64>(), scale in 0u32..10) {
            let mut e = Emitter::new();
            e.load_value(&Value::text(s.clone())).unwrap();
            e.load_value(&Value::Number(Decimal::new(n, scale))).unwrap();
            e.call("&", 2).unwrap();
            let code = e.finish();

            let all = Decoder::new(code.as_bytes()).decode_all().unwrap();
            prop_assert_eq!(all.len(), 3);
            prop_assert_eq!(&all[0], &Instruction::LoadValue(Value::Text(s)));
            prop_assert_eq!(&all[1], &Instruction::LoadValue(Value::Number(Decimal::new(n, scale))));
        }
    }
}
