//! Forward-only bytecode writer
//!
//! Multi-byte integers are big-endian. Names are a u16 length then UTF-8.
//! Literals are a tag byte then the payload:
//!
//! | tag | value    | payload                               |
//! |-----|----------|---------------------------------------|
//! | 0   | void     |                                       |
//! | 1   | bool     | u8                                    |
//! | 2   | number   | 16 byte decimal                       |
//! | 3   | text     | u32 length, UTF-8                     |
//! | 4   | binary   | u32 length, bytes                     |
//! | 5   | time     | i64 milliseconds since the epoch      |
//! | 6   | tuple    | u16 count, (name, value)*             |
//! | 7   | relation | heading, u32 rows, values row by row  |
//! | 8   | heading  | heading                               |
//!
//! A heading is a u16 column count then (name, type) per column.

use crate::{ByteCode, ExprBlock, OpCode};
use relq_diagnostics::{ErrorCode, RQ0202, RQ0300, RQ0301};
use relq_types::{DataType, Heading, Value};
use thiserror::Error;

pub(crate) const TAG_VOID: u8 = 0;
pub(crate) const TAG_BOOL: u8 = 1;
pub(crate) const TAG_NUMBER: u8 = 2;
pub(crate) const TAG_TEXT: u8 = 3;
pub(crate) const TAG_BINARY: u8 = 4;
pub(crate) const TAG_TIME: u8 = 5;
pub(crate) const TAG_TUPLE: u8 = 6;
pub(crate) const TAG_RELATION: u8 = 7;
pub(crate) const TAG_HEADING: u8 = 8;

pub(crate) const TYPE_BOOL: u8 = 0;
pub(crate) const TYPE_NUMBER: u8 = 1;
pub(crate) const TYPE_TEXT: u8 = 2;
pub(crate) const TYPE_BINARY: u8 = 3;
pub(crate) const TYPE_TIME: u8 = 4;
pub(crate) const TYPE_TUPLE: u8 = 5;
pub(crate) const TYPE_RELATION: u8 = 6;
pub(crate) const TYPE_USER: u8 = 7;
pub(crate) const TYPE_CODE: u8 = 8;
pub(crate) const TYPE_VOID: u8 = 9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error("name '{0}' is too long to encode")]
    NameTooLong(String),

    #[error("'{name}' called with {arity} arguments, more than 255")]
    ArityOverflow { name: String, arity: usize },

    #[error("unresolved placeholder type {0} reached emission")]
    Placeholder(String),

    #[error("{what} too large to encode")]
    TooLarge { what: &'static str },
}

impl EmitError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Placeholder(_) => RQ0301,
            Self::ArityOverflow { .. } => RQ0202,
            _ => RQ0300,
        }
    }
}

pub type EmitResult<T = ()> = Result<T, EmitError>;

#[derive(Debug, Clone, Default)]
pub struct Emitter {
    code: Vec<u8>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Take the finished buffer
    pub fn finish(self) -> ByteCode {
        ByteCode::from_bytes(self.code)
    }

    // === raw writers ===

    fn op(&mut self, op: OpCode) {
        self.code.push(op as u8);
    }

    fn u8(&mut self, v: u8) {
        self.code.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.code.extend_from_slice(&v.to_be_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.code.extend_from_slice(&v.to_be_bytes());
    }

    fn len_u16(&mut self, len: usize, what: &'static str) -> EmitResult {
        let len = u16::try_from(len).map_err(|_| EmitError::TooLarge { what })?;
        self.u16(len);
        Ok(())
    }

    fn len_u32(&mut self, len: usize, what: &'static str) -> EmitResult {
        let len = u32::try_from(len).map_err(|_| EmitError::TooLarge { what })?;
        self.u32(len);
        Ok(())
    }

    fn name(&mut self, name: &str) -> EmitResult {
        let len = u16::try_from(name.len()).map_err(|_| EmitError::NameTooLong(name.to_string()))?;
        self.u16(len);
        self.code.extend_from_slice(name.as_bytes());
        Ok(())
    }

    fn arity(&mut self, name: &str, arity: usize) -> EmitResult {
        let n = u8::try_from(arity).map_err(|_| EmitError::ArityOverflow {
            name: name.to_string(),
            arity,
        })?;
        self.u8(n);
        Ok(())
    }

    fn data_type(&mut self, ty: &DataType) -> EmitResult {
        match ty {
            DataType::Bool => self.u8(TYPE_BOOL),
            DataType::Number => self.u8(TYPE_NUMBER),
            DataType::Text => self.u8(TYPE_TEXT),
            DataType::Binary => self.u8(TYPE_BINARY),
            DataType::Time => self.u8(TYPE_TIME),
            DataType::Tuple(h) => {
                self.u8(TYPE_TUPLE);
                self.heading(h)?;
            }
            DataType::Relation(h) => {
                self.u8(TYPE_RELATION);
                self.heading(h)?;
            }
            DataType::User(u) => {
                self.u8(TYPE_USER);
                self.name(&u.name)?;
                self.heading(&u.heading)?;
                match &u.supertype {
                    Some(sup) => {
                        self.u8(1);
                        self.data_type(sup)?;
                    }
                    None => self.u8(0),
                }
            }
            DataType::Code => self.u8(TYPE_CODE),
            DataType::Void => self.u8(TYPE_VOID),
            placeholder => return Err(EmitError::Placeholder(placeholder.to_string())),
        }
        Ok(())
    }

    fn heading(&mut self, heading: &Heading) -> EmitResult {
        self.len_u16(heading.degree(), "heading")?;
        for column in heading.iter() {
            self.name(&column.name)?;
            self.data_type(&column.data_type)?;
        }
        Ok(())
    }

    fn value(&mut self, value: &Value) -> EmitResult {
        match value {
            Value::Void => self.u8(TAG_VOID),
            Value::Bool(b) => {
                self.u8(TAG_BOOL);
                self.u8(u8::from(*b));
            }
            Value::Number(n) => {
                self.u8(TAG_NUMBER);
                self.code.extend_from_slice(&n.serialize());
            }
            Value::Text(s) => {
                self.u8(TAG_TEXT);
                self.len_u32(s.len(), "text literal")?;
                self.code.extend_from_slice(s.as_bytes());
            }
            Value::Binary(bytes) => {
                self.u8(TAG_BINARY);
                self.len_u32(bytes.len(), "binary literal")?;
                self.code.extend_from_slice(bytes);
            }
            Value::Time(t) => {
                self.u8(TAG_TIME);
                self.code
                    .extend_from_slice(&t.and_utc().timestamp_millis().to_be_bytes());
            }
            Value::Tuple(fields) => {
                self.u8(TAG_TUPLE);
                self.len_u16(fields.len(), "tuple literal")?;
                for (name, v) in fields {
                    self.name(name)?;
                    self.value(v)?;
                }
            }
            Value::Relation { heading, rows } => {
                self.u8(TAG_RELATION);
                self.heading(heading)?;
                self.len_u32(rows.len(), "relation literal")?;
                for row in rows {
                    for v in row {
                        self.value(v)?;
                    }
                }
            }
            Value::Heading(h) => {
                self.u8(TAG_HEADING);
                self.heading(h)?;
            }
        }
        Ok(())
    }

    // === instructions ===

    pub fn load_value(&mut self, value: &Value) -> EmitResult {
        self.op(OpCode::LoadValue);
        self.value(value)
    }

    pub fn load_catalog(&mut self, name: &str) -> EmitResult {
        self.op(OpCode::LoadCatalog);
        self.name(name)
    }

    pub fn load_catalog_ref(&mut self, name: &str) -> EmitResult {
        self.op(OpCode::LoadCatalogRef);
        self.name(name)
    }

    pub fn load_field(&mut self, name: &str) -> EmitResult {
        self.op(OpCode::LoadField);
        self.name(name)
    }

    pub fn load_component(&mut self, name: &str) -> EmitResult {
        self.op(OpCode::LoadComponent);
        self.name(name)
    }

    pub fn load_tuple_field(&mut self, name: &str) -> EmitResult {
        self.op(OpCode::LoadTupleField);
        self.name(name)
    }

    pub fn load_acc_block(&mut self) {
        self.op(OpCode::LoadAccBlock);
    }

    pub fn load_lookup(&mut self) {
        self.op(OpCode::LoadLookup);
    }

    pub fn load_segment(&mut self, block: &ExprBlock) -> EmitResult {
        self.op(OpCode::LoadSegment);
        self.name(&block.name)?;
        self.u8(block.kind as u8);
        self.len_u16(block.accums, "accumulator count")?;
        self.u8(block.flags.bits());
        self.heading(&block.lookup)?;
        self.len_u32(block.code.len(), "segment")?;
        self.code.extend_from_slice(block.code.as_bytes());
        Ok(())
    }

    pub fn call(&mut self, name: &str, arity: usize) -> EmitResult {
        self.op(OpCode::Call);
        self.name(name)?;
        self.arity(name, arity)
    }

    pub fn call_var(&mut self, name: &str, fixed: usize, var: usize) -> EmitResult {
        self.op(OpCode::CallVar);
        self.name(name)?;
        self.arity(name, fixed)?;
        self.arity(name, var)
    }

    pub fn call_var_table(&mut self, name: &str, fixed: usize, var: usize) -> EmitResult {
        self.op(OpCode::CallVarTable);
        self.name(name)?;
        self.arity(name, fixed)?;
        self.arity(name, var)
    }

    pub fn end(&mut self) {
        self.op(OpCode::End);
    }
}
