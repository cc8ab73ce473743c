//! Bytecode operation codes.
//!
//! The evaluator is a stack machine. Loads push one value, calls pop their
//! arguments and push one result. Each opcode is a single byte with its
//! operands following inline.

/// Operand shapes following an opcode byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// u16 length then UTF-8 bytes
    Name,
    /// Tagged literal value
    Value,
    /// u8 argument count
    Arity,
    /// Segment header then u32 length then nested code
    Segment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// End of statement.
    End = 0,
    /// Push a literal.
    /// Operand: value
    LoadValue,
    /// Push a catalog variable's value.
    /// Operand: name
    LoadCatalog,
    /// Push a reference to a catalog entry, e.g. a function's code.
    /// Operand: name
    LoadCatalogRef,
    /// Push a column of the current lookup row.
    /// Operand: name
    LoadField,
    /// Pop a user type value, push one of its components.
    /// Operand: name
    LoadComponent,
    /// Pop a tuple, push one of its fields.
    /// Operand: name
    LoadTupleField,
    /// Push the accumulator block of the running segment.
    LoadAccBlock,
    /// Push the current lookup row.
    LoadLookup,
    /// Push a code segment as a value.
    /// Operand: segment
    LoadSegment,
    /// Call with a fixed argument count.
    /// Operands: name, arity
    Call,
    /// Call with fixed plus variable arguments, returning a value.
    /// Operands: name, fixed arity, variable arity
    CallVar,
    /// Call with fixed plus variable arguments, returning a relation.
    /// Operands: name, fixed arity, variable arity
    CallVarTable,
}

impl OpCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::End,
            1 => Self::LoadValue,
            2 => Self::LoadCatalog,
            3 => Self::LoadCatalogRef,
            4 => Self::LoadField,
            5 => Self::LoadComponent,
            6 => Self::LoadTupleField,
            7 => Self::LoadAccBlock,
            8 => Self::LoadLookup,
            9 => Self::LoadSegment,
            10 => Self::Call,
            11 => Self::CallVar,
            12 => Self::CallVarTable,
            _ => return None,
        })
    }

    /// Operands following the opcode byte, in order
    pub fn operands(&self) -> &'static [Operand] {
        match self {
            Self::End | Self::LoadAccBlock | Self::LoadLookup => &[],
            Self::LoadValue => &[Operand::Value],
            Self::LoadCatalog
            | Self::LoadCatalogRef
            | Self::LoadField
            | Self::LoadComponent
            | Self::LoadTupleField => &[Operand::Name],
            Self::LoadSegment => &[Operand::Segment],
            Self::Call => &[Operand::Name, Operand::Arity],
            Self::CallVar | Self::CallVarTable => &[Operand::Name, Operand::Arity, Operand::Arity],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::End => "END",
            Self::LoadValue => "LOAD_VALUE",
            Self::LoadCatalog => "LOAD_CATALOG",
            Self::LoadCatalogRef => "LOAD_CATALOG_REF",
            Self::LoadField => "LOAD_FIELD",
            Self::LoadComponent => "LOAD_COMPONENT",
            Self::LoadTupleField => "LOAD_TUPLE_FIELD",
            Self::LoadAccBlock => "LOAD_ACC_BLOCK",
            Self::LoadLookup => "LOAD_LOOKUP",
            Self::LoadSegment => "LOAD_SEGMENT",
            Self::Call => "CALL",
            Self::CallVar => "CALL_VAR",
            Self::CallVarTable => "CALL_VAR_TABLE",
        }
    }
}
