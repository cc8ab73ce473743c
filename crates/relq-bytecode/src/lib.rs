//! relq bytecode
//!
//! The instruction stream a compiled statement is lowered to: opcodes,
//! the forward-only `Emitter`, and the `Decoder` used for tracing.

mod code;
mod decode;
mod encode;
mod opcode;
mod segment;

pub use code::ByteCode;
pub use decode::{DecodeError, Decoder, Instruction, disassemble};
pub use encode::{EmitError, Emitter};
pub use opcode::{OpCode, Operand};
pub use segment::{BlockFlags, ExprBlock, ExprKind};
