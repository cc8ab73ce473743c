//! relq typed syntax tree
//!
//! Nodes are built bottom-up by the compiler's factory, already type checked,
//! and lowered to bytecode by a single exhaustive match in [`emit_node`].

mod emit;
mod error;
mod node;
mod statement;
mod transform;

pub use emit::{emit_node, emit_segment, emit_statement};
pub use error::{AstError, AstResult};
pub use node::*;
pub use statement::*;
pub use transform::*;

pub use relq_bytecode::{BlockFlags, ExprKind};
