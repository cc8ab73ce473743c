//! relq front-end compiler
//!
//! Source text goes in, one [`ByteCode`](relq_bytecode::ByteCode) per
//! statement comes out. The pipeline for each statement is
//!
//! 1. split the input into statements and directives,
//! 2. parse the statement with the reference grammar,
//! 3. build a typed tree through the [`AstFactory`],
//! 4. finalize and emit it.
//!
//! Hosts drive everything through [`Compiler::process`], supplying a
//! [`Catalog`], a [`DiagnosticSink`] and optionally an [`Evaluator`].
//!
//! ```
//! use relq_compiler::{BufferSink, Compiler, MemoryCatalog};
//!
//! let mut catalog = MemoryCatalog::new();
//! let mut sink = BufferSink::new();
//! let mut compiler = Compiler::new(&mut catalog, &mut sink);
//! assert!(compiler.process("x := 1 + 2 * 3"));
//! ```

pub mod allbut;
mod builder;
pub mod catalog;
mod driver;
mod error;
pub mod evaluator;
pub mod factory;
pub mod grammar;
pub mod infix;
pub mod options;
pub mod sink;
mod source;

pub use catalog::{Catalog, CatalogError, CatalogResult, MemoryCatalog};
pub use driver::{CompiledStatement, Compiler, StatementFailure, StatementOutcome};
pub use error::FactoryResult;
pub use evaluator::{Evaluator, ProgramError};
pub use factory::AstFactory;
pub use grammar::{SyntaxError, parse_statement};
pub use options::{CompilerOptions, InvalidTraceLevel, TraceLevel};
pub use sink::{BufferSink, DiagnosticSink, WriterSink};
