//! relq: a front-end compiler for a small relational query language
//!
//! Statements are parsed, type checked against a catalog and lowered to a
//! compact stack bytecode for an external evaluator. This crate re-exports
//! the layers and adds the `relq` command-line tool.
//!
//! # Example
//!
//! ```
//! use relq::{CompilerOptions, compile};
//!
//! let result = compile("x := 2\nx * 21", CompilerOptions::default());
//! assert!(result.success);
//! assert_eq!(result.statements.len(), 2);
//! ```

pub use relq_ast as ast;
pub use relq_bytecode as bytecode;
pub use relq_compiler as compiler;
pub use relq_diagnostics as diagnostics;
pub use relq_types as types;

pub use relq_bytecode::{ByteCode, disassemble};
pub use relq_compiler::{
    BufferSink, Catalog, CompiledStatement, Compiler, CompilerOptions, DiagnosticSink, Evaluator, MemoryCatalog,
    TraceLevel, WriterSink,
};
pub use relq_diagnostics::{Diagnostic, RelqError, Severity};

#[cfg(feature = "cli")]
pub mod cli;

/// Everything one pass over a source text produced
#[derive(Debug, Clone, Default)]
pub struct Compilation {
    pub statements: Vec<CompiledStatement>,
    pub diagnostics: Vec<Diagnostic>,
    /// Trace output: echoed source, result types, disassembly
    pub lines: Vec<String>,
    pub success: bool,
}

impl Compilation {
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }
}

/// Compile `source` against a fresh in-memory catalog
pub fn compile(source: &str, options: CompilerOptions) -> Compilation {
    let mut catalog = MemoryCatalog::new();
    let mut sink = BufferSink::new();
    let mut compiler = Compiler::new(&mut catalog, &mut sink).with_options(options);
    let success = compiler.process(source);
    let statements = compiler.take_output();
    drop(compiler);
    Compilation {
        statements,
        diagnostics: sink.diagnostics,
        lines: sink.lines,
        success,
    }
}
