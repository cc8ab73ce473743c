//! Statement driver
//!
//! [`Compiler::process`] is the one entry point hosts call. It splits the
//! input, runs each statement through parse, build, finalize and emit, and
//! reports through the sink. A restartable failure costs only its own
//! statement; an internal one aborts the rest of the input.

use relq_ast::emit_statement;
use relq_bytecode::{ByteCode, disassemble};
use relq_diagnostics::{Diagnostic, RQ0009, RQ0302, RQ0403, RelqError};
use relq_types::{CompileContext, DataType, Value};

use crate::builder::{Builder, Locator};
use crate::catalog::Catalog;
use crate::error::IntoRelq;
use crate::evaluator::Evaluator;
use crate::grammar::parse_statement;
use crate::options::{CompilerOptions, InvalidTraceLevel, TraceLevel};
use crate::sink::DiagnosticSink;
use crate::source::{Chunk, split};

/// A statement that compiled
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub source: String,
    /// Byte offset in the input passed to `process`
    pub offset: usize,
    pub data_type: DataType,
    pub code: ByteCode,
    /// What the evaluator returned, when execution is on
    pub value: Option<Value>,
}

/// A statement that did not
#[derive(Debug, Clone, PartialEq)]
pub struct StatementFailure {
    pub error: RelqError,
    pub offset: usize,
}

pub type StatementOutcome = Result<CompiledStatement, StatementFailure>;

pub struct Compiler<'c> {
    options: CompilerOptions,
    context: CompileContext,
    catalog: &'c mut dyn Catalog,
    evaluator: Option<&'c mut dyn Evaluator>,
    sink: &'c mut dyn DiagnosticSink,
    errors: usize,
    aborted: bool,
    output: Vec<CompiledStatement>,
}

impl<'c> Compiler<'c> {
    pub fn new(catalog: &'c mut dyn Catalog, sink: &'c mut dyn DiagnosticSink) -> Self {
        Self {
            options: CompilerOptions::default(),
            context: CompileContext::new(),
            catalog,
            evaluator: None,
            sink,
            errors: 0,
            aborted: false,
            output: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_evaluator(mut self, evaluator: &'c mut dyn Evaluator) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Errors counted by the last `process` call
    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn aborted(&self) -> bool {
        self.aborted
    }

    /// Every statement compiled so far, across calls
    pub fn output(&self) -> &[CompiledStatement] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<CompiledStatement> {
        std::mem::take(&mut self.output)
    }

    /// Compile `text`; true when every statement succeeded
    ///
    /// Output of successful statements is kept even when others fail.
    pub fn process(&mut self, text: &str) -> bool {
        self.errors = 0;
        self.aborted = false;

        for piece in split(text) {
            let outcome = match piece.chunk {
                Chunk::Directive(directive) => self.directive(directive).map_err(|error| StatementFailure {
                    error: error.or_at(Locator::new(text, piece.offset, 0).offset(0)),
                    offset: piece.offset,
                }),
                Chunk::Statement(statement) => self
                    .statement(statement, piece.offset, text)
                    .map(|compiled| self.output.push(compiled)),
            };
            let Err(failure) = outcome else {
                continue;
            };

            self.sink.diagnostic(&failure.error.to_diagnostic(), text);
            self.context.reset();
            if !failure.error.is_restartable() {
                log::error!("aborting at offset {}: {}", failure.offset, failure.error);
                self.aborted = true;
                self.sink.info("aborted");
                break;
            }
            log::debug!("statement at offset {} failed: {}", failure.offset, failure.error);
            self.errors += 1;
            if self.options.stop_on_error {
                break;
            }
        }

        let success = self.errors == 0 && !self.aborted;
        log::debug!(
            "processed input: {} error(s){}",
            self.errors,
            if self.aborted { ", aborted" } else { "" }
        );
        success
    }

    /// Compile one statement of `source` found at `offset`
    pub fn compile_statement(&mut self, text: &str, offset: usize, source: &str) -> StatementOutcome {
        self.statement(text, offset, source)
    }

    fn statement(&mut self, text: &str, offset: usize, source: &str) -> StatementOutcome {
        let fail = move |error: RelqError| StatementFailure { error, offset };
        let locate = Locator::new(source, offset, text.len());
        log::debug!("compiling statement at offset {offset}");
        if self.options.trace >= TraceLevel::Echo {
            self.sink.echo(text);
        }

        let syntax = parse_statement(text)
            .map_err(|e| fail(RelqError::parse_at(e.code, e.message, locate.offset(e.offset))))?;
        let statement = Builder::new(&mut self.context, &mut *self.catalog, locate)
            .statement(&syntax)
            .map_err(fail)?;
        if self.context.depth() != 0 || !self.context.in_sync() {
            return Err(fail(RelqError::internal(RQ0302, "scope left open after statement")));
        }
        statement
            .finalize()
            .map_err(|e| fail(e.into_relq().or_at(locate.offset(0))))?;
        let code = emit_statement(&statement).map_err(|e| fail(e.into_relq()))?;

        let data_type = statement.data_type();
        if self.options.trace >= TraceLevel::Types {
            self.sink.result_type(&data_type);
        }
        if self.options.trace >= TraceLevel::Disassembly {
            match disassemble(&code) {
                Ok(listing) => self.sink.disassembly(&listing),
                Err(e) => log::warn!("cannot disassemble statement at offset {offset}: {e}"),
            }
        }

        let value = if self.options.execute {
            self.execute(&code).map_err(fail)?
        } else {
            None
        };
        self.catalog
            .register(&statement)
            .map_err(|e| fail(e.into_relq().or_at(locate.offset(0))))?;
        Ok(CompiledStatement {
            source: text.to_string(),
            offset,
            data_type,
            code,
            value,
        })
    }

    fn execute(&mut self, code: &ByteCode) -> Result<Option<Value>, RelqError> {
        let Some(evaluator) = self.evaluator.as_deref_mut() else {
            log::warn!("execution is on but no evaluator is attached");
            return Ok(None);
        };
        let value = evaluator.exec(code, None)?;
        self.sink.value(&value);
        Ok(Some(value))
    }

    fn directive(&mut self, text: &str) -> Result<(), RelqError> {
        let mut words = text.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some("trace"), Some(level), None) => {
                self.options.trace = level
                    .parse()
                    .map_err(|e: InvalidTraceLevel| RelqError::system(RQ0403, e.to_string()))?;
                log::debug!("trace level {}", self.options.trace);
                Ok(())
            }
            (Some("catalog"), Some("load"), None) => {
                let loaded = self.catalog.load().map_err(IntoRelq::into_relq)?;
                self.sink.info(&format!("catalog loaded: {loaded} entries"));
                Ok(())
            }
            (Some("catalog"), Some("save"), None) => {
                let saved = self.catalog.save().map_err(IntoRelq::into_relq)?;
                self.sink.info(&format!("catalog saved: {saved} entries"));
                Ok(())
            }
            (Some("exec"), Some(flag @ ("on" | "off")), None) => {
                self.options.execute = flag == "on";
                if self.options.execute && self.evaluator.is_none() {
                    let warning = Diagnostic::warning(RQ0403, "execution enabled without an evaluator");
                    self.sink.diagnostic(&warning, "");
                }
                Ok(())
            }
            _ => Err(RelqError::parse(RQ0009, format!("unknown directive '#{text}'"))),
        }
    }
}
