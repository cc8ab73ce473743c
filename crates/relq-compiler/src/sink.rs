//! Diagnostic output
//!
//! The driver reports through a [`DiagnosticSink`] supplied by the host:
//! echoed source, rendered errors, result types and disassembly.

use relq_diagnostics::{Diagnostic, render_diagnostic};
use relq_types::{DataType, Value};
use std::io::Write;

pub trait DiagnosticSink {
    /// Source of the statement about to be compiled
    fn echo(&mut self, source: &str);

    /// An error or warning against `source`
    fn diagnostic(&mut self, diagnostic: &Diagnostic, source: &str);

    fn result_type(&mut self, data_type: &DataType);

    fn disassembly(&mut self, text: &str);

    /// Value returned by the evaluator
    fn value(&mut self, value: &Value);

    /// Free-form progress line
    fn info(&mut self, message: &str);
}

/// Writes rendered lines to any `io::Write`
pub struct WriterSink<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, color: false }
    }

    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            log::warn!("diagnostic output failed: {e}");
        }
    }
}

impl<W: Write> DiagnosticSink for WriterSink<W> {
    fn echo(&mut self, source: &str) {
        for line in source.lines() {
            self.line(&format!("> {line}"));
        }
    }

    fn diagnostic(&mut self, diagnostic: &Diagnostic, source: &str) {
        let rendered = render_diagnostic(diagnostic, source, self.color);
        self.line(&rendered);
    }

    fn result_type(&mut self, data_type: &DataType) {
        self.line(&format!(": {data_type}"));
    }

    fn disassembly(&mut self, text: &str) {
        self.line(text.trim_end());
    }

    fn value(&mut self, value: &Value) {
        self.line(&format!("= {value}"));
    }

    fn info(&mut self, message: &str) {
        self.line(message);
    }
}

/// Collects everything in memory
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    pub lines: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

impl DiagnosticSink for BufferSink {
    fn echo(&mut self, source: &str) {
        self.lines.push(format!("> {source}"));
    }

    fn diagnostic(&mut self, diagnostic: &Diagnostic, source: &str) {
        self.lines.push(render_diagnostic(diagnostic, source, false));
        self.diagnostics.push(diagnostic.clone());
    }

    fn result_type(&mut self, data_type: &DataType) {
        self.lines.push(format!(": {data_type}"));
    }

    fn disassembly(&mut self, text: &str) {
        self.lines.push(text.trim_end().to_string());
    }

    fn value(&mut self, value: &Value) {
        self.lines.push(format!("= {value}"));
    }

    fn info(&mut self, message: &str) {
        self.lines.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relq_diagnostics::{RQ0103, SourceLocation};

    #[test]
    fn writer_sink_renders_caret() {
        let mut sink = WriterSink::new(Vec::new());
        let source = "1 + 'a'";
        let diag = Diagnostic::error(RQ0103, "type mismatch for '+'")
            .with_location(SourceLocation::from_offset(2, source));
        sink.diagnostic(&diag, source);
        sink.result_type(&DataType::Number);
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.contains("1 + 'a'\n  ^\n"));
        assert!(text.contains("error[RQ0103]"));
        assert!(text.ends_with(": number\n"));
    }

    #[test]
    fn buffer_sink_counts_diagnostics() {
        let mut sink = BufferSink::new();
        sink.info("aborted");
        sink.diagnostic(&Diagnostic::error(RQ0103, "x"), "");
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.lines[0], "aborted");
    }
}
