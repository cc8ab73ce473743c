//! Compile command implementation

use super::output::{self, OutputFormat};
use crate::{CompiledStatement, CompilerOptions, compile};
use anyhow::{Context, Result};
use serde_json::json;
use std::fs;
use std::path::PathBuf;

/// Configuration for compile command
pub struct CompileConfig {
    pub file: PathBuf,
    pub options: CompilerOptions,
    pub format: OutputFormat,
    /// Raw bytecode of every statement, concatenated
    pub output_file: Option<PathBuf>,
}

/// Compile a file; false when any statement failed
pub fn compile_file(config: CompileConfig) -> Result<bool> {
    let source = output::read_source(&config.file)?;
    let result = compile(&source, config.options);

    for line in &result.lines {
        eprintln!("{line}");
    }

    match config.format {
        OutputFormat::Text => {
            if !result.diagnostics.is_empty() {
                eprintln!("{}", output::format_diagnostics(&result.diagnostics, &source));
            }
            for statement in &result.statements {
                println!("{}", describe(statement));
            }
        }
        OutputFormat::Json => {
            let statements: Vec<_> = result
                .statements
                .iter()
                .map(|s| {
                    json!({
                        "offset": s.offset,
                        "source": s.source,
                        "type": s.data_type.to_string(),
                        "code": output::hex(s.code.as_bytes()),
                    })
                })
                .collect();
            let report = json!({
                "success": result.success,
                "statements": statements,
                "diagnostics": result.diagnostics,
            });
            let text = serde_json::to_string_pretty(&report).context("Failed to serialize output")?;
            println!("{text}");
        }
    }

    if let Some(path) = &config.output_file {
        let bytes: Vec<u8> = result
            .statements
            .iter()
            .flat_map(|s| s.code.as_bytes().iter().copied())
            .collect();
        fs::write(path, &bytes).with_context(|| format!("Failed to write bytecode to {}", path.display()))?;
        eprintln!(
            "{}",
            output::format_success(&format!("{} bytes written to {}", bytes.len(), path.display()))
        );
    }

    Ok(result.success)
}

fn describe(statement: &CompiledStatement) -> String {
    let first_line = statement.source.lines().next().unwrap_or_default();
    format!(
        "{:>5}  {:>4} bytes  {}  : {}",
        statement.offset,
        statement.code.len(),
        first_line,
        statement.data_type
    )
}
