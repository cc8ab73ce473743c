//! Disasm command implementation

use super::output;
use crate::{CompilerOptions, compile, disassemble};
use anyhow::{Context, Result};
use colored::Colorize;
use std::fmt::Write;
use std::path::PathBuf;

/// Configuration for disasm command
pub struct DisasmConfig {
    pub file: PathBuf,
    pub output_file: Option<PathBuf>,
}

/// Print the bytecode listing of every statement in a file
pub fn disasm(config: DisasmConfig) -> Result<bool> {
    let source = output::read_source(&config.file)?;
    let result = compile(&source, CompilerOptions::default());
    if !result.diagnostics.is_empty() {
        eprintln!("{}", output::format_diagnostics(&result.diagnostics, &source));
    }

    let mut listing = String::new();
    for statement in &result.statements {
        let header = format!("-- {} : {}", statement.source.replace('\n', " "), statement.data_type);
        writeln!(listing, "{}", header.dimmed())?;
        let text = disassemble(&statement.code)
            .with_context(|| format!("Failed to decode statement at offset {}", statement.offset))?;
        listing.push_str(&text);
    }
    output::write_output(listing.trim_end(), config.output_file.as_deref())?;
    Ok(result.success)
}
