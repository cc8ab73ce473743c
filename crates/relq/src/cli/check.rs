//! Check command implementation

use super::output::{self, OutputFormat};
use crate::{Compilation, CompilerOptions, compile};
use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;

/// Configuration for check command
pub struct CheckConfig {
    pub files: Vec<PathBuf>,
    /// Treat warnings as errors
    pub strict: bool,
    pub format: OutputFormat,
    pub verbose: bool,
}

struct FileReport {
    file: PathBuf,
    source: String,
    result: Compilation,
}

/// Type check files without printing bytecode
pub fn check(config: CheckConfig) -> Result<bool> {
    if config.files.is_empty() {
        anyhow::bail!("No files specified");
    }

    let mut reports = Vec::with_capacity(config.files.len());
    for file in &config.files {
        if config.verbose {
            eprintln!("Checking: {}", file.display());
        }
        let source = output::read_source(file)?;
        let result = compile(&source, CompilerOptions::default());
        reports.push(FileReport {
            file: file.clone(),
            source,
            result,
        });
    }

    let errors: usize = reports.iter().map(|r| r.result.error_count()).sum();
    let warnings: usize = reports.iter().map(|r| r.result.warning_count()).sum();

    match config.format {
        OutputFormat::Json => print_json(&reports)?,
        OutputFormat::Text => {
            for report in &reports {
                print_report(report);
            }
            println!();
            print_summary(reports.len(), errors, warnings);
        }
    }

    if config.strict && warnings > 0 {
        eprintln!("{}", output::format_warning("strict mode: treating warnings as errors"));
        return Ok(false);
    }
    Ok(errors == 0 && reports.iter().all(|r| r.result.success))
}

fn print_report(report: &FileReport) {
    let status = if report.result.success {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!(
        "{status} {} ({} statement(s))",
        report.file.display().to_string().cyan(),
        report.result.statements.len()
    );
    if !report.result.diagnostics.is_empty() {
        println!("{}", output::format_diagnostics(&report.result.diagnostics, &report.source));
    }
}

fn print_summary(files: usize, errors: usize, warnings: usize) {
    if errors == 0 && warnings == 0 {
        println!("{}", output::format_success(&format!("{files} file(s) checked")));
        return;
    }
    let mut summary = Vec::new();
    if errors > 0 {
        summary.push(format!("{errors} error(s)").red().to_string());
    }
    if warnings > 0 {
        summary.push(format!("{warnings} warning(s)").yellow().to_string());
    }
    eprintln!("{} {}", "Check found".bold(), summary.join(", "));
}

fn print_json(reports: &[FileReport]) -> Result<()> {
    let files: Vec<_> = reports
        .iter()
        .map(|r| {
            json!({
                "file": r.file.display().to_string(),
                "success": r.result.success,
                "statements": r.result.statements.len(),
                "diagnostics": r.result.diagnostics,
            })
        })
        .collect();
    let text = serde_json::to_string_pretty(&files)?;
    println!("{text}");
    Ok(())
}
