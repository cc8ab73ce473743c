//! Output formatting utilities

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use relq_diagnostics::{Diagnostic, render_diagnostic};
use std::fs;
use std::io::IsTerminal;
use std::path::Path;

/// When to colour terminal output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// How results and diagnostics are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Set up color output based on user preference
pub fn setup_colors(mode: ColorMode) {
    let enabled = match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::io::stdout().is_terminal() && std::io::stderr().is_terminal(),
    };
    colored::control::set_override(enabled);
}

pub fn colors_enabled() -> bool {
    colored::control::SHOULD_COLORIZE.should_colorize()
}

pub fn format_error(error: &anyhow::Error) -> String {
    format!("{} {error:#}", "Error:".red().bold())
}

pub fn format_warning(warning: &str) -> String {
    format!("{} {warning}", "Warning:".yellow().bold())
}

pub fn format_success(message: &str) -> String {
    format!("{} {message}", "Success:".green().bold())
}

/// Render diagnostics against the text they were raised for
pub fn format_diagnostics(diagnostics: &[Diagnostic], source: &str) -> String {
    let color = colors_enabled();
    diagnostics
        .iter()
        .map(|d| render_diagnostic(d, source, color))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Write text to a file, or print it when no file is given
pub fn write_output(content: &str, output_file: Option<&Path>) -> Result<()> {
    match output_file {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write output file: {}", path.display()))?;
            eprintln!("{}", format_success(&format!("Output written to {}", path.display())));
        }
        None => println!("{content}"),
    }
    Ok(())
}

/// Bytes as lowercase hex, two digits per byte
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relq_diagnostics::RQ0103;

    #[test]
    fn hex_pads_each_byte() {
        assert_eq!(hex(&[0, 1, 0xab]), "0001ab");
    }

    #[test]
    fn diagnostics_render_without_color() {
        setup_colors(ColorMode::Never);
        let diagnostic = Diagnostic::error(RQ0103, "type mismatch");
        assert_eq!(format_diagnostics(&[diagnostic], ""), "error[RQ0103]: type mismatch");
    }
}
