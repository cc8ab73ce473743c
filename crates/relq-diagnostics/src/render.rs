//! Caret-marked rendering of diagnostics against their source text

use crate::{Diagnostic, Severity, line_text};

/// Render a diagnostic as the offending source line, a caret line under
/// the reported column and the message.
///
/// ```text
/// x + 'a'
///     ^
/// error[RQ0103]: type mismatch for '+' at 1:5
/// ```
///
/// `color` only has an effect when the `colored` feature is enabled.
pub fn render_diagnostic(diag: &Diagnostic, source: &str, color: bool) -> String {
    let mut out = String::new();

    if let Some(loc) = &diag.location {
        let line = line_text(source, loc.line);
        out.push_str(line);
        out.push('\n');
        let pad: String = line
            .chars()
            .take(loc.column.saturating_sub(1))
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        out.push_str(&pad);
        out.push_str(&paint("^", diag.severity, color));
        out.push('\n');
    }

    let head = format!("{}[{}]", diag.severity, diag.code);
    out.push_str(&paint(&head, diag.severity, color));
    out.push_str(": ");
    out.push_str(&diag.message);
    if let Some(loc) = &diag.location {
        out.push_str(&format!(" at {loc}"));
    }
    if let Some(help) = &diag.help {
        out.push_str("\n  help: ");
        out.push_str(help);
    }
    for related in &diag.related {
        out.push_str("\n  note: ");
        out.push_str(&related.message);
        if let Some(loc) = &related.location {
            out.push_str(&format!(" at {loc}"));
        }
    }
    out
}

#[cfg(feature = "colored")]
fn paint(text: &str, severity: Severity, color: bool) -> String {
    use colored::Colorize;

    if !color {
        return text.to_string();
    }
    match severity {
        Severity::Error => text.red().bold().to_string(),
        Severity::Warning => text.yellow().bold().to_string(),
        Severity::Info => text.cyan().to_string(),
    }
}

#[cfg(not(feature = "colored"))]
fn paint(text: &str, _severity: Severity, _color: bool) -> String {
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RQ0103, SourceLocation};

    #[test]
    fn test_caret_under_column() {
        let source = "a := 1\nx + 'a'";
        let diag = Diagnostic::error(RQ0103, "type mismatch for '+'")
            .with_location(SourceLocation::new(2, 5, 11));

        let text = render_diagnostic(&diag, source, false);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "x + 'a'");
        assert_eq!(lines[1], "    ^");
        assert_eq!(lines[2], "error[RQ0103]: type mismatch for '+' at 2:5");
    }

    #[test]
    fn test_without_location() {
        let diag = Diagnostic::error(RQ0103, "oops").with_help("try again");
        let text = render_diagnostic(&diag, "", false);
        assert_eq!(text, "error[RQ0103]: oops\n  help: try again");
    }
}
