use pretty_assertions::assert_eq;
use relq::cli::check::{CheckConfig, check};
use relq::cli::compile::{CompileConfig, compile_file};
use relq::cli::disasm::{DisasmConfig, disasm};
use relq::cli::output::OutputFormat;
use relq::{CompilerOptions, Severity, TraceLevel, compile, disassemble};
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn source_file(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn compile_keeps_good_statements() {
    let result = compile("a := 1\nb := a + 'x'\nc := a * 2", CompilerOptions::default());
    assert!(!result.success);
    assert_eq!(result.statements.len(), 2);
    assert_eq!(result.error_count(), 1);
    assert_eq!(result.warning_count(), 0);
}

#[test]
fn exec_without_evaluator_is_a_warning() {
    let result = compile("#exec on\n1 + 1", CompilerOptions::default());
    assert!(result.success);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].severity, Severity::Warning);
}

#[test]
fn trace_lines_are_collected() {
    let options = CompilerOptions::new().with_trace(TraceLevel::Disassembly);
    let result = compile("2 * 3", options);
    assert_eq!(result.lines[0], "> 2 * 3");
    assert_eq!(result.lines[1], ": number");
    assert_eq!(result.lines[2], disassemble(&result.statements[0].code).unwrap().trim_end());
}

#[test]
fn compile_writes_concatenated_bytecode() {
    let dir = TempDir::new().unwrap();
    let file = source_file(&dir, "prog.rq", "x := 1\nx + 1\n");
    let out = dir.path().join("prog.rqc");
    let ok = compile_file(CompileConfig {
        file,
        options: CompilerOptions::default(),
        format: OutputFormat::Json,
        output_file: Some(out.clone()),
    })
    .unwrap();
    assert!(ok);

    let expected = compile("x := 1\nx + 1\n", CompilerOptions::default());
    let bytes: Vec<u8> = expected
        .statements
        .iter()
        .flat_map(|s| s.code.as_bytes().to_vec())
        .collect();
    assert_eq!(fs::read(out).unwrap(), bytes);
}

#[rstest]
#[case("x := 1\nx * 2\n", true)]
#[case("x := 1\nx * 'two'\n", false)]
fn check_reports_failures(#[case] text: &str, #[case] expected: bool) {
    let dir = TempDir::new().unwrap();
    let file = source_file(&dir, "check.rq", text);
    let ok = check(CheckConfig {
        files: vec![file],
        strict: false,
        format: OutputFormat::Text,
        verbose: false,
    })
    .unwrap();
    assert_eq!(ok, expected);
}

#[test]
fn strict_check_fails_on_warnings() {
    let dir = TempDir::new().unwrap();
    let file = source_file(&dir, "warn.rq", "#exec on\n1\n");
    let config = |strict| CheckConfig {
        files: vec![file.clone()],
        strict,
        format: OutputFormat::Json,
        verbose: false,
    };
    assert!(check(config(false)).unwrap());
    assert!(!check(config(true)).unwrap());
}

#[test]
fn missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = disasm(DisasmConfig {
        file: dir.path().join("nope.rq"),
        output_file: None,
    })
    .unwrap_err();
    assert!(format!("{err:#}").contains("nope.rq"));
}

#[test]
fn disasm_writes_listing() {
    let dir = TempDir::new().unwrap();
    let file = source_file(&dir, "list.rq", "1 + 2\n");
    let out = dir.path().join("list.txt");
    assert!(
        disasm(DisasmConfig {
            file,
            output_file: Some(out.clone()),
        })
        .unwrap()
    );
    let listing = fs::read_to_string(out).unwrap();
    assert!(listing.contains("CALL +/2"), "{listing}");
    assert!(listing.trim_end().ends_with("END"), "{listing}");
}
