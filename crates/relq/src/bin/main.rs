//! relq command-line interface

use anyhow::Result;
use clap::{Parser, Subcommand};
use relq::cli::output::{self, ColorMode, OutputFormat};
use relq::cli::{check, compile, disasm, repl};
use relq::{CompilerOptions, TraceLevel};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::filter::LevelFilter;

/// relq command-line tool
#[derive(Parser)]
#[command(name = "relq")]
#[command(author, version, about = "Relational query language compiler", long_about = None)]
struct Cli {
    /// Log compiler internals to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t, global = true)]
    format: OutputFormat,

    /// Color output
    #[arg(long, value_enum, default_value_t, global = true)]
    color: ColorMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a source file to bytecode
    Compile {
        /// Source file to compile
        file: PathBuf,

        /// Write the concatenated bytecode here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Trace level: 1 echo, 2 types, 3 disassembly
        #[arg(short, long, default_value = "0")]
        trace: TraceLevel,

        /// Stop at the first failed statement
        #[arg(long)]
        stop_on_error: bool,
    },

    /// Type check source files
    Check {
        /// Source files to check
        files: Vec<PathBuf>,

        /// Treat warnings as errors
        #[arg(short, long)]
        strict: bool,
    },

    /// Print the bytecode listing of a source file
    Disasm {
        /// Source file to disassemble
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start the interactive compiler
    Repl {
        /// Initial trace level
        #[arg(short, long, default_value = "2")]
        trace: TraceLevel,
    },
}

fn main() -> ExitCode {
    human_panic::setup_panic!();

    let cli = Cli::parse();
    output::setup_colors(cli.color);
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::WARN })
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}", output::format_error(&e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let color = output::colors_enabled();
    match cli.command {
        Commands::Compile {
            file,
            output,
            trace,
            stop_on_error,
        } => compile::compile_file(compile::CompileConfig {
            file,
            options: CompilerOptions::new()
                .with_trace(trace)
                .with_stop_on_error(stop_on_error)
                .with_color(color),
            format: cli.format,
            output_file: output,
        }),

        Commands::Check { files, strict } => check::check(check::CheckConfig {
            files,
            strict,
            format: cli.format,
            verbose: cli.verbose,
        }),

        Commands::Disasm { file, output } => disasm::disasm(disasm::DisasmConfig {
            file,
            output_file: output,
        }),

        Commands::Repl { trace } => {
            repl::run(repl::ReplConfig {
                options: CompilerOptions::new().with_trace(trace).with_color(color),
            })?;
            Ok(true)
        }
    }
}
