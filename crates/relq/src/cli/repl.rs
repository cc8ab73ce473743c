//! REPL implementation
//!
//! One catalog lives for the whole session, so assignments, functions and
//! types carry over between inputs. A line ending in `\` continues on the
//! next one. `#` directives work as they do in files.

use super::output;
use crate::{Catalog, Compiler, CompilerOptions, MemoryCatalog, TraceLevel, WriterSink};
use anyhow::Result;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io;

/// Configuration for REPL
pub struct ReplConfig {
    pub options: CompilerOptions,
}

struct ReplState {
    catalog: MemoryCatalog,
    options: CompilerOptions,
}

impl ReplState {
    /// Compile one input, keeping directive changes for the next
    fn submit(&mut self, text: &str) {
        let mut sink = WriterSink::new(io::stderr()).with_color(output::colors_enabled());
        let mut compiler = Compiler::new(&mut self.catalog, &mut sink).with_options(self.options.clone());
        compiler.process(text);
        if compiler.options().trace < TraceLevel::Types {
            for statement in compiler.output() {
                println!("{}", format!(": {}", statement.data_type).green());
            }
        }
        self.options = compiler.options().clone();
    }
}

/// Run the interactive REPL
pub fn run(config: ReplConfig) -> Result<()> {
    println!("{}", "relq interactive compiler".cyan().bold());
    println!("Type {} for help, {} to quit", ":help".green(), ":quit".green());
    println!();

    let mut state = ReplState {
        catalog: MemoryCatalog::new(),
        options: config.options,
    };
    let mut rl = DefaultEditor::new()?;
    let mut pending = String::new();

    loop {
        let prompt = if pending.is_empty() { "relq> " } else { "  ... " };
        match rl.readline(prompt) {
            Ok(line) => {
                if let Some(head) = line.strip_suffix('\\') {
                    pending.push_str(head);
                    pending.push('\n');
                    continue;
                }
                pending.push_str(&line);
                let input = std::mem::take(&mut pending);
                let input = input.trim();
                if input.is_empty() {
                    continue;
                }
                rl.add_history_entry(input)?;

                if input.starts_with(':') {
                    match handle_command(input, &mut state) {
                        Ok(false) => break,
                        Ok(true) => {}
                        Err(e) => eprintln!("{}", output::format_error(&e)),
                    }
                    continue;
                }
                state.submit(input);
            }
            Err(ReadlineError::Interrupted) => {
                pending.clear();
                println!("^C");
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", output::format_error(&anyhow::Error::from(err)));
                break;
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

/// Handle REPL commands (starting with :); false means quit
fn handle_command(command: &str, state: &mut ReplState) -> Result<bool> {
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let rest: Vec<&str> = parts.collect();

    match name {
        ":help" | ":h" => print_help(),
        ":quit" | ":q" | ":exit" => return Ok(false),
        ":list" | ":ls" => {
            if state.catalog.is_empty() {
                println!("(catalog is empty)");
            }
            for symbol in state.catalog.iter() {
                println!("  {} {} : {}", symbol.kind.to_string().dimmed(), symbol.name.cyan(), symbol.data_type);
            }
        }
        ":type" | ":t" => {
            if rest.is_empty() {
                anyhow::bail!("Usage: :type <name>");
            }
            for ident in rest {
                match state.catalog.find_ident(ident) {
                    Some(symbol) => println!("{} : {}", ident.cyan(), symbol.data_type),
                    None => println!("{} is not defined", ident.cyan()),
                }
            }
        }
        ":clear" | ":c" => {
            state.catalog = MemoryCatalog::new();
            println!("{}", output::format_success("catalog cleared"));
        }
        ":options" => println!("{:?}", state.options),
        other => anyhow::bail!("Unknown command: {other}. Type :help for help"),
    }
    Ok(true)
}

fn print_help() {
    println!("{}", "Commands".bold());
    println!("  :help, :h        show this help");
    println!("  :quit, :q        leave the REPL");
    println!("  :list, :ls       list catalog entries");
    println!("  :type, :t NAME   show the type of a catalog entry");
    println!("  :clear, :c       empty the catalog");
    println!("  :options         show compiler options");
    println!();
    println!("{}", "Directives".bold());
    println!("  #trace 0-3       echo, types, disassembly");
    println!("  #exec on|off     run statements through the evaluator");
    println!("  #catalog save    snapshot the catalog");
    println!("  #catalog load    restore the last snapshot");
}
