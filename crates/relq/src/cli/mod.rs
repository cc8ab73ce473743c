//! CLI functionality for the relq tool
//!
//! One module per subcommand, plus shared output formatting.

pub mod check;
pub mod compile;
pub mod disasm;
pub mod output;
pub mod repl;
