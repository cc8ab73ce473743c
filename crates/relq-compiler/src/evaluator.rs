//! Evaluator collaborator
//!
//! Executing bytecode is not the compiler's job. When immediate execution
//! is on, the driver hands every compiled statement to an [`Evaluator`].

use relq_bytecode::ByteCode;
use relq_diagnostics::{ErrorCode, RQ0200, RQ0201, RQ0202, RelqError};
use relq_types::Value;
use thiserror::Error;

/// A runtime fault raised by the evaluator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgramError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("unsupported instruction {instruction}")]
    Unsupported { instruction: String },

    #[error("{message}")]
    Failed { message: String },
}

impl ProgramError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DivisionByZero => RQ0201,
            Self::Unsupported { .. } => RQ0202,
            Self::Failed { .. } => RQ0200,
        }
    }
}

impl From<ProgramError> for RelqError {
    fn from(e: ProgramError) -> Self {
        RelqError::program(e.code(), e.to_string())
    }
}

pub trait Evaluator {
    /// Run one compiled statement
    ///
    /// `argument_row` is the row bound to lookups, `None` at top level.
    fn exec(&mut self, code: &ByteCode, argument_row: Option<&Value>) -> Result<Value, ProgramError>;
}
