use relq_bytecode::EmitError;
use relq_diagnostics::{ErrorCode, RQ0301};
use relq_types::DataType;
use thiserror::Error;

/// Failures while finalizing or lowering a tree
///
/// Both are compiler defects: the factory only builds checked nodes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AstError {
    #[error("{shape} finalized with placeholder type {data_type}")]
    Placeholder { shape: &'static str, data_type: DataType },

    #[error(transparent)]
    Emit(#[from] EmitError),
}

impl AstError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Placeholder { .. } => RQ0301,
            Self::Emit(e) => e.code(),
        }
    }
}

pub type AstResult<T = ()> = Result<T, AstError>;
