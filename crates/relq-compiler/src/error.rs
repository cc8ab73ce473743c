//! Layer errors to `RelqError`
//!
//! Each lower layer has its own `thiserror` enum. They meet the diagnostic
//! model here, where every failure gets its error code and is sorted into
//! restartable (semantic, system) or fatal (internal).

use relq_ast::AstError;
use relq_diagnostics::{ErrorCode, RQ0102, RQ0105, RQ0110, RQ0111, RQ0112, RQ0302, RelqError};
use relq_types::{AccumError, ContextError, HeadingError, ScopeError, TypeError};

use crate::allbut::AllButError;
use crate::catalog::CatalogError;

pub type FactoryResult<T> = Result<T, RelqError>;

pub fn semantic(code: ErrorCode, message: impl Into<String>) -> RelqError {
    RelqError::semantic(code, message)
}

/// Conversion into the shared error type
pub trait IntoRelq {
    fn into_relq(self) -> RelqError;
}

impl IntoRelq for TypeError {
    fn into_relq(self) -> RelqError {
        if self.is_internal() {
            RelqError::internal(self.code(), self.to_string())
        } else {
            RelqError::semantic(self.code(), self.to_string())
        }
    }
}

impl IntoRelq for AccumError {
    fn into_relq(self) -> RelqError {
        match self {
            Self::AggregateOutsideGrouping { .. } => semantic(RQ0110, self.to_string()),
            Self::WindowOutsideTransform { .. } => semantic(RQ0111, self.to_string()),
            Self::Underflow => RelqError::internal(RQ0302, self.to_string()),
        }
    }
}

impl IntoRelq for ScopeError {
    fn into_relq(self) -> RelqError {
        match self {
            Self::Duplicate { .. } => semantic(RQ0102, self.to_string()),
            Self::Underflow => RelqError::internal(RQ0302, self.to_string()),
        }
    }
}

impl IntoRelq for ContextError {
    fn into_relq(self) -> RelqError {
        match self {
            Self::Scope(e) => e.into_relq(),
            Self::Accum(e) => e.into_relq(),
        }
    }
}

impl IntoRelq for HeadingError {
    fn into_relq(self) -> RelqError {
        match self {
            Self::DuplicateColumn { .. } => semantic(RQ0105, self.to_string()),
            Self::UnknownColumn { .. } => semantic(RQ0112, self.to_string()),
        }
    }
}

impl IntoRelq for CatalogError {
    fn into_relq(self) -> RelqError {
        if self.is_system() {
            RelqError::system(self.code(), self.to_string())
        } else {
            semantic(self.code(), self.to_string())
        }
    }
}

impl IntoRelq for AllButError {
    fn into_relq(self) -> RelqError {
        semantic(self.code(), self.to_string())
    }
}

impl IntoRelq for AstError {
    fn into_relq(self) -> RelqError {
        RelqError::internal(self.code(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relq_diagnostics::{RQ0103, RQ0301};

    #[test]
    fn internal_errors_are_not_restartable() {
        let placeholder = TypeError::UnresolvedReturn { name: "succ".into() }.into_relq();
        assert_eq!(placeholder.code(), RQ0301);
        assert!(!placeholder.is_restartable());

        let mismatch = TypeError::TypeMismatch {
            name: "+".into(),
            args: "number, text".into(),
        }
        .into_relq();
        assert_eq!(mismatch.code(), RQ0103);
        assert!(mismatch.is_restartable());
        assert!(!AccumError::Underflow.into_relq().is_restartable());
    }

    #[test]
    fn catalog_io_is_a_system_error() {
        let err = CatalogError::Load {
            reason: "missing".into(),
        }
        .into_relq();
        assert!(matches!(err, RelqError::System { .. }));
        assert!(err.is_restartable());
    }
}
