//! relq error types

use crate::{ErrorCode, RQ0300, SourceLocation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// How bad a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// The statement cannot be compiled
    Error,
    /// Potential issue but compilation continues
    Warning,
    /// Informational message
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// One reported problem: code, severity, message and where it happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub help: Option<String>,
    pub related: Vec<RelatedInfo>,
}

impl Diagnostic {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message)
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message)
    }

    fn with_severity(severity: Severity, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            location: None,
            help: None,
            related: Vec::new(),
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_related(mut self, info: RelatedInfo) -> Self {
        self.related.push(info);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " at {}", loc)?;
        }
        Ok(())
    }
}

/// A secondary note attached to a diagnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedInfo {
    pub location: Option<SourceLocation>,
    pub message: String,
}

impl RelatedInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            location: None,
            message: message.into(),
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

/// Main relq error type
///
/// Everything except [`RelqError::Internal`] is restartable: the driver
/// reports it, counts it and resumes with the next statement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RelqError {
    /// The statement text did not match the grammar
    #[error("{code}: {message}")]
    Parse {
        code: ErrorCode,
        message: String,
        location: Option<SourceLocation>,
    },

    /// Resolution or type checking failed
    #[error("{code}: {message}")]
    Semantic {
        code: ErrorCode,
        message: String,
        location: Option<SourceLocation>,
    },

    /// The evaluator raised a fault while running compiled code
    #[error("{code}: {message}")]
    Program { code: ErrorCode, message: String },

    /// A compiler defect; aborts the rest of the input
    #[error("{code}: internal error: {message}")]
    Internal {
        code: ErrorCode,
        message: String,
        location: Option<SourceLocation>,
    },

    /// Catalog I/O, configuration and similar host-level failures
    #[error("{code}: {message}")]
    System {
        code: ErrorCode,
        message: String,
    },

    #[error("Multiple errors: {}", .0.len())]
    Multiple(Vec<RelqError>),
}

impl RelqError {
    pub fn parse(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Parse {
            code,
            message: message.into(),
            location: None,
        }
    }

    pub fn parse_at(code: ErrorCode, message: impl Into<String>, location: SourceLocation) -> Self {
        Self::Parse {
            code,
            message: message.into(),
            location: Some(location),
        }
    }

    pub fn semantic(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Semantic {
            code,
            message: message.into(),
            location: None,
        }
    }

    pub fn program(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Program {
            code,
            message: message.into(),
        }
    }

    pub fn internal(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Internal {
            code,
            message: message.into(),
            location: None,
        }
    }

    pub fn system(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::System {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Parse { code, .. }
            | Self::Semantic { code, .. }
            | Self::Program { code, .. }
            | Self::Internal { code, .. }
            | Self::System { code, .. } => *code,
            Self::Multiple(errors) => errors.first().map(|e| e.code()).unwrap_or(RQ0300),
        }
    }

    /// The bare message, without the code prefix
    pub fn message(&self) -> String {
        match self {
            Self::Parse { message, .. }
            | Self::Semantic { message, .. }
            | Self::Program { message, .. }
            | Self::Internal { message, .. }
            | Self::System { message, .. } => message.clone(),
            Self::Multiple(errors) => errors
                .iter()
                .map(|e| e.message())
                .collect::<Vec<_>>()
                .join("; "),
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::Parse { location, .. }
            | Self::Semantic { location, .. }
            | Self::Internal { location, .. } => location.as_ref(),
            Self::Multiple(errors) => errors.first().and_then(|e| e.location()),
            _ => None,
        }
    }

    /// Attach a location unless one is already set
    pub fn or_at(mut self, at: SourceLocation) -> Self {
        match &mut self {
            Self::Parse { location, .. }
            | Self::Semantic { location, .. }
            | Self::Internal { location, .. } => {
                if location.is_none() {
                    *location = Some(at);
                }
            }
            _ => {}
        }
        self
    }

    /// Whether the driver may resume with the next statement
    pub fn is_restartable(&self) -> bool {
        match self {
            Self::Internal { .. } => false,
            Self::Multiple(errors) => errors.iter().all(|e| e.is_restartable()),
            _ => true,
        }
    }

    /// The diagnostic reported for this error
    ///
    /// Help text comes from the code's [`ErrorInfo`](crate::ErrorInfo).
    /// The members of `Multiple` after the first become related notes.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = match self {
            Self::Internal { message, .. } => Diagnostic::error(self.code(), format!("internal error: {message}")),
            Self::Multiple(errors) => match errors.split_first() {
                Some((first, rest)) => {
                    return rest.iter().fold(first.to_diagnostic(), |diag, e| {
                        let mut info = RelatedInfo::new(e.message());
                        if let Some(loc) = e.location() {
                            info = info.with_location(loc.clone());
                        }
                        diag.with_related(info)
                    });
                }
                None => return Diagnostic::error(RQ0300, "empty error list"),
            },
            _ => Diagnostic::error(self.code(), self.message()),
        };
        if let Some(loc) = self.location() {
            diag = diag.with_location(loc.clone());
        }
        if let Some(help) = self.code().info().help {
            diag = diag.with_help(help);
        }
        diag
    }
}
