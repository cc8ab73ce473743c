//! relq error codes following a structured numbering system
//!
//! Error code ranges:
//! - RQ0001-RQ0099: Parse errors (syntax)
//! - RQ0100-RQ0199: Semantic errors (type checking, resolution)
//! - RQ0200-RQ0299: Program errors (raised by the evaluator)
//! - RQ0300-RQ0399: Internal errors (compiler defects, never restartable)
//! - RQ0400-RQ0499: System errors (catalog I/O, configuration)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RQ{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Parse errors (0001-0099)
    map.insert(1, ErrorInfo::new("Syntax error"));
    map.insert(2, ErrorInfo::new("Unexpected end of input"));
    map.insert(3, ErrorInfo::new("Invalid literal"));
    map.insert(4, ErrorInfo::new("Unterminated string literal"));
    map.insert(5, ErrorInfo::new("Invalid number format"));
    map.insert(6, ErrorInfo::new("Invalid time format")
        .with_help("Time literals look like t'2024-01-31 12:00:00'"));
    map.insert(7, ErrorInfo::new("Missing closing delimiter"));
    map.insert(8, ErrorInfo::new("Expected expression"));
    map.insert(9, ErrorInfo::new("Unknown directive")
        .with_help("Known directives are #trace, #catalog and #exec"));
    map.insert(10, ErrorInfo::new("Unexpected trailing input"));

    // Semantic errors (0100-0199)
    map.insert(100, ErrorInfo::new("Undefined identifier")
        .with_help("Check that the name is a catalog variable, a parameter or a field in scope"));
    map.insert(101, ErrorInfo::new("Undefined type"));
    map.insert(102, ErrorInfo::new("Duplicate definition"));
    map.insert(103, ErrorInfo::new("Type mismatch"));
    map.insert(104, ErrorInfo::new("Wrong argument count"));
    map.insert(105, ErrorInfo::new("Duplicate column"));
    map.insert(106, ErrorInfo::new("Heading mismatch"));
    map.insert(107, ErrorInfo::new("Invalid overload"));
    map.insert(108, ErrorInfo::new("Return type mismatch"));
    map.insert(109, ErrorInfo::new("Illegal assignment"));
    map.insert(110, ErrorInfo::new("Aggregate outside of a grouping context")
        .with_help("Aggregates are only allowed in the fields of a transform"));
    map.insert(111, ErrorInfo::new("Window operator outside of a transform"));
    map.insert(112, ErrorInfo::new("Unknown column"));
    map.insert(113, ErrorInfo::new("Not callable"));
    map.insert(114, ErrorInfo::new("Invalid field list"));

    // Program errors (0200-0299)
    map.insert(200, ErrorInfo::new("Evaluation failed"));
    map.insert(201, ErrorInfo::new("Division by zero"));
    map.insert(202, ErrorInfo::new("Unsupported instruction"));

    // Internal errors (0300-0399)
    map.insert(300, ErrorInfo::new("Internal compiler error"));
    map.insert(301, ErrorInfo::new("Unresolved placeholder type"));
    map.insert(302, ErrorInfo::new("Scope stack underflow"));

    // System errors (0400-0499)
    map.insert(400, ErrorInfo::new("I/O error"));
    map.insert(401, ErrorInfo::new("Catalog load failed"));
    map.insert(402, ErrorInfo::new("Catalog save failed"));
    map.insert(403, ErrorInfo::new("Configuration error"));

    map
});

// Parse errors
pub const RQ0001: ErrorCode = ErrorCode::new(1);
pub const RQ0002: ErrorCode = ErrorCode::new(2);
pub const RQ0003: ErrorCode = ErrorCode::new(3);
pub const RQ0004: ErrorCode = ErrorCode::new(4);
pub const RQ0005: ErrorCode = ErrorCode::new(5);
pub const RQ0006: ErrorCode = ErrorCode::new(6);
pub const RQ0007: ErrorCode = ErrorCode::new(7);
pub const RQ0008: ErrorCode = ErrorCode::new(8);
pub const RQ0009: ErrorCode = ErrorCode::new(9);
pub const RQ0010: ErrorCode = ErrorCode::new(10);

// Semantic errors
pub const RQ0100: ErrorCode = ErrorCode::new(100);
pub const RQ0101: ErrorCode = ErrorCode::new(101);
pub const RQ0102: ErrorCode = ErrorCode::new(102);
pub const RQ0103: ErrorCode = ErrorCode::new(103);
pub const RQ0104: ErrorCode = ErrorCode::new(104);
pub const RQ0105: ErrorCode = ErrorCode::new(105);
pub const RQ0106: ErrorCode = ErrorCode::new(106);
pub const RQ0107: ErrorCode = ErrorCode::new(107);
pub const RQ0108: ErrorCode = ErrorCode::new(108);
pub const RQ0109: ErrorCode = ErrorCode::new(109);
pub const RQ0110: ErrorCode = ErrorCode::new(110);
pub const RQ0111: ErrorCode = ErrorCode::new(111);
pub const RQ0112: ErrorCode = ErrorCode::new(112);
pub const RQ0113: ErrorCode = ErrorCode::new(113);
pub const RQ0114: ErrorCode = ErrorCode::new(114);

// Program errors
pub const RQ0200: ErrorCode = ErrorCode::new(200);
pub const RQ0201: ErrorCode = ErrorCode::new(201);
pub const RQ0202: ErrorCode = ErrorCode::new(202);

// Internal errors
pub const RQ0300: ErrorCode = ErrorCode::new(300);
pub const RQ0301: ErrorCode = ErrorCode::new(301);
pub const RQ0302: ErrorCode = ErrorCode::new(302);

// System errors
pub const RQ0400: ErrorCode = ErrorCode::new(400);
pub const RQ0401: ErrorCode = ErrorCode::new(401);
pub const RQ0402: ErrorCode = ErrorCode::new(402);
pub const RQ0403: ErrorCode = ErrorCode::new(403);
