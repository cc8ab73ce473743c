//! Compiler configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How much the driver echoes while compiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    /// Errors only
    #[default]
    Quiet,
    /// Echo each statement's source
    Echo,
    /// Echo plus result types
    Types,
    /// Echo, result types and disassembly
    Disassembly,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid trace level '{0}', expected 0 to 3")]
pub struct InvalidTraceLevel(pub String);

impl TryFrom<u8> for TraceLevel {
    type Error = InvalidTraceLevel;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Self::Quiet),
            1 => Ok(Self::Echo),
            2 => Ok(Self::Types),
            3 => Ok(Self::Disassembly),
            other => Err(InvalidTraceLevel(other.to_string())),
        }
    }
}

impl FromStr for TraceLevel {
    type Err = InvalidTraceLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map_err(|_| InvalidTraceLevel(s.to_string()))
            .and_then(Self::try_from)
    }
}

impl fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// Flags read by the driver; `#` directives change them mid-stream
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    pub trace: TraceLevel,
    /// Run each statement through the evaluator after compiling it
    pub execute: bool,
    /// Stop at the first failed statement instead of resuming
    pub stop_on_error: bool,
    /// Colour rendered diagnostics
    pub color: bool,
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_trace(mut self, trace: TraceLevel) -> Self {
        self.trace = trace;
        self
    }

    #[must_use]
    pub fn with_execute(mut self, execute: bool) -> Self {
        self.execute = execute;
        self
    }

    #[must_use]
    pub fn with_stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_levels_parse() {
        assert_eq!("2".parse::<TraceLevel>().unwrap(), TraceLevel::Types);
        assert!("7".parse::<TraceLevel>().is_err());
        assert!("x".parse::<TraceLevel>().is_err());
        assert!(TraceLevel::Disassembly > TraceLevel::Echo);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: CompilerOptions = serde_json::from_str(r#"{"trace":"types","execute":true}"#).unwrap();
        assert_eq!(opts.trace, TraceLevel::Types);
        assert!(opts.execute);
        assert!(!opts.stop_on_error);
    }
}
