//! Call metadata and overload chains

use crate::{Column, DataType};
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

/// How a resolved call is emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Fixed arity builtin
    Fixed,
    /// Variadic builtin returning a value
    Variadic,
    /// Variadic builtin returning a relation
    VariadicTable,
    /// User function invoked through its code reference
    Deferred,
    /// The generic `fold(op, expr)` aggregate
    Fold,
}

/// Column merge policy of a dyadic relational operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergePolicy {
    /// Union of both headings
    Join,
    /// Union minus the shared columns
    Compose,
    /// Left heading; shared columns must agree
    Left,
    /// Headings must be equal; result is the left heading
    Same,
    /// Headings must be equal; result is the declared type
    Compare,
}

/// One link of an overload chain
#[derive(Debug, Clone, PartialEq)]
pub struct CallInfo {
    pub name: String,
    pub return_type: DataType,
    pub args: SmallVec<[Column; 3]>,
    /// Element type of trailing arguments, for variadic calls
    pub variadic: Option<DataType>,
    /// Accumulator slots one call site allocates
    pub accum_count: usize,
    pub windowed: bool,
    pub kind: CallKind,
}

impl CallInfo {
    pub fn new(name: impl Into<String>, return_type: DataType, kind: CallKind) -> Self {
        Self {
            name: name.into(),
            return_type,
            args: SmallVec::new(),
            variadic: None,
            accum_count: 0,
            windowed: false,
            kind,
        }
    }

    pub fn arg(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.args.push(Column::new(name, data_type));
        self
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = Column>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn variadic(mut self, element: DataType) -> Self {
        self.variadic = Some(element);
        self
    }

    pub fn accums(mut self, count: usize) -> Self {
        self.accum_count = count;
        self
    }

    pub fn windowed(mut self) -> Self {
        self.windowed = true;
        self
    }

    /// Number of fixed arguments
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic.is_some()
    }

    /// Same argument types in the same positions
    pub fn same_signature(&self, other: &CallInfo) -> bool {
        self.variadic == other.variadic
            && self.args.len() == other.args.len()
            && self
                .args
                .iter()
                .zip(&other.args)
                .all(|(a, b)| a.data_type == b.data_type)
    }
}

impl fmt::Display for CallInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg.data_type)?;
        }
        if let Some(v) = &self.variadic {
            if !self.args.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "{v}...")?;
        }
        write!(f, "): {}", self.return_type)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OverloadError {
    #[error("invalid overload of '{name}': expected {expected} arguments, found {found}")]
    ArityConflict {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("return type mismatch for '{name}': expected {expected}, found {found}")]
    ReturnTypeConflict {
        name: String,
        expected: DataType,
        found: DataType,
    },
}

/// Every link registered under one name, in registration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverloadChain {
    links: Vec<CallInfo>,
}

impl OverloadChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(link: CallInfo) -> Self {
        Self { links: vec![link] }
    }

    pub fn links(&self) -> &[CallInfo] {
        &self.links
    }

    pub fn first(&self) -> Option<&CallInfo> {
        self.links.first()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Append a builtin link; builtins are trusted to be consistent
    pub fn push(&mut self, link: CallInfo) {
        self.links.push(link);
    }

    /// Register a user definition
    ///
    /// A link with an identical signature replaces the existing one and must
    /// keep its return type. A new signature must share the chain's arity
    /// and return type.
    pub fn add_overload(&mut self, link: CallInfo) -> Result<(), OverloadError> {
        let Some(first) = self.links.first() else {
            self.links.push(link);
            return Ok(());
        };
        if first.return_type != link.return_type {
            return Err(OverloadError::ReturnTypeConflict {
                name: link.name.clone(),
                expected: first.return_type.clone(),
                found: link.return_type.clone(),
            });
        }
        if first.arity() != link.arity() {
            return Err(OverloadError::ArityConflict {
                name: link.name.clone(),
                expected: first.arity(),
                found: link.arity(),
            });
        }
        match self.links.iter_mut().find(|l| l.same_signature(&link)) {
            Some(existing) => *existing = link,
            None => self.links.push(link),
        }
        Ok(())
    }
}
