//! Symbols
//!
//! A symbol binds a name to what the compiler knows about it: its kind,
//! its type, and for callables the overload chain plus operator metadata.

use crate::{CallInfo, DataType, MergePolicy, OverloadChain};
use std::fmt;

/// Kind of symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Named variable held by the catalog
    Catalog,
    /// Parameter of the function being defined
    Parameter,
    /// Column of the heading in scope
    Field,
    /// Component of a user type in scope
    Component,
    /// Block binding; the slot indexes the bound expression
    Local(usize),
    /// Builtin operator or function
    Operator,
    /// User-defined function
    Deferred,
    UserType,
}

impl SymbolKind {
    /// Kinds whose value comes from the current lookup row
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::Field | Self::Parameter | Self::Component)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Operator | Self::Deferred | Self::UserType)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog => write!(f, "catalog variable"),
            Self::Parameter => write!(f, "parameter"),
            Self::Field => write!(f, "field"),
            Self::Component => write!(f, "component"),
            Self::Local(_) => write!(f, "local"),
            Self::Operator => write!(f, "operator"),
            Self::Deferred => write!(f, "function"),
            Self::UserType => write!(f, "type"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mutability {
    #[default]
    Immutable,
    Mutable,
}

/// A symbol in a scope or the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub data_type: DataType,
    pub calls: Option<OverloadChain>,
    /// Scope level the symbol was declared at
    pub level: usize,
    pub mutability: Mutability,
    /// Column merge policy, for dyadic relational operators
    pub join: Option<MergePolicy>,
    /// Usable as the operator of `fold(op, expr)`
    pub foldable: bool,
    /// Infix precedence; zero for prefix operators and functions
    pub precedence: u8,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            kind,
            data_type,
            calls: None,
            level: 0,
            mutability: Mutability::Immutable,
            join: None,
            foldable: false,
            precedence: 0,
        }
    }

    /// A symbol for a callable with the chain's first return type
    pub fn callable(name: impl Into<String>, kind: SymbolKind, chain: OverloadChain) -> Self {
        let data_type = chain
            .first()
            .map(|c| c.return_type.clone())
            .unwrap_or(DataType::Void);
        let mut symbol = Self::new(name, kind, data_type);
        symbol.calls = Some(chain);
        symbol
    }

    pub fn at_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    pub fn mutable(mut self) -> Self {
        self.mutability = Mutability::Mutable;
        self
    }

    pub fn with_join(mut self, policy: MergePolicy) -> Self {
        self.join = Some(policy);
        self
    }

    pub fn foldable(mut self) -> Self {
        self.foldable = true;
        self
    }

    pub fn with_precedence(mut self, precedence: u8) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn is_infix(&self) -> bool {
        self.precedence > 0
    }

    pub fn is_comparison(&self) -> bool {
        self.join == Some(MergePolicy::Compare)
    }

    pub fn is_mutable(&self) -> bool {
        self.mutability == Mutability::Mutable
    }

    pub fn links(&self) -> &[CallInfo] {
        self.calls.as_ref().map(OverloadChain::links).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CallKind;

    #[test]
    fn test_callable_takes_first_return_type() {
        let chain = OverloadChain::single(
            CallInfo::new("length", DataType::Number, CallKind::Fixed).arg("s", DataType::Text),
        );
        let sym = Symbol::callable("length", SymbolKind::Operator, chain);
        assert_eq!(sym.data_type, DataType::Number);
        assert_eq!(sym.links().len(), 1);
        assert!(!sym.is_infix());
    }

    #[test]
    fn test_lookup_kinds() {
        assert!(SymbolKind::Field.is_lookup());
        assert!(SymbolKind::Parameter.is_lookup());
        assert!(!SymbolKind::Catalog.is_lookup());
        assert!(SymbolKind::Deferred.is_callable());
    }
}
